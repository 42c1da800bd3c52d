//! Country Analysis Agent

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{required_str, string_params, Agent, DataTools, Tool, ToolOutput};
use crate::models::{Dataset, Operation, COUNTRY};
use crate::types::AppResult;

pub const AGENT_NAME: &str = "analysis_country_agent";

const DESCRIPTION: &str = "Analyzes CO2 emissions by continent and country.";

const INSTRUCTION: &str = r#"You are the CO2 Emission Analysis Agent for a climate organization, working on emissions by country.
Be positive and friendly. Present tool results faithfully:
- Country data: keep every number and mention the most recent totals and monthly change.
- Charts: include the markdown image exactly as returned.
- Errors: explain what went wrong and suggest checking the country list."#;

const INTRODUCTION: &str = "This dataset contains CO2 emissions data for various continents and their respective countries.
It includes monthly and yearly totals, as well as percentage changes in emissions.
The data is structured with the following columns:
- Continent: Name of the continent
- Country: Name of the country
- Mar_2025_Total: Total CO2 emissions for March 2025
- Prev_Month: CO2 emissions for the previous month
- Mar_2024_Total: Total CO2 emissions for March 2024
- Monthly_%_change: Percentage change in emissions from the previous month
- 2025_YTD: Year-to-date total for 2025
- 2024_YTD: Year-to-date total for 2024
- 2023_YTD: Year-to-date total for 2023
- 2022_YTD: Year-to-date total for 2022
- 2021_YTD: Year-to-date total for 2021";

pub fn country_agent(tools: Arc<DataTools>) -> Agent {
    Agent::new(AGENT_NAME, DESCRIPTION, INSTRUCTION)
        .with_tool(Arc::new(IntroductionTool))
        .with_tool(Arc::new(CountryListTool(tools.clone())))
        .with_tool(Arc::new(SimilarCountriesTool(tools.clone())))
        .with_tool(Arc::new(CountryReportTool(tools.clone())))
        .with_tool(Arc::new(EmissionsTrendTool(tools)))
}

struct IntroductionTool;

#[async_trait]
impl Tool for IntroductionTool {
    fn name(&self) -> &str {
        "introduction_to_data"
    }

    fn description(&self) -> &str {
        "Describes the country emissions dataset and its columns."
    }

    fn parameters(&self) -> Value {
        string_params(&[])
    }

    async fn call(&self, _args: Value) -> AppResult<ToolOutput> {
        Ok(ToolOutput::result(INTRODUCTION))
    }
}

struct CountryListTool(Arc<DataTools>);

#[async_trait]
impl Tool for CountryListTool {
    fn name(&self) -> &str {
        "find_country_list"
    }

    fn description(&self) -> &str {
        "Lists every country available in the dataset."
    }

    fn parameters(&self) -> Value {
        string_params(&[])
    }

    async fn call(&self, _args: Value) -> AppResult<ToolOutput> {
        self.0
            .listing(
                Dataset::Country,
                COUNTRY,
                "Here is the list of countries available in the dataset:",
            )
            .await
    }
}

struct SimilarCountriesTool(Arc<DataTools>);

#[async_trait]
impl Tool for SimilarCountriesTool {
    fn name(&self) -> &str {
        "find_similar_countries"
    }

    fn description(&self) -> &str {
        "Finds the country closest to a free-text query and shows its emissions."
    }

    fn parameters(&self) -> Value {
        string_params(&[("query", "Country name or description")])
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let query = required_str(&args, "query")?;
        let request = self.0.request(&query, Dataset::Country, Operation::Similar);
        self.0.report(&request).await
    }
}

struct CountryReportTool(Arc<DataTools>);

#[async_trait]
impl Tool for CountryReportTool {
    fn name(&self) -> &str {
        "get_country_report"
    }

    fn description(&self) -> &str {
        "Emissions report for the country best matching the given name."
    }

    fn parameters(&self) -> Value {
        string_params(&[("country", "Country to report on")])
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let country = required_str(&args, "country")?;
        let request = self.0.request(&country, Dataset::Country, Operation::Report);
        self.0.report(&request).await
    }
}

struct EmissionsTrendTool(Arc<DataTools>);

#[async_trait]
impl Tool for EmissionsTrendTool {
    fn name(&self) -> &str {
        "plot_emissions_trend"
    }

    fn description(&self) -> &str {
        "Charts a country's year-to-date totals from 2021 to 2025 and returns the image as markdown."
    }

    fn parameters(&self) -> Value {
        string_params(&[("country", "Country to chart")])
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let country = required_str(&args, "country")?;
        let request = self.0.request(&country, Dataset::Country, Operation::Trend);
        self.0.chart(&request, &country).await
    }
}
