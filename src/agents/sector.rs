//! Sector Analysis Agent
//!
//! Tools over the sector/subsector emissions collection: dataset overview,
//! sector listing, similarity search, per-sector reports, sector comparison
//! and per-subsector charts.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{optional_bool, required_str, string_params, Agent, DataTools, Tool, ToolOutput};
use crate::models::{Dataset, NumericField, Operation, QueryParams, SECTOR_NAME};
use crate::types::{AppError, AppResult};

pub const AGENT_NAME: &str = "analysis_sector_agent";

const DESCRIPTION: &str = "Analyzes CO2 emissions by sector and subsector.";

const INSTRUCTION: &str = r#"You are the CO2 Emission Analysis Agent for a climate organization, working on emissions by sector and subsector.
Be positive and friendly. Present tool results faithfully:
- Reports and comparisons: keep every number, and point out the largest values and changes.
- Charts: include the markdown image exactly as returned.
- Lists: show the full list.
- Errors: explain what went wrong and suggest a sector name from the dataset."#;

const INTRODUCTION: &str = "This dataset contains CO2 emissions data for various sectors and subsectors.
It includes monthly and yearly totals, as well as percentage changes in emissions.
The data is structured with the following columns:
- Sector_name: Name of the sector
- Subsector_Name: Name of the subsector
- Mar_2025_Total: Total CO2 emissions for March 2025
- Prev_Month: CO2 emissions for the previous month
- Mar_2024_Total: Total CO2 emissions for March 2024
- Monthly_%_change: Percentage change in emissions from the previous month
- 2025_YTD: Year-to-date total for 2025
- 2024_YTD: Year-to-date total for 2024
- 2023_YTD: Year-to-date total for 2023
- 2022_YTD: Year-to-date total for 2022
- 2021_YTD: Year-to-date total for 2021";

pub fn sector_agent(tools: Arc<DataTools>) -> Agent {
    Agent::new(AGENT_NAME, DESCRIPTION, INSTRUCTION)
        .with_tool(Arc::new(IntroductionTool))
        .with_tool(Arc::new(SectorListTool(tools.clone())))
        .with_tool(Arc::new(SimilarSectorsTool(tools.clone())))
        .with_tool(Arc::new(SectorReportTool(tools.clone())))
        .with_tool(Arc::new(CompareSectorsTool(tools.clone())))
        .with_tool(Arc::new(GraphReportTool(tools)))
}

struct IntroductionTool;

#[async_trait]
impl Tool for IntroductionTool {
    fn name(&self) -> &str {
        "introduction_to_data"
    }

    fn description(&self) -> &str {
        "Describes the sector emissions dataset and its columns."
    }

    fn parameters(&self) -> Value {
        string_params(&[])
    }

    async fn call(&self, _args: Value) -> AppResult<ToolOutput> {
        Ok(ToolOutput::result(INTRODUCTION))
    }
}

struct SectorListTool(Arc<DataTools>);

#[async_trait]
impl Tool for SectorListTool {
    fn name(&self) -> &str {
        "get_sector_list"
    }

    fn description(&self) -> &str {
        "Lists every sector available in the dataset."
    }

    fn parameters(&self) -> Value {
        string_params(&[])
    }

    async fn call(&self, _args: Value) -> AppResult<ToolOutput> {
        self.0
            .listing(
                Dataset::Sector,
                SECTOR_NAME,
                "Here is the list of sectors available in the dataset:",
            )
            .await
    }
}

struct SimilarSectorsTool(Arc<DataTools>);

#[async_trait]
impl Tool for SimilarSectorsTool {
    fn name(&self) -> &str {
        "find_similar_sectors"
    }

    fn description(&self) -> &str {
        "Finds the sectors and subsectors closest in meaning to a free-text query."
    }

    fn parameters(&self) -> Value {
        string_params(&[("query", "Free-text description of the sector of interest")])
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let query = required_str(&args, "query")?;
        let request = self.0.request(&query, Dataset::Sector, Operation::Similar);
        self.0.report(&request).await
    }
}

struct SectorReportTool(Arc<DataTools>);

#[async_trait]
impl Tool for SectorReportTool {
    fn name(&self) -> &str {
        "get_sector_report"
    }

    fn description(&self) -> &str {
        "Per-subsector report for one sector. With exact=false the closest matching sector is used."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sector_name": {"type": "string", "description": "Sector to report on"},
                "exact": {
                    "type": "boolean",
                    "description": "Require the sector name to match exactly (case-insensitive). Defaults to true."
                }
            },
            "required": ["sector_name"]
        })
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let sector = required_str(&args, "sector_name")?;
        let key = optional_bool(&args, "exact", true).then(|| sector.clone());
        let request = self
            .0
            .request(&sector, Dataset::Sector, Operation::Report)
            .with_params(QueryParams {
                key,
                ..Default::default()
            });
        self.0.report(&request).await
    }
}

struct CompareSectorsTool(Arc<DataTools>);

#[async_trait]
impl Tool for CompareSectorsTool {
    fn name(&self) -> &str {
        "compare_sectors"
    }

    fn description(&self) -> &str {
        "Compares March 2025 totals and monthly change of two sectors, subsector by subsector. \
         With exact=false the closest matching sectors are used."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sector1": {"type": "string", "description": "First sector"},
                "sector2": {"type": "string", "description": "Second sector"},
                "exact": {
                    "type": "boolean",
                    "description": "Require both sector names to match exactly (case-insensitive). Defaults to true."
                }
            },
            "required": ["sector1", "sector2"]
        })
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let first = required_str(&args, "sector1")?;
        let second = required_str(&args, "sector2")?;
        let exact = optional_bool(&args, "exact", true);
        let request = self
            .0
            .request(&first, Dataset::Sector, Operation::Compare)
            .with_params(QueryParams {
                key: exact.then(|| first.clone()),
                other: Some(second.clone()),
                other_key: exact.then_some(second),
                ..Default::default()
            });
        self.0.report(&request).await
    }
}

struct GraphReportTool(Arc<DataTools>);

#[async_trait]
impl Tool for GraphReportTool {
    fn name(&self) -> &str {
        "get_graph_report"
    }

    fn description(&self) -> &str {
        "Charts one numeric column across the subsectors of a sector and returns the image as markdown."
    }

    fn parameters(&self) -> Value {
        let columns: Vec<&str> = NumericField::ALL.iter().map(|f| f.column()).collect();
        json!({
            "type": "object",
            "properties": {
                "sector_name": {"type": "string", "description": "Sector to chart"},
                "parameter": {"type": "string", "enum": columns, "description": "Column to plot"}
            },
            "required": ["sector_name", "parameter"]
        })
    }

    async fn call(&self, args: Value) -> AppResult<ToolOutput> {
        let sector = required_str(&args, "sector_name")?;
        let raw = required_str(&args, "parameter")?;
        let field = NumericField::parse(&raw).ok_or_else(|| {
            let columns: Vec<&str> = NumericField::ALL.iter().map(|f| f.column()).collect();
            AppError::InvalidInput(format!(
                "unknown parameter '{}'; expected one of: {}",
                raw,
                columns.join(", ")
            ))
        })?;

        let request = self
            .0
            .request(&sector, Dataset::Sector, Operation::Trend)
            .with_params(QueryParams {
                key: Some(sector.clone()),
                field: Some(field),
                ..Default::default()
            });
        self.0.chart(&request, &sector).await
    }
}
