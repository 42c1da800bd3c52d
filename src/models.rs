use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agents::ManagerAgent;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub manager: Arc<ManagerAgent>,
}

/// Which emissions collection a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Sector,
    Country,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Sector => "sector",
            Dataset::Country => "country",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const SECTOR_NAME: &str = "Sector_name";
pub const SUBSECTOR_NAME: &str = "Subsector_Name";
pub const CONTINENT: &str = "Continent";
pub const COUNTRY: &str = "Country";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Lookup,
    Similar,
    Report,
    Compare,
    Trend,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Lookup,
        Operation::Similar,
        Operation::Report,
        Operation::Compare,
        Operation::Trend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Lookup => "lookup",
            Operation::Similar => "similar",
            Operation::Report => "report",
            Operation::Compare => "compare",
            Operation::Trend => "trend",
        }
    }
}

/// Vector search sizing: candidates scanned by the index, rows returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub num_candidates: u32,
    pub limit: u32,
}

impl SearchParams {
    pub const fn new(num_candidates: u32, limit: u32) -> Self {
        Self {
            num_candidates,
            limit,
        }
    }
}

/// Numeric emission columns, in store order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericField {
    #[serde(rename = "mar_2025_total")]
    Mar2025Total,
    #[serde(rename = "prev_month")]
    PrevMonth,
    #[serde(rename = "mar_2024_total")]
    Mar2024Total,
    #[serde(rename = "monthly_pct_change")]
    MonthlyPctChange,
    #[serde(rename = "ytd_2025")]
    Ytd2025,
    #[serde(rename = "ytd_2024")]
    Ytd2024,
    #[serde(rename = "ytd_2023")]
    Ytd2023,
    #[serde(rename = "ytd_2022")]
    Ytd2022,
    #[serde(rename = "ytd_2021")]
    Ytd2021,
}

impl NumericField {
    pub const ALL: [NumericField; 9] = [
        NumericField::Mar2025Total,
        NumericField::PrevMonth,
        NumericField::Mar2024Total,
        NumericField::MonthlyPctChange,
        NumericField::Ytd2025,
        NumericField::Ytd2024,
        NumericField::Ytd2023,
        NumericField::Ytd2022,
        NumericField::Ytd2021,
    ];

    /// Yearly totals, oldest first.
    pub const YEARLY: [NumericField; 5] = [
        NumericField::Ytd2021,
        NumericField::Ytd2022,
        NumericField::Ytd2023,
        NumericField::Ytd2024,
        NumericField::Ytd2025,
    ];

    /// Store column name, also used as the report label.
    pub fn column(&self) -> &'static str {
        match self {
            NumericField::Mar2025Total => "Mar_2025_Total",
            NumericField::PrevMonth => "Prev_Month",
            NumericField::Mar2024Total => "Mar_2024_Total",
            NumericField::MonthlyPctChange => "Monthly_%_change",
            NumericField::Ytd2025 => "2025_YTD",
            NumericField::Ytd2024 => "2024_YTD",
            NumericField::Ytd2023 => "2023_YTD",
            NumericField::Ytd2022 => "2022_YTD",
            NumericField::Ytd2021 => "2021_YTD",
        }
    }

    /// snake_case name, matching the `Metrics` field.
    pub fn name(&self) -> &'static str {
        match self {
            NumericField::Mar2025Total => "mar_2025_total",
            NumericField::PrevMonth => "prev_month",
            NumericField::Mar2024Total => "mar_2024_total",
            NumericField::MonthlyPctChange => "monthly_pct_change",
            NumericField::Ytd2025 => "ytd_2025",
            NumericField::Ytd2024 => "ytd_2024",
            NumericField::Ytd2023 => "ytd_2023",
            NumericField::Ytd2022 => "ytd_2022",
            NumericField::Ytd2021 => "ytd_2021",
        }
    }

    /// Accepts a column name or snake_case name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.column().to_lowercase() == wanted || field.name() == wanted)
    }

    /// Percent changes average across a group; totals add up.
    pub fn is_averaged(&self) -> bool {
        matches!(self, NumericField::MonthlyPctChange)
    }
}

/// Nullable numeric columns of one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mar_2025_total: Option<f64>,
    pub prev_month: Option<f64>,
    pub mar_2024_total: Option<f64>,
    pub monthly_pct_change: Option<f64>,
    pub ytd_2025: Option<f64>,
    pub ytd_2024: Option<f64>,
    pub ytd_2023: Option<f64>,
    pub ytd_2022: Option<f64>,
    pub ytd_2021: Option<f64>,
}

impl Metrics {
    pub fn get(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::Mar2025Total => self.mar_2025_total,
            NumericField::PrevMonth => self.prev_month,
            NumericField::Mar2024Total => self.mar_2024_total,
            NumericField::MonthlyPctChange => self.monthly_pct_change,
            NumericField::Ytd2025 => self.ytd_2025,
            NumericField::Ytd2024 => self.ytd_2024,
            NumericField::Ytd2023 => self.ytd_2023,
            NumericField::Ytd2022 => self.ytd_2022,
            NumericField::Ytd2021 => self.ytd_2021,
        }
    }

    pub fn set(&mut self, field: NumericField, value: Option<f64>) {
        let slot = match field {
            NumericField::Mar2025Total => &mut self.mar_2025_total,
            NumericField::PrevMonth => &mut self.prev_month,
            NumericField::Mar2024Total => &mut self.mar_2024_total,
            NumericField::MonthlyPctChange => &mut self.monthly_pct_change,
            NumericField::Ytd2025 => &mut self.ytd_2025,
            NumericField::Ytd2024 => &mut self.ytd_2024,
            NumericField::Ytd2023 => &mut self.ytd_2023,
            NumericField::Ytd2022 => &mut self.ytd_2022,
            NumericField::Ytd2021 => &mut self.ytd_2021,
        };
        *slot = value;
    }
}

/// Categorical part of a record; the variant fixes the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataset", rename_all = "lowercase")]
pub enum RecordKeys {
    Sector {
        sector_name: String,
        subsector_name: String,
    },
    Country {
        continent: String,
        country: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub keys: RecordKeys,
    pub metrics: Metrics,
    /// Not projected back by the vector store; populated for in-process stores.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl EmissionRecord {
    pub fn sector(sector_name: impl Into<String>, subsector_name: impl Into<String>) -> Self {
        Self {
            keys: RecordKeys::Sector {
                sector_name: sector_name.into(),
                subsector_name: subsector_name.into(),
            },
            metrics: Metrics::default(),
            embedding: Vec::new(),
        }
    }

    pub fn country(continent: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            keys: RecordKeys::Country {
                continent: continent.into(),
                country: country.into(),
            },
            metrics: Metrics::default(),
            embedding: Vec::new(),
        }
    }

    pub fn with_metric(mut self, field: NumericField, value: f64) -> Self {
        self.metrics.set(field, Some(value));
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn dataset(&self) -> Dataset {
        match self.keys {
            RecordKeys::Sector { .. } => Dataset::Sector,
            RecordKeys::Country { .. } => Dataset::Country,
        }
    }

    /// Sector name or country name.
    pub fn match_key(&self) -> &str {
        match &self.keys {
            RecordKeys::Sector { sector_name, .. } => sector_name,
            RecordKeys::Country { country, .. } => country,
        }
    }

    /// Subsector name or country name.
    pub fn group_key(&self) -> &str {
        match &self.keys {
            RecordKeys::Sector { subsector_name, .. } => subsector_name,
            RecordKeys::Country { country, .. } => country,
        }
    }
}

/// Typed extra parameters of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Exact key to keep after similarity search, instead of the best match's.
    pub key: Option<String>,
    /// Second term of a comparison.
    pub other: Option<String>,
    /// Exact key for the second term, like `key` for the first.
    pub other_key: Option<String>,
    /// Numeric column charted across groups.
    pub field: Option<NumericField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub free_text: String,
    pub dataset: Dataset,
    pub operation: Operation,
    pub candidate_count: u32,
    pub result_count: u32,
    #[serde(default)]
    pub params: QueryParams,
}

impl QueryRequest {
    pub fn new(
        free_text: impl Into<String>,
        dataset: Dataset,
        operation: Operation,
        search: SearchParams,
    ) -> Self {
        Self {
            free_text: free_text.into(),
            dataset,
            operation,
            candidate_count: search.num_candidates,
            result_count: search.limit,
            params: QueryParams::default(),
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams::new(self.candidate_count, self.result_count)
    }
}

/// Header plus one formatted line per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextReport {
    pub header: String,
    pub lines: Vec<String>,
}

impl TextReport {
    /// Header and lines, blank-line separated as the agents present them.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.lines.len() + 1);
        parts.push(self.header.clone());
        parts.extend(self.lines.iter().cloned());
        parts.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub title: String,
    pub subject: String,
    pub x_labels: Vec<String>,
    pub y_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub title: String,
    pub subject: String,
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResult {
    TextReport(TextReport),
    Chart(ChartArtifact),
    Error(ErrorResult),
}

// API Request/Response types

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
    pub tools: Vec<ToolSummary>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub agents: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_field_parse_accepts_column_and_snake_case() {
        assert_eq!(NumericField::parse("2025_YTD"), Some(NumericField::Ytd2025));
        assert_eq!(NumericField::parse("mar_2025_total"), Some(NumericField::Mar2025Total));
        assert_eq!(
            NumericField::parse("monthly_%_change"),
            Some(NumericField::MonthlyPctChange)
        );
        assert_eq!(
            NumericField::parse("monthly_pct_change"),
            Some(NumericField::MonthlyPctChange)
        );
        assert_eq!(NumericField::parse("population"), None);
    }

    #[test]
    fn test_record_keys_by_dataset() {
        let sector = EmissionRecord::sector("Energy", "Power");
        assert_eq!(sector.dataset(), Dataset::Sector);
        assert_eq!(sector.match_key(), "Energy");
        assert_eq!(sector.group_key(), "Power");

        let country = EmissionRecord::country("Europe", "France");
        assert_eq!(country.match_key(), "France");
        assert_eq!(country.group_key(), "France");
    }

    #[test]
    fn test_report_render_joins_header_and_lines() {
        let report = TextReport {
            header: "Sector Report:\n".to_string(),
            lines: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(report.render(), "Sector Report:\n\na\nb");
    }
}
