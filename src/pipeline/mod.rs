//! Query Pipeline
//!
//! Turns a free-text query into a formatted report or a chart: embed the
//! text, run a similarity search against one dataset, narrow the candidates
//! to an exact key, then aggregate, join or plot them depending on the
//! operation.
//!
//! Only a lost dataset store escapes [`QueryPipeline::execute`] as `Err`.
//! Every other failure comes back as [`QueryResult::Error`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chart;
use crate::db::DatasetStore;
use crate::embeddings::EmbeddingProvider;
use crate::models::{
    ChartSeries, Dataset, EmissionRecord, ErrorResult, Metrics, NumericField, Operation,
    QueryRequest, QueryResult, SearchParams,
};
use crate::report::{self, ComparedPair, TemplateKind};
use crate::types::{AppError, AppResult};

pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn DatasetStore>,
}

impl QueryPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn DatasetStore>) -> Self {
        Self { embedder, store }
    }

    pub async fn execute(&self, request: &QueryRequest) -> AppResult<QueryResult> {
        info!(
            dataset = %request.dataset,
            operation = request.operation.as_str(),
            query = %request.free_text,
            "Executing query"
        );

        match self.run(request).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Dataset store unavailable");
                Err(e)
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Query produced no result");
                Ok(QueryResult::Error(ErrorResult {
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                }))
            }
        }
    }

    /// Distinct values of a categorical column.
    pub async fn distinct(&self, dataset: Dataset, field: &str) -> AppResult<Vec<String>> {
        self.store.distinct(dataset, field).await
    }

    async fn run(&self, request: &QueryRequest) -> AppResult<QueryResult> {
        validate(request)?;
        let search = request.search_params();

        match request.operation {
            Operation::Similar => {
                let rows = self.search(&request.free_text, request.dataset, search).await?;
                if rows.is_empty() {
                    return Err(AppError::NotFound(format!(
                        "No similar {} records found for: {}",
                        request.dataset,
                        request.free_text.trim()
                    )));
                }
                let template = match request.dataset {
                    Dataset::Sector => TemplateKind::SimilarSectors,
                    Dataset::Country => TemplateKind::SimilarCountries,
                };
                Ok(QueryResult::TextReport(report::format(&rows, template)))
            }
            Operation::Lookup => {
                let rows = self.narrowed(request, search).await?;
                let template = match request.dataset {
                    Dataset::Sector => TemplateKind::SimilarSectors,
                    Dataset::Country => TemplateKind::CountryReport,
                };
                Ok(QueryResult::TextReport(report::format(&rows, template)))
            }
            Operation::Report => {
                let rows = self.narrowed(request, search).await?;
                let grouped = aggregate_by_group(&rows);
                let template = match request.dataset {
                    Dataset::Sector => TemplateKind::SectorReport,
                    Dataset::Country => TemplateKind::CountryReport,
                };
                Ok(QueryResult::TextReport(report::format(&grouped, template)))
            }
            Operation::Compare => self.compare(request, search).await,
            Operation::Trend => {
                let series = match request.params.field {
                    Some(field) => {
                        let rows = self.narrowed(request, search).await?;
                        field_series(&rows, field)?
                    }
                    None => {
                        let rows = match &request.params.key {
                            Some(_) => self.narrowed(request, search).await?,
                            None => self.search(&request.free_text, request.dataset, search).await?,
                        };
                        let best = rows.first().ok_or_else(|| not_found(request))?;
                        yearly_series(best)?
                    }
                };
                let x_desc = match request.params.field {
                    Some(_) => group_label(request.dataset),
                    None => "Year",
                };
                let artifact = chart::render_series(&series, x_desc)?;
                Ok(QueryResult::Chart(artifact))
            }
        }
    }

    async fn search(
        &self,
        text: &str,
        dataset: Dataset,
        search: SearchParams,
    ) -> AppResult<Vec<EmissionRecord>> {
        let vector = self.embedder.encode(text.trim()).await?;
        let rows = self.store.nearest(dataset, &vector, search).await?;
        debug!(dataset = %dataset, candidates = rows.len(), "Similarity search done");
        Ok(rows)
    }

    /// Candidates narrowed to the caller's key, or to the best match's key.
    async fn narrowed(
        &self,
        request: &QueryRequest,
        search: SearchParams,
    ) -> AppResult<Vec<EmissionRecord>> {
        let rows = self.search(&request.free_text, request.dataset, search).await?;
        let rows = narrow_to_key(rows, request.params.key.as_deref());
        if rows.is_empty() {
            return Err(not_found(request));
        }
        Ok(rows)
    }

    async fn compare(&self, request: &QueryRequest, search: SearchParams) -> AppResult<QueryResult> {
        if request.dataset != Dataset::Sector {
            return Err(AppError::InvalidInput(
                "comparison is only available for the sector dataset".to_string(),
            ));
        }
        let other = request
            .params
            .other
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::InvalidInput("a second sector to compare is required".to_string()))?;

        let first = narrow_to_key(
            self.search(&request.free_text, request.dataset, search).await?,
            request.params.key.as_deref(),
        );
        let second = narrow_to_key(
            self.search(other, request.dataset, search).await?,
            request.params.other_key.as_deref(),
        );

        if first.is_empty() || second.is_empty() {
            return Err(AppError::ComparisonUnavailable(format!(
                "no data for one of '{}' and '{}'",
                request.free_text.trim(),
                other
            )));
        }

        let pairs = join_on_group(&first, &second);
        if pairs.is_empty() {
            return Err(AppError::ComparisonUnavailable(format!(
                "{} and {} have no subsectors in common",
                first[0].match_key(),
                second[0].match_key()
            )));
        }

        Ok(QueryResult::TextReport(report::format_comparison(&pairs)))
    }
}

fn validate(request: &QueryRequest) -> AppResult<()> {
    if request.free_text.trim().is_empty() {
        return Err(AppError::InvalidInput("query text must not be empty".to_string()));
    }
    if request.result_count < 1 {
        return Err(AppError::InvalidInput("result count must be at least 1".to_string()));
    }
    if request.candidate_count < request.result_count {
        return Err(AppError::InvalidInput(format!(
            "candidate count {} is smaller than result count {}",
            request.candidate_count, request.result_count
        )));
    }
    Ok(())
}

fn not_found(request: &QueryRequest) -> AppError {
    let subject = request
        .params
        .key
        .as_deref()
        .unwrap_or(request.free_text.as_str())
        .trim();
    AppError::NotFound(format!("No data found for {}: {}", request.dataset, subject))
}

fn group_label(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Sector => "Subsector",
        Dataset::Country => "Country",
    }
}

/// Keeps the rows whose match key equals `key` (or the first row's key),
/// ignoring case.
pub fn narrow_to_key(rows: Vec<EmissionRecord>, key: Option<&str>) -> Vec<EmissionRecord> {
    let wanted = match key {
        Some(k) => k.trim().to_lowercase(),
        None => match rows.first() {
            Some(best) => best.match_key().to_lowercase(),
            None => return rows,
        },
    };
    rows.into_iter()
        .filter(|r| r.match_key().to_lowercase() == wanted)
        .collect()
}

/// One row per group key, ordered by key. Totals are summed and the monthly
/// percent change averaged; missing values are skipped.
pub fn aggregate_by_group(rows: &[EmissionRecord]) -> Vec<EmissionRecord> {
    let mut groups: BTreeMap<&str, Vec<&EmissionRecord>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.group_key()).or_default().push(row);
    }

    groups
        .into_values()
        .map(|members| {
            let mut metrics = Metrics::default();
            for field in NumericField::ALL {
                let values: Vec<f64> = members.iter().filter_map(|r| r.metrics.get(field)).collect();
                let combined = if values.is_empty() {
                    None
                } else if field.is_averaged() {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                } else {
                    Some(values.iter().sum())
                };
                metrics.set(field, combined);
            }
            EmissionRecord {
                keys: members[0].keys.clone(),
                metrics,
                embedding: Vec::new(),
            }
        })
        .collect()
}

/// Subsectors present on both sides, in the first side's order.
pub fn join_on_group(first: &[EmissionRecord], second: &[EmissionRecord]) -> Vec<ComparedPair> {
    let mut seen = HashSet::new();
    first
        .iter()
        .filter(|r| seen.insert(r.group_key().to_lowercase()))
        .filter_map(|left| {
            let wanted = left.group_key().to_lowercase();
            second
                .iter()
                .find(|right| right.group_key().to_lowercase() == wanted)
                .map(|right| ComparedPair {
                    subsector: left.group_key().to_string(),
                    first: left.metrics.clone(),
                    second: right.metrics.clone(),
                })
        })
        .collect()
}

/// `field` across the rows, labelled by group key. Rows without a value are
/// dropped.
pub fn field_series(rows: &[EmissionRecord], field: NumericField) -> AppResult<ChartSeries> {
    let subject = rows
        .first()
        .map(|r| r.match_key().to_string())
        .unwrap_or_default();
    let (x_labels, y_values): (Vec<String>, Vec<f64>) = rows
        .iter()
        .filter_map(|r| r.metrics.get(field).map(|v| (r.group_key().to_string(), v)))
        .unzip();

    if y_values.is_empty() {
        return Err(AppError::Render(format!(
            "no {} values to chart for {}",
            field.column(),
            subject
        )));
    }

    let title = match rows.first().map(EmissionRecord::dataset) {
        Some(Dataset::Sector) => format!("CO2 Emissions for {} Sector", subject),
        _ => format!("CO2 Emissions for {}", subject),
    };
    Ok(ChartSeries {
        title,
        subject,
        x_labels,
        y_values,
    })
}

/// Year-to-date totals of one record, oldest year first.
pub fn yearly_series(record: &EmissionRecord) -> AppResult<ChartSeries> {
    let subject = record.match_key().to_string();
    let (x_labels, y_values): (Vec<String>, Vec<f64>) = NumericField::YEARLY
        .iter()
        .filter_map(|field| {
            record
                .metrics
                .get(*field)
                .map(|v| (field.column().trim_end_matches("_YTD").to_string(), v))
        })
        .unzip();

    if y_values.is_empty() {
        return Err(AppError::Render(format!("no yearly totals to chart for {}", subject)));
    }

    Ok(ChartSeries {
        title: format!("CO2 Emissions Trend for {}", subject),
        subject,
        x_labels,
        y_values,
    })
}
