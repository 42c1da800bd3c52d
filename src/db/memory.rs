use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::RwLock;

use super::mongo::decode_record;
use super::DatasetStore;
use crate::embeddings::EmbeddingProvider;
use crate::models::{
    Dataset, EmissionRecord, RecordKeys, SearchParams, CONTINENT, COUNTRY, SECTOR_NAME,
    SUBSECTOR_NAME,
};
use crate::types::{AppError, AppResult};

/// In-process store ranking records by cosine similarity.
///
/// Selected with `DATASET_STORE=memory` for local development without Atlas,
/// and used throughout the tests. Every record must carry an embedding of the
/// configured dimensionality.
#[derive(Clone)]
pub struct MemoryStore {
    dimensions: usize,
    inner: Arc<RwLock<HashMap<Dataset, Vec<EmissionRecord>>>>,
}

impl MemoryStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, record: EmissionRecord) -> AppResult<()> {
        if record.embedding.len() != self.dimensions {
            return Err(AppError::InvalidInput(format!(
                "embedding has {} dimensions, store expects {}",
                record.embedding.len(),
                self.dimensions
            )));
        }
        let mut guard = self.inner.write().await;
        guard.entry(record.dataset()).or_default().push(record);
        Ok(())
    }

    /// Loads a JSON fixture from disk. See [`MemoryStore::load_fixture_str`].
    pub async fn load_fixture(
        &self,
        path: &Path,
        embedder: &dyn EmbeddingProvider,
    ) -> AppResult<usize> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            AppError::Config(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        self.load_fixture_str(&content, embedder).await
    }

    /// Fixture shape is `{"sector": [...], "country": [...]}`, each entry laid
    /// out like a collection document. Entries without an `embedding` are
    /// embedded from their sector or country name. Returns the record count.
    pub async fn load_fixture_str(
        &self,
        content: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> AppResult<usize> {
        let fixture: Fixture = serde_json::from_str(content)
            .map_err(|e| AppError::Config(format!("invalid fixture: {e}")))?;

        let mut loaded = 0;
        for (dataset, entries) in [
            (Dataset::Sector, fixture.sector),
            (Dataset::Country, fixture.country),
        ] {
            for mut entry in entries {
                let embedding = entry.remove("embedding");
                let doc = mongodb::bson::to_document(&entry)
                    .map_err(|e| AppError::Config(format!("invalid {dataset} entry: {e}")))?;
                let mut record = decode_record(dataset, &doc);
                record.embedding = match embedding {
                    Some(value) => serde_json::from_value(value).map_err(|e| {
                        AppError::Config(format!("invalid embedding in {dataset} entry: {e}"))
                    })?,
                    None => embedder.encode(record.match_key()).await?,
                };
                self.insert(record).await?;
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    pub async fn len(&self, dataset: Dataset) -> usize {
        let guard = self.inner.read().await;
        guard.get(&dataset).map(Vec::len).unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    sector: Vec<Map<String, Value>>,
    #[serde(default)]
    country: Vec<Map<String, Value>>,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn column_value<'a>(record: &'a EmissionRecord, field: &str) -> Option<&'a str> {
    match (&record.keys, field) {
        (RecordKeys::Sector { sector_name, .. }, SECTOR_NAME) => Some(sector_name),
        (RecordKeys::Sector { subsector_name, .. }, SUBSECTOR_NAME) => Some(subsector_name),
        (RecordKeys::Country { continent, .. }, CONTINENT) => Some(continent),
        (RecordKeys::Country { country, .. }, COUNTRY) => Some(country),
        _ => None,
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn nearest(
        &self,
        dataset: Dataset,
        vector: &[f32],
        search: SearchParams,
    ) -> AppResult<Vec<EmissionRecord>> {
        if vector.len() != self.dimensions {
            return Err(AppError::InvalidInput(format!(
                "query vector has {} dimensions, store expects {}",
                vector.len(),
                self.dimensions
            )));
        }

        let guard = self.inner.read().await;
        let Some(records) = guard.get(&dataset) else {
            return Ok(Vec::new());
        };

        // Exact scan; the candidate cap applies to the ranked list, the way
        // an index keeps only the `num_candidates` closest before `limit`.
        let mut scored: Vec<(f32, &EmissionRecord)> = records
            .iter()
            .map(|r| (cosine(vector, &r.embedding), r))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(search.num_candidates.min(search.limit) as usize)
            .map(|(_, r)| {
                let mut row = r.clone();
                row.embedding.clear();
                row
            })
            .collect())
    }

    async fn distinct(&self, dataset: Dataset, field: &str) -> AppResult<Vec<String>> {
        let guard = self.inner.read().await;
        let values: BTreeSet<String> = guard
            .get(&dataset)
            .into_iter()
            .flatten()
            .filter_map(|r| column_value(r, field).map(str::to_string))
            .collect();

        if values.is_empty() {
            return Err(AppError::NotFound(format!(
                "No values found for {field} in the {dataset} dataset"
            )));
        }
        Ok(values.into_iter().collect())
    }
}
