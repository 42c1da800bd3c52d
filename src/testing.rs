// Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::{DatasetStore, MemoryStore};
use crate::embeddings::EmbeddingProvider;
use crate::models::{Dataset, EmissionRecord, NumericField, SearchParams};
use crate::storage::BlobStore;
use crate::types::{AppError, AppResult};

pub const DIMS: usize = 4;

const ENERGY: [f32; DIMS] = [1.0, 0.0, 0.0, 0.0];
const TRANSPORT: [f32; DIMS] = [0.0, 1.0, 0.0, 0.0];
const INDUSTRY: [f32; DIMS] = [0.0, 0.0, 1.0, 0.0];
const ELSEWHERE: [f32; DIMS] = [0.0, 0.0, 0.0, 1.0];

/// Maps known words to fixed vectors; anything else lands on an unused axis.
pub struct KeywordEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        let vectors = [
            ("energy", ENERGY),
            ("transport", TRANSPORT),
            ("industry", INDUSTRY),
            ("france", ENERGY),
            ("germany", TRANSPORT),
        ]
        .into_iter()
        .map(|(word, v)| (word.to_string(), v.to_vec()))
        .collect();
        Self { vectors }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn encode(&self, text: &str) -> AppResult<Vec<f32>> {
        Ok(self
            .vectors
            .get(&text.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| ELSEWHERE.to_vec()))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn encode(&self, _text: &str) -> AppResult<Vec<f32>> {
        Err(AppError::Embedding("connection refused".to_string()))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Store whose connection is gone.
pub struct DownStore;

#[async_trait]
impl DatasetStore for DownStore {
    async fn nearest(
        &self,
        _dataset: Dataset,
        _vector: &[f32],
        _search: SearchParams,
    ) -> AppResult<Vec<EmissionRecord>> {
        Err(AppError::StoreUnavailable("server selection timeout".to_string()))
    }

    async fn distinct(&self, _dataset: Dataset, _field: &str) -> AppResult<Vec<String>> {
        Err(AppError::StoreUnavailable("server selection timeout".to_string()))
    }
}

/// Store that is reachable but rejects every command.
pub struct RejectingStore;

#[async_trait]
impl DatasetStore for RejectingStore {
    async fn nearest(
        &self,
        _dataset: Dataset,
        _vector: &[f32],
        _search: SearchParams,
    ) -> AppResult<Vec<EmissionRecord>> {
        Err(AppError::StoreQuery("PlanExecutor error: index not found".to_string()))
    }

    async fn distinct(&self, _dataset: Dataset, _field: &str) -> AppResult<Vec<String>> {
        Err(AppError::StoreQuery("not authorized on CO2_Emission_data".to_string()))
    }
}

/// Energy has two Power rows (100 in total, pct 2.0 and 4.0) and an Oil
/// Refining row without a pct value. Industry shares the Power subsector,
/// Transport shares nothing with Energy.
pub async fn sample_store() -> MemoryStore {
    use NumericField::*;

    let store = MemoryStore::new(DIMS);
    let rows = vec![
        EmissionRecord::sector("Energy", "Power")
            .with_metric(Mar2025Total, 60.0)
            .with_metric(MonthlyPctChange, 2.0)
            .with_metric(Ytd2025, 180.0)
            .with_embedding(ENERGY.to_vec()),
        EmissionRecord::sector("Energy", "Power")
            .with_metric(Mar2025Total, 40.0)
            .with_metric(MonthlyPctChange, 4.0)
            .with_metric(Ytd2025, 120.0)
            .with_embedding(ENERGY.to_vec()),
        EmissionRecord::sector("Energy", "Oil Refining")
            .with_metric(Mar2025Total, 25.5)
            .with_embedding(ENERGY.to_vec()),
        EmissionRecord::sector("Transport", "Road")
            .with_metric(Mar2025Total, 30.0)
            .with_embedding(TRANSPORT.to_vec()),
        EmissionRecord::sector("Transport", "Aviation")
            .with_metric(Mar2025Total, 20.0)
            .with_embedding(TRANSPORT.to_vec()),
        EmissionRecord::sector("Industry", "Power")
            .with_metric(Mar2025Total, 10.0)
            .with_metric(MonthlyPctChange, -1.5)
            .with_embedding(INDUSTRY.to_vec()),
        EmissionRecord::country("Europe", "France")
            .with_metric(Mar2025Total, 25.0)
            .with_metric(Ytd2021, 300.0)
            .with_metric(Ytd2022, 310.0)
            .with_metric(Ytd2024, 290.0)
            .with_metric(Ytd2025, 75.0)
            .with_embedding(ENERGY.to_vec()),
        EmissionRecord::country("Europe", "Germany")
            .with_metric(Mar2025Total, 55.0)
            .with_embedding(TRANSPORT.to_vec()),
    ];
    for row in rows {
        // Fixture rows all carry DIMS-long embeddings.
        let _ = store.insert(row).await;
    }
    store
}

/// Records uploads instead of sending them anywhere.
#[derive(Default)]
pub struct RecordingBlobStore {
    uploads: Mutex<Vec<(String, String)>>,
    failure: Option<String>,
}

impl RecordingBlobStore {
    pub fn failing(reason: &str) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            failure: Some(reason.to_string()),
        }
    }

    /// `(path, content_type)` of every upload attempt.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads().len()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn upload_public(&self, path: &str, _data: &[u8], content_type: &str) -> AppResult<String> {
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push((path.to_string(), content_type.to_string()));
        }
        match &self.failure {
            Some(reason) => Err(AppError::Publish(format!("Failed to upload image: {reason}"))),
            None => Ok(format!("https://blobs.test/{path}")),
        }
    }
}
