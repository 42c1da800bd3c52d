//! Dataset Store
//!
//! The two capabilities the query pipeline needs from the emissions store:
//! nearest-neighbour search over record embeddings and enumeration of a
//! categorical column.

use async_trait::async_trait;

use crate::models::{Dataset, EmissionRecord, SearchParams};
use crate::types::AppResult;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::{create_client, MongoStore};

#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Up to `search.limit` records nearest to `vector`, nearest first.
    /// Ordering among equally distant records is unspecified.
    async fn nearest(
        &self,
        dataset: Dataset,
        vector: &[f32],
        search: SearchParams,
    ) -> AppResult<Vec<EmissionRecord>>;

    /// Distinct values of a categorical column, sorted.
    async fn distinct(&self, dataset: Dataset, field: &str) -> AppResult<Vec<String>>;
}
