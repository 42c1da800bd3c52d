// CO2 emissions agents - similarity search, reports and charts over the emissions datasets

pub mod config;
pub mod db;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod search;    // News search (SerpAPI)
pub mod embeddings;
pub mod storage;
pub mod routes;
pub mod pipeline;
pub mod report;
pub mod chart;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
