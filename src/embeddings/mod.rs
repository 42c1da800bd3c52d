// Embeddings for query text

pub mod provider;

pub use provider::*;
