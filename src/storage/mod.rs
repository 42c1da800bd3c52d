// Storage layer (S3-compatible blob store for published charts)

use async_trait::async_trait;

use crate::types::{AppError, AppResult};

pub mod s3_client;

pub use s3_client::*;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `data` at `path` with public-read access and returns its public URL.
    async fn upload_public(&self, path: &str, data: &[u8], content_type: &str) -> AppResult<String>;
}

/// Stand-in when no bucket is configured; every upload fails.
pub struct DisabledBlobStore;

#[async_trait]
impl BlobStore for DisabledBlobStore {
    async fn upload_public(&self, _path: &str, _data: &[u8], _content_type: &str) -> AppResult<String> {
        Err(AppError::Publish(
            "Failed to upload image: no bucket configured (set GCS_BUCKET_NAME or S3_BUCKET)".to_string(),
        ))
    }
}
