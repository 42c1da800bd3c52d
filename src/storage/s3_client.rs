// S3 client for chart uploads.
// Works against AWS and against the GCS XML interoperability endpoint
// (S3_ENDPOINT=https://storage.googleapis.com with HMAC keys).

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::info;

use super::BlobStore;
use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};

pub struct S3Client {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl S3Client {
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(AppError::Config(
                "GCS_BUCKET_NAME (or S3_BUCKET) must be set to publish charts".to_string(),
            ));
        }

        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| AppError::Config(format!("invalid S3 region: {}", e)))?,
        };

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Config(format!("invalid storage credentials: {}", e)))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| AppError::Config(format!("invalid bucket configuration: {}", e)))?;
        if config.endpoint.is_some() {
            bucket = bucket.with_path_style();
        }
        // Objects are created world-readable in the same request.
        bucket.add_header("x-amz-acl", "public-read");

        let public_base_url = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| bucket.url())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bucket: Box::new(bucket),
            public_base_url,
        })
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl BlobStore for S3Client {
    async fn upload_public(&self, path: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        let response = self
            .bucket
            .put_object_with_content_type(path, data, content_type)
            .await
            .map_err(|e| AppError::Publish(format!("Failed to upload image: {}", e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::Publish(format!(
                "Failed to upload image: storage returned status {}",
                status
            )));
        }

        info!(path = %path, bytes = data.len(), "Uploaded chart");
        Ok(self.public_url(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StorageConfig {
        StorageConfig {
            bucket: "charts".to_string(),
            region: "auto".to_string(),
            endpoint: Some("https://storage.googleapis.com".to_string()),
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            prefix: "co2_emissions_trends".to_string(),
            public_base_url: None,
        }
    }

    #[test]
    fn test_requires_bucket() {
        let mut cfg = config();
        cfg.bucket = String::new();
        assert!(matches!(S3Client::from_config(&cfg), Err(AppError::Config(_))));
    }

    #[test]
    fn test_public_url_uses_override() {
        let mut cfg = config();
        cfg.public_base_url = Some("https://cdn.example.com/charts/".to_string());
        let client = S3Client::from_config(&cfg).unwrap();
        assert_eq!(
            client.public_url("/co2_emissions_trends/a.svg"),
            "https://cdn.example.com/charts/co2_emissions_trends/a.svg"
        );
    }

    #[test]
    fn test_path_style_url_for_custom_endpoint() {
        let client = S3Client::from_config(&config()).unwrap();
        let url = client.public_url("co2_emissions_trends/a.svg");
        assert!(url.starts_with("https://storage.googleapis.com/charts/"), "{url}");
    }
}
