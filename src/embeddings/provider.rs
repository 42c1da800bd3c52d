//! Embedding provider trait and the OpenAI-compatible implementation.
//!
//! The same client talks to OpenAI and to a local Ollama (`/v1/embeddings`),
//! which serves `all-minilm`, the model the emissions collections were
//! embedded with.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::types::{AppError, AppResult};

/// Converts text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn encode(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Dimensionality of every vector this provider returns.
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dims: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        dims: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            dims,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            config.model.clone(),
            config.dimensions,
        )
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn encode(&self, text: &str) -> AppResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "embedding API error ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("failed to parse embedding response: {}", e)))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Embedding("embedding response had no data".to_string()))?;

        if vector.len() != self.dims {
            return Err(AppError::Embedding(format!(
                "model {} returned {} dimensions, expected {}",
                self.model,
                vector.len(),
                self.dims
            )));
        }

        debug!(model = %self.model, text_len = text.len(), "Encoded query text");
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_encode_parses_first_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.25,-0.5,1.0]}]}"#)
            .create_async()
            .await;

        let embedder = OpenAiEmbedder::new(
            &format!("{}/v1/", server.url()),
            Some("secret".to_string()),
            "all-minilm",
            3,
        );
        let vector = embedder.encode("energy").await.unwrap();

        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
        assert_eq!(embedder.model_name(), "all-minilm");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_encode_rejects_wrong_dimensions() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.1,0.2]}]}"#)
            .create_async()
            .await;

        let embedder = OpenAiEmbedder::new(&server.url(), None, "all-minilm", 384);
        let err = embedder.encode("energy").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_encode_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(500)
            .with_body("model not loaded")
            .create_async()
            .await;

        let embedder = OpenAiEmbedder::new(&server.url(), None, "all-minilm", 3);
        let err = embedder.encode("energy").await.unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }
}
