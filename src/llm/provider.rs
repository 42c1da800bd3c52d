use async_trait::async_trait;
use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for LLM provider (renamed to avoid conflict with LLMProvider enum in types.rs)
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    /// Overrides the provider's public endpoint (OpenAI-compatible servers, tests).
    pub base_url: Option<String>,
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let kind = LLMProvider::from_id(&provider.name).ok_or_else(|| {
            AppError::Config(format!("Unsupported provider: {}", provider.name))
        })?;

        let adapter: Box<dyn LLMAdapter> = match (kind, provider.base_url) {
            (LLMProvider::OpenAI, Some(base)) => Box::new(
                crate::llm::openai::OpenAIAdapter::with_base_url(&provider.api_key, &base),
            ),
            (LLMProvider::OpenAI, None) => {
                Box::new(crate::llm::openai::OpenAIAdapter::new(&provider.api_key))
            }
            (LLMProvider::Google, Some(base)) => Box::new(
                crate::llm::google::GoogleAdapter::with_base_url(&provider.api_key, &base),
            ),
            (LLMProvider::Google, None) => {
                Box::new(crate::llm::google::GoogleAdapter::new(&provider.api_key))
            }
        };

        Ok(Self {
            adapter,
            provider_name: provider.name,
        })
    }

    /// The configured default provider, or `None` when it has no API key.
    pub fn from_config(config: &LLMConfig) -> AppResult<Option<Self>> {
        let Some(api_key) = config.active_api_key() else {
            return Ok(None);
        };
        let base_url = match LLMProvider::from_id(&config.default_provider) {
            Some(LLMProvider::OpenAI) if !config.openai_base_url.is_empty() => {
                Some(config.openai_base_url.clone())
            }
            _ => None,
        };
        Self::new(LLMProviderConfig {
            name: config.default_provider.clone(),
            api_key,
            base_url,
        })
        .map(Some)
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}
