use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

use crate::models::{Dataset, Operation, SearchParams};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub embeddings: EmbeddingConfig,
    pub storage: StorageConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

/// Where dataset rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl StoreBackend {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" | "atlas" => Some(StoreBackend::Mongo),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// JSON fixture loaded into the in-memory store.
    pub fixture_path: Option<String>,
    pub uri: String,
    pub database: String,
    pub sector_collection: String,
    pub country_collection: String,
    pub sector_index: String,
    pub country_index: String,
}

impl StoreConfig {
    pub fn collection(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Sector => &self.sector_collection,
            Dataset::Country => &self.country_collection,
        }
    }

    pub fn index(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Sector => &self.sector_index,
            Dataset::Country => &self.country_index,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible base URL; Ollama serves one at `/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub prefix: String,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub google_api_key: String,
    pub default_provider: String,
    pub default_model: String,
}

impl LLMConfig {
    /// API key for the configured provider, if one is set.
    pub fn active_api_key(&self) -> Option<String> {
        let key = match self.default_provider.as_str() {
            "google" | "gemini" => &self.google_api_key,
            _ => &self.openai_api_key,
        };
        if key.trim().is_empty() {
            None
        } else {
            Some(key.clone())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub serpapi_key: String,
    pub max_results: usize,
}

/// numCandidates / limit per dataset and operation.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub sector: DatasetTuning,
    pub country: DatasetTuning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetTuning {
    pub similar: SearchParams,
    pub lookup: SearchParams,
    pub report: SearchParams,
    pub compare: SearchParams,
    pub trend: SearchParams,
}

impl DatasetTuning {
    pub fn for_operation(&self, operation: Operation) -> SearchParams {
        match operation {
            Operation::Similar => self.similar,
            Operation::Lookup => self.lookup,
            Operation::Report => self.report,
            Operation::Compare => self.compare,
            Operation::Trend => self.trend,
        }
    }
}

impl PipelineConfig {
    pub fn params(&self, dataset: Dataset, operation: Operation) -> SearchParams {
        match dataset {
            Dataset::Sector => self.sector.for_operation(operation),
            Dataset::Country => self.country.for_operation(operation),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let sector_wide = SearchParams::new(100, 20);
        let country_single = SearchParams::new(10, 1);
        Self {
            sector: DatasetTuning {
                similar: SearchParams::new(100, 6),
                lookup: sector_wide,
                report: sector_wide,
                compare: sector_wide,
                trend: sector_wide,
            },
            country: DatasetTuning {
                similar: country_single,
                lookup: country_single,
                report: country_single,
                compare: country_single,
                trend: country_single,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let backend_id = env::var("DATASET_STORE").unwrap_or_else(|_| "mongo".to_string());
        let backend = StoreBackend::from_id(&backend_id)
            .with_context(|| format!("DATASET_STORE must be mongo or memory, got {backend_id}"))?;
        let uri = match backend {
            StoreBackend::Mongo => env::var("MONGO_URI").context("MONGO_URI must be set")?,
            StoreBackend::Memory => env::var("MONGO_URI").unwrap_or_default(),
        };

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            store: StoreConfig {
                backend,
                fixture_path: env::var("DATASET_FIXTURE").ok().filter(|p| !p.is_empty()),
                uri,
                database: env::var("MONGO_DATABASE")
                    .unwrap_or_else(|_| "CO2_Emission_data".to_string()),
                sector_collection: env::var("SECTOR_COLLECTION")
                    .unwrap_or_else(|_| "Emission_data_feb".to_string()),
                country_collection: env::var("COUNTRY_COLLECTION")
                    .unwrap_or_else(|_| "Emission_data_feb_country".to_string()),
                sector_index: env::var("SECTOR_VECTOR_INDEX")
                    .unwrap_or_else(|_| "vector_index".to_string()),
                country_index: env::var("COUNTRY_VECTOR_INDEX")
                    .unwrap_or_else(|_| "vector_index_country".to_string()),
            },
            embeddings: EmbeddingConfig {
                base_url: env::var("EMBEDDING_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
                api_key: env::var("EMBEDDING_API_KEY").ok().filter(|k| !k.is_empty()),
                model: env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "all-minilm".to_string()),
                dimensions: env::var("EMBEDDING_DIMENSIONS")
                    .unwrap_or_else(|_| "384".to_string())
                    .parse()
                    .context("EMBEDDING_DIMENSIONS must be an integer")?,
            },
            storage: StorageConfig {
                bucket: env::var("GCS_BUCKET_NAME")
                    .or_else(|_| env::var("S3_BUCKET"))
                    .unwrap_or_default(),
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                endpoint: env::var("S3_ENDPOINT").ok(),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                prefix: env::var("CHART_PREFIX")
                    .unwrap_or_else(|_| "co2_emissions_trends".to_string()),
                public_base_url: env::var("PUBLIC_BASE_URL").ok(),
            },
            llm: LLMConfig {
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                openai_base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                google_api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
                default_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "google".to_string()),
                default_model: env::var("LLM_MODEL")
                    .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            },
            search: SearchConfig {
                serpapi_key: env::var("SERPAPI_KEY").unwrap_or_default(),
                max_results: env::var("NEWS_MAX_RESULTS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("NEWS_MAX_RESULTS must be an integer")?,
            },
            pipeline: pipeline_from_env()?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Local defaults with no external services configured.
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                fixture_path: None,
                uri: "mongodb://localhost:27017".to_string(),
                database: "CO2_Emission_data".to_string(),
                sector_collection: "Emission_data_feb".to_string(),
                country_collection: "Emission_data_feb_country".to_string(),
                sector_index: "vector_index".to_string(),
                country_index: "vector_index_country".to_string(),
            },
            embeddings: EmbeddingConfig {
                base_url: "http://localhost:11434/v1".to_string(),
                api_key: None,
                model: "all-minilm".to_string(),
                dimensions: 384,
            },
            storage: StorageConfig {
                bucket: String::new(),
                region: "us-east-1".to_string(),
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                prefix: "co2_emissions_trends".to_string(),
                public_base_url: None,
            },
            llm: LLMConfig {
                openai_api_key: String::new(),
                openai_base_url: "https://api.openai.com/v1".to_string(),
                google_api_key: String::new(),
                default_provider: "google".to_string(),
                default_model: "gemini-2.0-flash".to_string(),
            },
            search: SearchConfig {
                serpapi_key: String::new(),
                max_results: 5,
            },
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Overrides like `SECTOR_REPORT_CANDIDATES=200` / `COUNTRY_SIMILAR_LIMIT=3`.
fn pipeline_from_env() -> Result<PipelineConfig> {
    let mut pipeline = PipelineConfig::default();
    for dataset in [Dataset::Sector, Dataset::Country] {
        let tuning = match dataset {
            Dataset::Sector => &mut pipeline.sector,
            Dataset::Country => &mut pipeline.country,
        };
        for operation in Operation::ALL {
            let slot = match operation {
                Operation::Similar => &mut tuning.similar,
                Operation::Lookup => &mut tuning.lookup,
                Operation::Report => &mut tuning.report,
                Operation::Compare => &mut tuning.compare,
                Operation::Trend => &mut tuning.trend,
            };
            let prefix = format!(
                "{}_{}",
                dataset.as_str().to_uppercase(),
                operation.as_str().to_uppercase()
            );
            if let Ok(raw) = env::var(format!("{prefix}_CANDIDATES")) {
                slot.num_candidates = raw
                    .parse()
                    .with_context(|| format!("{prefix}_CANDIDATES must be an integer"))?;
            }
            if let Ok(raw) = env::var(format!("{prefix}_LIMIT")) {
                slot.limit = raw
                    .parse()
                    .with_context(|| format!("{prefix}_LIMIT must be an integer"))?;
            }
        }
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_table() {
        let pipeline = PipelineConfig::default();
        assert_eq!(
            pipeline.params(Dataset::Sector, Operation::Similar),
            SearchParams::new(100, 6)
        );
        assert_eq!(
            pipeline.params(Dataset::Sector, Operation::Report),
            SearchParams::new(100, 20)
        );
        assert_eq!(
            pipeline.params(Dataset::Country, Operation::Trend),
            SearchParams::new(10, 1)
        );
    }

    #[test]
    fn test_store_backend_ids() {
        assert_eq!(StoreBackend::from_id("memory"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::from_id(" MongoDB "), Some(StoreBackend::Mongo));
        assert_eq!(StoreBackend::from_id("sqlite"), None);
    }

    #[test]
    fn test_active_api_key_follows_provider() {
        let mut llm = LLMConfig {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            google_api_key: String::new(),
            default_provider: "google".to_string(),
            default_model: "gemini-2.0-flash".to_string(),
        };
        assert!(llm.active_api_key().is_none());

        llm.default_provider = "openai".to_string();
        assert_eq!(llm.active_api_key().as_deref(), Some("sk-test"));
    }
}
