use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use co2_agents::agents::{country_agent, news_agent, sector_agent, DataTools, ManagerAgent};
use co2_agents::chart::ChartPublisher;
use co2_agents::config::StoreBackend;
use co2_agents::db::{create_client, DatasetStore, MemoryStore, MongoStore};
use co2_agents::embeddings::{EmbeddingProvider, OpenAiEmbedder};
use co2_agents::llm::LLM;
use co2_agents::pipeline::QueryPipeline;
use co2_agents::search::SerpApiClient;
use co2_agents::storage::{BlobStore, DisabledBlobStore, S3Client};
use co2_agents::{config::Config, routes::create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "co2_agents=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let embedder = Arc::new(OpenAiEmbedder::from_config(&config.embeddings));
    info!(model = %config.embeddings.model, "Embedding provider ready");

    let store: Arc<dyn DatasetStore> = match config.store.backend {
        StoreBackend::Mongo => {
            let client = create_client(&config.store).await?;
            Arc::new(MongoStore::new(client, config.store.clone()))
        }
        StoreBackend::Memory => {
            let store = MemoryStore::new(embedder.dimensions());
            match &config.store.fixture_path {
                Some(path) => {
                    let records = store.load_fixture(Path::new(path), embedder.as_ref()).await?;
                    info!(records, path = %path, "Loaded dataset fixture");
                }
                None => warn!("In-memory dataset store has no DATASET_FIXTURE, queries will find nothing"),
            }
            Arc::new(store)
        }
    };

    let blob: Arc<dyn BlobStore> = match S3Client::from_config(&config.storage) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "Chart publishing disabled");
            Arc::new(DisabledBlobStore)
        }
    };

    let tools = Arc::new(DataTools::new(
        Arc::new(QueryPipeline::new(embedder, store)),
        Arc::new(ChartPublisher::new(blob, config.storage.prefix.clone())),
        config.pipeline.clone(),
    ));

    let news = SerpApiClient::from_config(&config.search);
    if news.is_none() {
        warn!("SERPAPI_KEY not set, news search disabled");
    }

    let llm = LLM::from_config(&config.llm)?;
    match &llm {
        Some(llm) => info!(provider = llm.provider_name(), model = %config.llm.default_model, "LLM ready"),
        None => warn!("No LLM API key set, chat will only list capabilities"),
    }

    let manager = ManagerAgent::new(
        vec![sector_agent(tools.clone()), country_agent(tools), news_agent(news)],
        llm,
        config.llm.default_model.clone(),
    );

    let state = AppState {
        config: config.clone(),
        manager: Arc::new(manager),
    };
    let app = create_router(state);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
