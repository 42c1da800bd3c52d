//! API Routes
//!
//! - `/api/health` - Health check
//! - `/api/agents` - Agents and their tool schemas
//! - `/api/agents/{agent}/tools/{tool}` - Direct tool invocation
//! - `/api/chat` - Conversation through the manager agent

pub mod agents;
pub mod chat;
pub mod health;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::models::AppState;
use crate::types::AppError;

pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(health::router(state.clone()))
        .merge(agents::router(state.clone()))
        .merge(chat::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `*` (or no list) allows any origin; unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ComparisonUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::StoreQuery(_)
            | AppError::LLMApi(_)
            | AppError::Embedding(_)
            | AppError::Search(_)
            | AppError::Publish(_) => StatusCode::BAD_GATEWAY,
            AppError::Render(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::agents::{country_agent, news_agent, sector_agent, DataTools, ManagerAgent};
    use crate::chart::ChartPublisher;
    use crate::config::{Config, PipelineConfig};
    use crate::db::DatasetStore;
    use crate::models::AppState;
    use crate::pipeline::QueryPipeline;
    use crate::testing::{sample_store, KeywordEmbedder, RecordingBlobStore};

    pub async fn app() -> Router {
        app_with_store(Arc::new(sample_store().await))
    }

    pub fn app_with_store(store: Arc<dyn DatasetStore>) -> Router {
        let pipeline = QueryPipeline::new(Arc::new(KeywordEmbedder::new()), store);
        let tools = Arc::new(DataTools::new(
            Arc::new(pipeline),
            Arc::new(ChartPublisher::new(
                Arc::new(RecordingBlobStore::default()),
                "co2_emissions_trends",
            )),
            PipelineConfig::default(),
        ));
        let manager = ManagerAgent::new(
            vec![sector_agent(tools.clone()), country_agent(tools), news_agent(None)],
            None,
            "gemini-2.0-flash",
        );
        super::create_router(AppState {
            config: Config::for_tests(),
            manager: Arc::new(manager),
        })
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::StoreUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidInput("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::StoreQuery("index not found".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
