use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::info;

use crate::agents::ToolOutput;
use crate::models::{AgentSummary, AppState};
use crate::types::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/agents/{agent}/tools/{tool}", post(invoke_tool))
        .with_state(state)
}

async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    Json(state.manager.summaries())
}

/// Runs one tool with the JSON body as its arguments. An empty body counts
/// as no arguments.
async fn invoke_tool(
    State(state): State<AppState>,
    Path((agent, tool)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> Result<Json<ToolOutput>, AppError> {
    info!(agent = %agent, tool = %tool, "Direct tool invocation");
    let args = body
        .map(|Json(v)| v)
        .unwrap_or_else(|| Value::Object(Default::default()));
    let output = state.manager.invoke(&agent, &tool, args).await?;
    Ok(Json(output))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;

    use std::sync::Arc;

    use crate::routes::test_support::{app, app_with_store, send};
    use crate::testing::{DownStore, RejectingStore};

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_lists_agents_with_tools() {
        let request = Request::get("/api/agents").body(Body::empty()).unwrap();
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["analysis_country_agent", "analysis_sector_agent", "news_analyst"]);
    }

    #[tokio::test]
    async fn test_invokes_sector_report() {
        let request = post_json(
            "/api/agents/analysis_sector_agent/tools/get_sector_report",
            json!({"sector_name": "Energy"}),
        );
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["result"].as_str().unwrap().contains("Subsector: Power"));
    }

    #[tokio::test]
    async fn test_tool_errors_are_payloads() {
        let request = post_json(
            "/api/agents/analysis_sector_agent/tools/get_sector_report",
            json!({"sector_name": "Mining"}),
        );
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "No data found for sector: Mining");
    }

    #[tokio::test]
    async fn test_rejected_store_command_is_a_payload() {
        let request = post_json(
            "/api/agents/analysis_sector_agent/tools/get_sector_report",
            json!({"sector_name": "Energy"}),
        );
        let (status, body) = send(app_with_store(Arc::new(RejectingStore)), request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].as_str().unwrap().contains("index not found"));
    }

    #[tokio::test]
    async fn test_store_outage_is_503() {
        let request = post_json(
            "/api/agents/analysis_sector_agent/tools/get_sector_report",
            json!({"sector_name": "Energy"}),
        );
        let (status, body) = send(app_with_store(Arc::new(DownStore)), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "store_unavailable");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_404() {
        let request = post_json("/api/agents/analysis_sector_agent/tools/nope", json!({}));
        let (status, body) = send(app().await, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }
}
