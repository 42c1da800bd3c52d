use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::models::{AppState, ChatRequest, ChatResponse};
use crate::types::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(post_chat))
        .with_state(state)
}

pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    info!(message_len = request.message.len(), "Received chat request");
    let response = state.manager.handle(&request.message).await?;
    info!(
        agent = response.agent.as_deref().unwrap_or("manager"),
        tool = response.tool.as_deref().unwrap_or("-"),
        "Chat response sent"
    );
    Ok(Json(response))
}
