//! HTTP boundary for the external chat client: request validation, the
//! generic failure surface, and nothing else. Pipeline logic stays in the
//! pipeline modules.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::error::PipelineError;
use crate::pipeline::ChatPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub version: &'static str,
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(handle_chat_request))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> ResponseJson<HealthResponse> {
    ResponseJson(HealthResponse {
        service: "lecture-chat-backend",
        status: "operational",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn handle_chat_request(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<ResponseJson<ChatResponse>, StatusCode> {
    // Boundary validation: an empty message never invokes the pipeline.
    if request.message.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    info!(message = %request.message, "Received chat request");

    match state.pipeline.run(&request.message).await {
        Ok(outcome) => Ok(ResponseJson(ChatResponse {
            response: outcome.into_response_text(),
        })),
        Err(e) => {
            // Detail stays server-side; the caller only ever sees a
            // generic failure. Fatal kinds are flagged for alerting.
            error!(
                error = %e,
                kind = e.kind(),
                fatal = e.is_fatal(),
                "Chat request failed"
            );
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
