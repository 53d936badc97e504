use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: String,
    active_conversations: ActiveConversations,
    activity_queue: usize,
}

#[derive(Serialize)]
pub struct ActiveConversations {
    context: usize,
    smart: usize,
    max_per_store: Option<usize>,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let stats = |service: &crate::services::ChatService| service.memory().map(|memory| memory.stats());
    let context = stats(&state.context);
    let smart = stats(&state.smart);

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            active_conversations: ActiveConversations {
                context: context.as_ref().map_or(0, |s| s.active_conversations),
                smart: smart.as_ref().map_or(0, |s| s.active_conversations),
                max_per_store: context.and_then(|s| s.max_conversations),
            },
            activity_queue: state.activity_logger.queue_len(),
        }),
    )
}
