use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;

use crate::state::AppState;

/// `DELETE /conversations/{id}`: forget the id in every memory store.
pub async fn reset_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> StatusCode {
    let cleared = state
        .stateful_services()
        .into_iter()
        .map(|service| service.reset(&conversation_id))
        .filter(|existed| *existed)
        .count();

    info!(
        "Conversation {} reset ({} store(s) held it)",
        conversation_id, cleared
    );

    StatusCode::NO_CONTENT
}
