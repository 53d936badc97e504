use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::chat::{GenerateParams, GenerationResponse};
use crate::services::HuggingFaceService;
use crate::utils::error::ApiError;

/// `GET /ai/generate?ask=...` through the HuggingFace endpoint.
pub async fn generate_handler(
    State(huggingface): State<Arc<HuggingFaceService>>,
    Query(params): Query<GenerateParams>,
) -> Result<Json<GenerationResponse>, ApiError> {
    info!("Generate request: ask_len={}", params.ask.len());

    let generation = huggingface.generate_text_from_prompt(&params.ask).await?;

    Ok(Json(GenerationResponse { generation }))
}
