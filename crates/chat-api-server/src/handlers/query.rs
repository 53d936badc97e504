//! Chat query endpoints.
//!
//! Each mode answers `GET` with an event stream (`message` query parameter)
//! and `POST` with a single plain-text answer (raw text body).

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tracing::info;

use crate::models::chat::{ConversationParams, QueryParams};
use crate::services::ChatService;
use crate::state::AppState;
use crate::utils::error::ApiError;
use crate::utils::sse::{event_frame, EVENT_STREAM_CONTENT_TYPE};

pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

const TEXT_PLAIN_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Stateless,
    Context,
    Smart,
}

impl ChatMode {
    fn service(self, state: &AppState) -> &ChatService {
        match self {
            ChatMode::Stateless => &state.stateless,
            ChatMode::Context => &state.context,
            ChatMode::Smart => &state.smart,
        }
    }
}

/// Query parameter first, then header, then the configured default.
fn resolve_conversation_id(
    state: &AppState,
    from_query: Option<String>,
    headers: &HeaderMap,
) -> Option<String> {
    from_query
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            headers
                .get(CONVERSATION_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .or_else(|| state.settings.memory.default_conversation_id.clone())
}

async fn stream_query(
    state: AppState,
    mode: ChatMode,
    headers: HeaderMap,
    params: QueryParams,
) -> Result<Response, ApiError> {
    let message = params
        .message
        .ok_or_else(|| ApiError::BadRequest("message parameter is required".to_string()))?;
    let conversation_id = resolve_conversation_id(&state, params.conversation_id, &headers);

    info!(
        "Stream query: mode={:?}, conversation={:?}, message_len={}",
        mode,
        conversation_id,
        message.len()
    );

    let chunks = mode
        .service(&state)
        .stream(&message, conversation_id.as_deref())
        .await?;
    let frames = chunks.map(|chunk| chunk.map(|fragment| event_frame(&fragment)));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE)),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}

async fn call_query(
    state: AppState,
    mode: ChatMode,
    headers: HeaderMap,
    params: ConversationParams,
    body: String,
) -> Result<Response, ApiError> {
    // An absent body arrives as an empty string; whitespace is a message.
    if body.is_empty() {
        return Err(ApiError::BadRequest("request body is required".to_string()));
    }
    let conversation_id = resolve_conversation_id(&state, params.conversation_id, &headers);

    info!(
        "Call query: mode={:?}, conversation={:?}, message_len={}",
        mode,
        conversation_id,
        body.len()
    );

    let answer = mode
        .service(&state)
        .call(&body, conversation_id.as_deref())
        .await?;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_CONTENT_TYPE))],
        answer,
    )
        .into_response())
}

pub async fn no_state_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    stream_query(state, ChatMode::Stateless, headers, params).await
}

pub async fn no_state_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ConversationParams>,
    body: String,
) -> Result<Response, ApiError> {
    call_query(state, ChatMode::Stateless, headers, params, body).await
}

pub async fn state_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    stream_query(state, ChatMode::Context, headers, params).await
}

pub async fn state_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ConversationParams>,
    body: String,
) -> Result<Response, ApiError> {
    call_query(state, ChatMode::Context, headers, params, body).await
}

pub async fn smart_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
) -> Result<Response, ApiError> {
    stream_query(state, ChatMode::Smart, headers, params).await
}

pub async fn smart_call(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ConversationParams>,
    body: String,
) -> Result<Response, ApiError> {
    call_query(state, ChatMode::Smart, headers, params, body).await
}
