use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_matcher, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chat_api_server::config::Settings;
use chat_api_server::models::chat::Role;
use chat_api_server::services::llm::{
    BackendStream, ChatBackend, Completion, CompletionRequest, StreamEvent,
};
use chat_api_server::utils::error::ApiError;
use chat_api_server::{build_router, AppState};

/// Answers every call with a fixed text and every stream with fixed chunks.
struct StubBackend {
    reply: String,
    chunks: Vec<String>,
    fail: bool,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubBackend {
    fn new(reply: &str, chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            chunks: Vec::new(),
            fail: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: &CompletionRequest) -> Result<(), ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            Err(ApiError::LlmError("LLM API error: 500".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatBackend for StubBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ApiError> {
        self.record(request)?;
        Ok(Completion::text(self.reply.clone()))
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<BackendStream, ApiError> {
        self.record(request)?;
        let events: Vec<Result<StreamEvent, ApiError>> = self
            .chunks
            .iter()
            .map(|c| Ok(StreamEvent::Delta(c.clone())))
            .collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

fn state_with(backend: Arc<StubBackend>, settings: Settings) -> AppState {
    AppState::with_backend(settings, backend)
}

async fn send(state: &AppState, request: Request<Body>) -> Response {
    build_router(state.clone()).oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn post_stateless_query_returns_backend_text() {
    let backend = StubBackend::new("Test response", &[]);
    let state = state_with(backend.clone(), Settings::default());

    let response = send(&state, post("/no-state-query", "Hello, world!")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain;charset=UTF-8"
    );
    assert_eq!(body_text(response).await, "Test response");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].content, "Hello, world!");
}

#[tokio::test]
async fn get_stateless_query_streams_exact_event_frames() {
    let backend = StubBackend::new("", &["Hello", " ", "World!"]);
    let state = state_with(backend, Settings::default());

    let response = send(&state, get("/no-state-query?message=hi")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream;charset=UTF-8"
    );
    assert_eq!(
        body_text(response).await,
        "data: Hello\n\ndata:  \n\ndata: World!\n\n"
    );
}

#[tokio::test]
async fn get_query_accepts_query_alias() {
    let backend = StubBackend::new("", &["ok"]);
    let state = state_with(backend.clone(), Settings::default());

    let response = send(&state, get("/no-state-query?query=Tell%20me%20more")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "data: ok\n\n");
    assert_eq!(backend.requests()[0].messages[0].content, "Tell me more");
}

#[tokio::test]
async fn get_query_without_message_is_bad_request() {
    let state = state_with(StubBackend::new("", &[]), Settings::default());

    let response = send(&state, get("/no-state-query")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_query_without_body_is_bad_request() {
    let backend = StubBackend::new("ok", &[]);
    let state = state_with(backend.clone(), Settings::default());

    let response = send(&state, post("/no-state-query", "")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn whitespace_message_is_forwarded() {
    let backend = StubBackend::new("ok", &["ok"]);
    let state = state_with(backend.clone(), Settings::default());

    let response = send(&state, post("/no-state-query", "   ")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, get("/no-state-query?message=%20")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "data: ok\n\n");

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages[0].content, "   ");
    assert_eq!(requests[1].messages[0].content, " ");
}

#[tokio::test]
async fn stateful_query_without_conversation_id_is_bad_request() {
    let backend = StubBackend::new("Test response", &["x"]);
    let state = state_with(backend.clone(), Settings::default());

    let response = send(&state, get("/state-query?message=hi")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&state, post("/smart-query", "hi")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn stateful_query_carries_context_between_requests() {
    let backend = StubBackend::new("Nice to meet you", &[]);
    let state = state_with(backend.clone(), Settings::default());

    let first = send(&state, post("/state-query?conversation_id=c1", "I am Sam")).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = Request::builder()
        .method(Method::POST)
        .uri("/state-query")
        .header("X-Conversation-Id", "c1")
        .body(Body::from("Who am I?"))
        .unwrap();
    let second = send(&state, second).await;
    assert_eq!(second.status(), StatusCode::OK);

    let requests = backend.requests();
    let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    assert_eq!(requests[1].messages[0].content, "I am Sam");

    let other = send(&state, post("/state-query?conversation_id=c2", "hello")).await;
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(backend.requests()[2].messages.len(), 1);
}

#[tokio::test]
async fn smart_query_sends_system_prompt_and_tools() {
    let backend = StubBackend::new("I am Kavitha", &[]);
    let state = state_with(backend.clone(), Settings::default());

    let response = send(&state, post("/smart-query?conversation_id=c1", "What is your name?")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let request = &backend.requests()[0];
    assert_eq!(request.messages[0].role, Role::System);
    assert_eq!(request.tools.len(), 4);
}

#[tokio::test]
async fn default_conversation_id_applies_when_configured() {
    let backend = StubBackend::new("ok", &[]);
    let mut settings = Settings::default();
    settings.memory.default_conversation_id = Some("12345".to_string());
    let state = state_with(backend, settings);

    let response = send(&state, post("/state-query", "hi")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let memory = state.context.memory().unwrap();
    assert_eq!(memory.get_context("12345").len(), 2);
}

#[tokio::test]
async fn backend_failure_maps_to_service_unavailable() {
    let state = state_with(StubBackend::failing(), Settings::default());

    let response = send(&state, post("/no-state-query", "hi")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = send(&state, get("/no-state-query?message=hi")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn delete_conversation_resets_memory() {
    let backend = StubBackend::new("ok", &[]);
    let state = state_with(backend, Settings::default());

    send(&state, post("/state-query?conversation_id=c1", "hi")).await;
    send(&state, post("/smart-query?conversation_id=c1", "hi")).await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/conversations/c1")
        .body(Body::empty())
        .unwrap();
    let response = send(&state, request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.context.memory().unwrap().get_context("c1").is_empty());
    assert!(state.smart.memory().unwrap().get_context("c1").is_empty());
}

#[tokio::test]
async fn generate_uses_huggingface_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_matcher("authorization", "Bearer hf-key"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "Tell me a joke"}],
            "stream": false
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"choices":[{"messages":{"content":"Test response"}}]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.huggingface.url = format!("{}/v1/chat/completions", server.uri());
    settings.huggingface.api_key = "hf-key".to_string();
    let state = state_with(StubBackend::new("", &[]), settings);

    let response = send(&state, get("/ai/generate")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["generation"], "Test response");
}

#[tokio::test]
async fn generate_failure_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.huggingface.url = server.uri();
    let state = state_with(StubBackend::new("", &[]), settings);

    let response = send(&state, get("/ai/generate?ask=hi")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let state = state_with(StubBackend::new("", &[]), Settings::default());

    let response = send(&state, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");

    let response = send(&state, get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["active_conversations"]["context"], 0);
    assert!(body["active_conversations"]["max_per_store"].is_null());

    send(&state, post("/state-query?conversation_id=c1", "hi")).await;
    send(&state, post("/smart-query?conversation_id=c1", "hi")).await;
    send(&state, post("/smart-query?conversation_id=c2", "hi")).await;

    let response = send(&state, get("/health/ready")).await;
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["active_conversations"]["context"], 1);
    assert_eq!(body["active_conversations"]["smart"], 2);
}
