use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let chat_routes = Router::new()
        .route("/ai/generate", get(handlers::generate::generate_handler))
        .route(
            "/no-state-query",
            get(handlers::query::no_state_stream).post(handlers::query::no_state_call),
        )
        .route(
            "/state-query",
            get(handlers::query::state_stream).post(handlers::query::state_call),
        )
        .route(
            "/smart-query",
            get(handlers::query::smart_stream).post(handlers::query::smart_call),
        )
        .route(
            "/conversations/{id}",
            delete(handlers::conversation::reset_conversation),
        );

    Router::new()
        .merge(health_routes)
        .merge(chat_routes)
        .with_state(state)
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}
