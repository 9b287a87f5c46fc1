//! API layer - routes, handlers, and middleware

pub mod envelope;
pub mod extractors;
pub mod handlers;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

use crate::state::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    // Everything except registration/login/refresh sits behind the auth
    // middleware, which resolves the caller from the bearer token.
    let protected = Router::new()
        .nest("/auth", handlers::auth::protected_router())
        .nest("/patients", handlers::patients::router())
        .nest("/doctors", handlers::doctors::router())
        .nest("/appointments", handlers::appointments::router())
        .nest("/medical-records", handlers::records::router())
        .nest("/prescriptions", handlers::prescriptions::router())
        .nest("/lab-results", handlers::lab_results::router())
        .nest("/messages", handlers::messages::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::auth_middleware,
        ));

    let api = Router::new()
        .nest("/auth", handlers::auth::public_router())
        .merge(protected);

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .nest("/api", api)
        .with_state(state)
        // Add middleware (applied in reverse order)
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        // Limit request body size to prevent DoS via large payloads
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "stethos-server"
    }))
}

async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "server": "Stethos API",
            "version": env!("CARGO_PKG_VERSION"),
            "status": "running"
        })),
    )
}
