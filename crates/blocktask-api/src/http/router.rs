//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Tasks
        .route("/tasks", get(handlers::task::list_tasks))
        .route("/tasks/{id}", delete(handlers::task::delete_task))
        .route(
            "/tasks/{id}/program",
            get(handlers::task::get_program).put(handlers::task::put_program),
        )
        .route(
            "/tasks/{id}/graph",
            get(handlers::graph::get_graph).put(handlers::graph::put_graph),
        )
        // Conversational building
        .route("/chat/sessions", post(handlers::chat::create_session))
        .route("/chat/sessions/{id}/turns", post(handlers::chat::post_turn))
        // Grammar
        .route("/grammar", get(handlers::grammar::get_grammar))
        .route("/health", get(health_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/v1/health - Liveness check.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
