//! LabDesk backend-for-frontend HTTP service
//!
//! A thin route layer: every endpoint authenticates the bearer token,
//! verifies ownership, performs one backend or model call, and shapes
//! the response. All state lives in the external collaborators.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod state;

pub use state::State;

use axum::extract::Extension;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

/// Liveness probe; the only unauthenticated endpoint.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the full route tree over `state`.
pub fn router(state: State) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/projects",
            get(api::projects::list).post(api::projects::create),
        )
        .route(
            "/api/projects/:project_id",
            get(api::projects::get)
                .put(api::projects::update)
                .delete(api::projects::delete),
        )
        .route(
            "/api/projects/:project_id/notebook",
            get(api::notebook::get)
                .post(api::notebook::create)
                .put(api::notebook::update),
        )
        .route("/api/projects/:project_id/files", get(api::files::list))
        .route(
            "/api/projects/:project_id/files/:file_id",
            delete(api::files::delete),
        )
        .route(
            "/api/projects/:project_id/agent/analyze",
            post(api::agent::analyze),
        )
        .route("/api/projects/:project_id/agent", get(api::agent::get))
        .route(
            "/api/projects/:project_id/agent/steps",
            put(api::agent::update_steps),
        )
        .route(
            "/api/projects/:project_id/agent/chat",
            post(api::agent::chat),
        )
        .route(
            "/api/projects/:project_id/agent/execute/:step_index",
            post(api::agent::execute_step),
        )
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
