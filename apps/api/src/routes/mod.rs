pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::extract;
use crate::resources::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // AI extraction
        .route("/api/v1/extract-job", post(extract::handle_extract))
        // Candidate re-association (static segment wins over :resource/:id)
        .route(
            "/api/v1/candidates/assign",
            post(handlers::handle_assign_candidates),
        )
        // Generic dashboard resources
        .route(
            "/api/v1/:resource",
            get(handlers::handle_list).post(handlers::handle_create),
        )
        .route(
            "/api/v1/:resource/bulk",
            post(handlers::handle_create_bulk),
        )
        .route(
            "/api/v1/:resource/config",
            get(handlers::handle_resource_config),
        )
        .route(
            "/api/v1/:resource/:id",
            get(handlers::handle_get_by_id).patch(handlers::handle_update),
        )
        .with_state(state)
}
