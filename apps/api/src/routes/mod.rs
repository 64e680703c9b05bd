pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs and recommendations
        .route("/api/v1/jobs", post(handlers::handle_create_job))
        .route("/api/v1/jobs/:id", get(handlers::handle_get_job))
        .route("/api/v1/jobs/:id/analyze", post(handlers::handle_analyze_job))
        .route(
            "/api/v1/jobs/:id/recommendations",
            get(handlers::handle_list_recommendations),
        )
        // Candidate browse and disclosure
        .route("/api/v1/candidates", get(handlers::handle_search_candidates))
        .route("/api/v1/candidates/:id", get(handlers::handle_get_candidate))
        .route(
            "/api/v1/candidates/:id/unlock",
            post(handlers::handle_unlock_candidate),
        )
        .route("/api/v1/unlocks", get(handlers::handle_list_unlocks))
        .with_state(state)
}
