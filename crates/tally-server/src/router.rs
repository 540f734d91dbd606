use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all Tally endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/votes/:target_type", get(handler::user_votes_batch_handler))
        .route(
            "/v1/votes/:target_type/:target_id",
            get(handler::user_vote_handler).post(handler::cast_vote_handler),
        )
        .route(
            "/v1/targets/:target_type/:target_id",
            get(handler::tally_handler).put(handler::register_target_handler),
        )
        .route(
            "/v1/targets/:target_type/:target_id/audit",
            post(handler::audit_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
