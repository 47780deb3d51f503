//! Axum router assembly for the control and streaming APIs.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::runtime::Runtime;

use super::routes;
use super::ws_handler::ws_handler;

/// Build the full HTTP router: mission control routes plus the `/ws`
/// streaming upgrade endpoint, over a shared `Runtime`.
pub fn build_router(runtime: Arc<Runtime>) -> Router {
    Router::new()
        .route("/missions/start", post(routes::start_mission))
        .route("/missions/:mission_id", get(routes::get_mission))
        .route("/missions/:mission_id/stop", post(routes::stop_mission))
        .route("/missions/:mission_id/pause", post(routes::pause_mission))
        .route("/missions/:mission_id/resume", post(routes::resume_mission))
        .route("/missions/:mission_id/approve", post(routes::approve_mission))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(runtime)
}
