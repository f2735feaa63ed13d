//! Axum router construction for the Observer API.
//!
//! Assembles every route into a single [`Router`] with CORS enabled for
//! cross-origin dashboard access and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// See [`handlers`] and [`operator`] for the endpoint tables and [`ws`]
/// for the turn stream. CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Read API
        .route("/api/game", get(handlers::get_game))
        .route("/api/civs", get(handlers::list_civs))
        .route("/api/civs/{id}", get(handlers::get_civ))
        .route("/api/civs/{id}/map", get(handlers::get_civ_map))
        .route("/api/civs/{id}/thoughts", get(handlers::get_civ_thoughts))
        .route("/api/events", get(handlers::list_events))
        .route("/api/relationships", get(handlers::get_relationships))
        .route("/api/analytics", get(handlers::get_analytics))
        .route("/api/machiavellian", get(handlers::get_machiavellian))
        .route("/api/result", get(handlers::get_result))
        // Live turn stream
        .route("/ws/turns", get(ws::ws_turns))
        // Operator API
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/stop", post(operator::stop))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/mode", post(operator::set_mode))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
