//! Operator REST API handlers for runtime game control.
//!
//! These endpoints drive the shared [`ControlState`] the autoplay loop
//! watches. A refused transition (pausing a stopped game, say) is a
//! `409 Conflict`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause autoplay |
//! | `POST` | `/api/operator/resume` | Resume autoplay |
//! | `POST` | `/api/operator/stop` | Stop the game |
//! | `POST` | `/api/operator/speed` | Set the turn delay (ms) |
//! | `POST` | `/api/operator/mode` | Set the observation mode |
//! | `GET` | `/api/operator/status` | Current lifecycle status |
//!
//! [`ControlState`]: realpolitik_core::ControlState

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use realpolitik_core::ControlState;
use realpolitik_types::{GameStatus, ObservationMode};
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

/// Longest turn delay the operator may set, one minute.
pub const MAX_TURN_DELAY_MS: u64 = 60_000;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New delay between autoplay turns in milliseconds.
    pub turn_delay_ms: u64,
}

/// Request body for `POST /api/operator/mode`.
#[derive(Debug, serde::Deserialize)]
pub struct SetModeRequest {
    /// New observation mode.
    pub mode: ObservationMode,
}

/// Response for lifecycle commands.
#[derive(Debug, serde::Serialize)]
struct TransitionResponse {
    ok: bool,
    previous: GameStatus,
    status: GameStatus,
    message: String,
}

fn control(state: &AppState) -> Result<&Arc<ControlState>, ObserverError> {
    state
        .control
        .as_ref()
        .ok_or_else(|| ObserverError::Unavailable("control state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause | resume | stop
// ---------------------------------------------------------------------------

/// Pause autoplay. Any pending turn delay is cancelled.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let control = control(&state)?;
    let previous = control.pause()?;
    info!("Operator paused the game");
    Ok(Json(TransitionResponse {
        ok: true,
        previous,
        status: control.status(),
        message: "Game paused".to_owned(),
    }))
}

/// Resume autoplay after a pause.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let control = control(&state)?;
    let previous = control.resume()?;
    info!("Operator resumed the game");
    Ok(Json(TransitionResponse {
        ok: true,
        previous,
        status: control.status(),
        message: "Game resumed".to_owned(),
    }))
}

/// Stop the game. The engine reports final scores once autoplay notices.
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let control = control(&state)?;
    let previous = control.stop()?;
    info!("Operator stopped the game");
    Ok(Json(TransitionResponse {
        ok: true,
        previous,
        status: control.status(),
        message: "Game stopped".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the delay between autoplay turns.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let control = control(&state)?;
    if body.turn_delay_ms > MAX_TURN_DELAY_MS {
        return Err(ObserverError::InvalidQuery(format!(
            "turn_delay_ms must be at most {MAX_TURN_DELAY_MS}"
        )));
    }
    let previous = control.set_turn_delay_ms(body.turn_delay_ms);
    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Turn delay changed from {previous}ms to {}ms", body.turn_delay_ms),
        "previous_delay_ms": previous,
        "new_delay_ms": body.turn_delay_ms,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/operator/mode
// ---------------------------------------------------------------------------

/// Change what the presentation layer may expose.
pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetModeRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let previous = control(&state)?.set_observation_mode(body.mode);
    info!(from = %previous, to = %body.mode, "Observation mode changed");
    Ok(Json(serde_json::json!({
        "ok": true,
        "previous_mode": previous,
        "mode": body.mode,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return the lifecycle status, turn, observation mode, and delay.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(control(&state)?.report()))
}
