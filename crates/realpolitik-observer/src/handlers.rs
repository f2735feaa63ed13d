//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read the latest [`ObserverSnapshot`] from the shared
//! [`AppState`] and redact it for the current observation mode, so the
//! observer never blocks the turn cycle and never leaks what the mode
//! hides.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/game` | Full game snapshot |
//! | `GET` | `/api/civs` | List civilizations |
//! | `GET` | `/api/civs/{id}` | One civilization's details |
//! | `GET` | `/api/civs/{id}/map` | Tiles the civ has revealed |
//! | `GET` | `/api/civs/{id}/thoughts` | Private thoughts (omniscient only) |
//! | `GET` | `/api/events` | Query events (by turn or civ) |
//! | `GET` | `/api/relationships` | Pairwise relationship matrix |
//! | `GET` | `/api/analytics` | Analytics export |
//! | `GET` | `/api/machiavellian` | Machiavellian scores (omniscient only) |
//! | `GET` | `/api/result` | Final result once the game has ended |
//!
//! [`ObserverSnapshot`]: crate::state::ObserverSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use realpolitik_core::GameSnapshot;
use realpolitik_types::{CivId, ObservationMode};
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

/// Default page size for `GET /api/events`.
const DEFAULT_EVENT_LIMIT: usize = 100;

/// Largest page `GET /api/events` returns.
const MAX_EVENT_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/events` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Filter events by turn.
    pub turn: Option<u64>,
    /// Filter events naming this civ.
    pub civ: Option<String>,
    /// Maximum number of events to return (default 100).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing game status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let mode = state.observation_mode();
    let (turn, status, civs, events) = snapshot.game.as_ref().map_or_else(
        || (0, "initializing".to_owned(), 0, 0),
        |g| (g.turn, g.status.to_string(), g.civs.len(), g.events.len()),
    );
    let leader = snapshot
        .game
        .as_ref()
        .and_then(|g| g.standings.first())
        .map_or_else(|| "-".to_owned(), |s| format!("{} ({})", s.name, s.score));

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Realpolitik Observer</title>
    <style>
        body {{
            background: #14110f;
            color: #d9cfc1;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #e0a458; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8c8273; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #1f1a16;
            border: 1px solid #3a322b;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8c8273; font-size: 0.85rem; }}
        .metric .value {{ color: #e0a458; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #e0a458; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #9bc53d; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #3a322b; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Realpolitik Observer</h1>
    <p class="subtitle">Turn-based diplomacy and intrigue</p>

    <div>
        <div class="metric">
            <div class="label">Turn</div>
            <div class="value">{turn}</div>
        </div>
        <div class="metric">
            <div class="label">Status</div>
            <div class="value">{status}</div>
        </div>
        <div class="metric">
            <div class="label">Mode</div>
            <div class="value">{mode}</div>
        </div>
        <div class="metric">
            <div class="label">Civilizations</div>
            <div class="value">{civs}</div>
        </div>
        <div class="metric">
            <div class="label">Events</div>
            <div class="value">{events}</div>
        </div>
        <div class="metric">
            <div class="label">Leader</div>
            <div class="value">{leader}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/game">/api/game</a> -- Full game snapshot</li>
        <li><a href="/api/civs">/api/civs</a> -- List civilizations</li>
        <li><a href="/api/events">/api/events</a> -- Query events (?turn=N or ?civ=X)</li>
        <li><a href="/api/relationships">/api/relationships</a> -- Relationship matrix</li>
        <li><a href="/api/analytics">/api/analytics</a> -- Analytics export</li>
        <li><a href="/api/machiavellian">/api/machiavellian</a> -- Machiavellian scores</li>
        <li><a href="/api/operator/status">/api/operator/status</a> -- Lifecycle status</li>
        <li><code>/ws/turns</code> -- Live turn stream (WebSocket)</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/game -- full snapshot
// ---------------------------------------------------------------------------

/// Return the full game snapshot for the current observation mode.
pub async fn get_game(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let mode = state.observation_mode();

    if let Some(game) = &snapshot.game {
        Ok(Json(serde_json::to_value(game.redacted(mode))?))
    } else {
        // Nothing published yet.
        Ok(Json(serde_json::json!({
            "turn": 0,
            "status": "initializing",
            "observation_mode": mode,
        })))
    }
}

// ---------------------------------------------------------------------------
// GET /api/civs -- list civilizations
// ---------------------------------------------------------------------------

/// List civilizations with their standing.
pub async fn list_civs(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let mode = state.observation_mode();

    let civs: Vec<serde_json::Value> = snapshot
        .game
        .iter()
        .flat_map(|g| g.civs.iter())
        .map(|c| {
            let c = c.redacted(mode);
            serde_json::json!({
                "id": c.id,
                "name": c.name,
                "order": c.order,
                "score": c.score,
                "settlements": c.settlements.len(),
                "units": c.units.len(),
                "technologies": c.technologies.len(),
                "personality": c.personality,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": civs.len(),
        "civs": civs,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/civs/{id} -- civ details
// ---------------------------------------------------------------------------

/// Return one civilization's details for the current observation mode.
pub async fn get_civ(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let civ = parse_civ(&id_str)?;
    let snapshot = state.snapshot.read().await;
    let found = game(snapshot.game.as_ref())?
        .civs
        .iter()
        .find(|c| c.id == civ)
        .ok_or_else(|| ObserverError::NotFound(format!("civilization {civ}")))?;
    Ok(Json(serde_json::to_value(found.redacted(state.observation_mode()))?))
}

// ---------------------------------------------------------------------------
// GET /api/civs/{id}/map -- revealed tiles
// ---------------------------------------------------------------------------

/// Return the tiles a civilization has revealed.
pub async fn get_civ_map(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let civ = parse_civ(&id_str)?;
    let snapshot = state.snapshot.read().await;
    let map = snapshot
        .maps
        .get(&civ)
        .ok_or_else(|| ObserverError::NotFound(format!("civilization {civ}")))?;
    Ok(Json(serde_json::to_value(map)?))
}

// ---------------------------------------------------------------------------
// GET /api/civs/{id}/thoughts -- private thoughts
// ---------------------------------------------------------------------------

/// Return a civilization's private thoughts. Omniscient mode only.
pub async fn get_civ_thoughts(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let civ = parse_civ(&id_str)?;
    require_thoughts(state.observation_mode())?;
    let snapshot = state.snapshot.read().await;
    let found = game(snapshot.game.as_ref())?
        .civs
        .iter()
        .find(|c| c.id == civ)
        .ok_or_else(|| ObserverError::NotFound(format!("civilization {civ}")))?;
    Ok(Json(serde_json::json!({
        "civ": found.id,
        "name": found.name,
        "thoughts": found.thoughts,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/events -- query events
// ---------------------------------------------------------------------------

/// Query events by turn or civ.
///
/// # Query Parameters
///
/// - `turn`: Return events for a specific turn.
/// - `civ`: Return events naming a specific civ (UUID).
/// - `limit`: Maximum number of events to return (default 100, max 1000).
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let civ_filter = params.civ.as_deref().map(parse_civ).transpose()?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .min(MAX_EVENT_LIMIT);

    let snapshot = state.snapshot.read().await;
    let mode = state.observation_mode();

    let events: Vec<&realpolitik_types::GameEvent> = snapshot
        .game
        .iter()
        .flat_map(|g| g.events.iter())
        .filter(|e| mode.exposes_secrets() || !e.kind.is_covert())
        .filter(|e| {
            if let Some(turn) = params.turn
                && e.turn != turn
            {
                return false;
            }
            if let Some(civ) = civ_filter
                && !e.kind.involves(civ)
            {
                return false;
            }
            true
        })
        .take(limit)
        .collect();

    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/relationships
// ---------------------------------------------------------------------------

/// Return the pairwise relationship matrix.
pub async fn get_relationships(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let relationships = &game(snapshot.game.as_ref())?.relationships;
    Ok(Json(serde_json::json!({
        "count": relationships.len(),
        "relationships": relationships,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/analytics
// ---------------------------------------------------------------------------

/// Return the analytics export.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let export = snapshot
        .analytics
        .as_ref()
        .ok_or_else(|| ObserverError::Unavailable("no analytics published yet".to_owned()))?;
    Ok(Json(serde_json::to_value(export)?))
}

// ---------------------------------------------------------------------------
// GET /api/machiavellian
// ---------------------------------------------------------------------------

/// Return every civ's Machiavellian score. Omniscient mode only.
pub async fn get_machiavellian(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    require_thoughts(state.observation_mode())?;
    let snapshot = state.snapshot.read().await;
    let scores: Vec<serde_json::Value> = game(snapshot.game.as_ref())?
        .civs
        .iter()
        .map(|c| {
            serde_json::json!({
                "civ": c.id,
                "name": c.name,
                "score": c.machiavellian,
            })
        })
        .collect();
    Ok(Json(serde_json::json!({
        "count": scores.len(),
        "scores": scores,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/result
// ---------------------------------------------------------------------------

/// Return the final result once the game has ended.
pub async fn get_result(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let result = snapshot
        .result
        .as_ref()
        .ok_or_else(|| ObserverError::NotFound("the game has not ended".to_owned()))?;
    Ok(Json(serde_json::to_value(result)?))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a civ id from a string, returning an [`ObserverError`] on failure.
fn parse_civ(s: &str) -> Result<CivId, ObserverError> {
    s.parse::<Uuid>()
        .map(CivId::from)
        .map_err(|e| ObserverError::InvalidUuid(format!("{s}: {e}")))
}

fn game(snapshot: Option<&GameSnapshot>) -> Result<&GameSnapshot, ObserverError> {
    snapshot.ok_or_else(|| ObserverError::Unavailable("no game published yet".to_owned()))
}

fn require_thoughts(mode: ObservationMode) -> Result<(), ObserverError> {
    if mode.exposes_thoughts() {
        Ok(())
    } else {
        Err(ObserverError::Forbidden(format!(
            "private data is hidden in {mode} mode"
        )))
    }
}
