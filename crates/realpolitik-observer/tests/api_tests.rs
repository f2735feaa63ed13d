//! Integration tests for the Observer API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use realpolitik_core::setup::make_unit;
use realpolitik_core::{GameConfig, GameEngine, IdleProvider, Thought};
use realpolitik_observer::router::build_router;
use realpolitik_observer::state::{AppState, TurnBroadcast};
use realpolitik_types::{CivId, GameStatus, UnitKind};
use serde_json::Value;
use tower::ServiceExt;

struct Fixture {
    state: Arc<AppState>,
    civ: CivId,
}

async fn make_test_state() -> Fixture {
    let config = GameConfig {
        map_width: 8,
        map_height: 8,
        civilizations: 2,
        max_turns: 10,
        turn_delay_ms: 0,
        random_events: false,
        ..GameConfig::default()
    };
    let mut engine = GameEngine::new(config, Arc::new(IdleProvider::new())).unwrap();
    engine.initialize().unwrap();
    engine.start().unwrap();

    let civ = engine.state().civs[0].id;
    let capital = engine.state().settlements_of(civ)[0].position;
    let spy = make_unit(civ, UnitKind::Spy, capital, 0);
    let state = engine.state_mut();
    state.units.insert(spy.id, spy);
    state.thoughts.entry(civ).or_default().push(Thought {
        turn: 0,
        text: "Trust no one".into(),
    });
    engine.run_turn().await.unwrap();

    let app = Arc::new(AppState::with_control(engine.control()));
    app.publish(&engine).await;
    Fixture { state: app, civ }
}

async fn get(state: &Arc<AppState>, path: &str) -> Response {
    build_router(Arc::clone(state))
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(state: &Arc<AppState>, path: &str, body: &str) -> Response {
    build_router(Arc::clone(state))
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_to_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =========================================================================
// Read API
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let fx = make_test_state().await;
    let response = get(&fx.state, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_get_game_before_publish() {
    let state = Arc::new(AppState::new());
    let response = get(&state, "/api/game").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["turn"], 0);
    assert_eq!(json["status"], "initializing");
}

#[tokio::test]
async fn test_get_game() {
    let fx = make_test_state().await;
    let response = get(&fx.state, "/api/game").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["turn"], 1);
    assert_eq!(json["map_width"], 8);
    assert_eq!(json["civs"].as_array().unwrap().len(), 2);
    assert_eq!(json["tiles"].as_array().unwrap().len(), 64);
}

#[tokio::test]
async fn test_list_civs() {
    let fx = make_test_state().await;
    let json = body_to_json(get(&fx.state, "/api/civs").await).await;

    assert_eq!(json["count"], 2);
    assert_eq!(json["civs"][0]["order"], 0);
}

#[tokio::test]
async fn test_get_civ_by_id() {
    let fx = make_test_state().await;
    let response = get(&fx.state, &format!("/api/civs/{}", fx.civ)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["id"], fx.civ.to_string());
    assert_eq!(json["thoughts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_civ_not_found() {
    let fx = make_test_state().await;
    let response = get(&fx.state, &format!("/api/civs/{}", uuid::Uuid::now_v7())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_civ_invalid_uuid() {
    let fx = make_test_state().await;
    let response = get(&fx.state, "/api/civs/not-a-uuid").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_civ_map() {
    let fx = make_test_state().await;
    let response = get(&fx.state, &format!("/api/civs/{}/map", fx.civ)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    let tiles = json["tiles"].as_array().unwrap().len();
    assert!(tiles > 0 && tiles < 64);
}

#[tokio::test]
async fn test_list_events_filter_by_turn_no_match() {
    let fx = make_test_state().await;
    let json = body_to_json(get(&fx.state, "/api/events?turn=999").await).await;

    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_relationships_and_analytics() {
    let fx = make_test_state().await;
    let json = body_to_json(get(&fx.state, "/api/relationships").await).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["relationships"][0]["status"], "unknown");

    let response = get(&fx.state, "/api/analytics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["turn"], 1);
    assert!(json["standings"].is_array());
}

#[tokio::test]
async fn test_result_missing_until_game_ends() {
    let fx = make_test_state().await;
    let response = get(&fx.state, "/api/result").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Observation mode gating
// =========================================================================

#[tokio::test]
async fn test_thoughts_gated_by_mode() {
    let fx = make_test_state().await;
    let path = format!("/api/civs/{}/thoughts", fx.civ);

    let response = get(&fx.state, &path).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["thoughts"][0]["text"], "Trust no one");

    let response = post_json(&fx.state, "/api/operator/mode", r#"{"mode":"diplomatic"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(get(&fx.state, &path).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        get(&fx.state, "/api/machiavellian").await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_public_mode_hides_spies() {
    let fx = make_test_state().await;
    let path = format!("/api/civs/{}", fx.civ);
    let omniscient = body_to_json(get(&fx.state, &path).await).await;
    let all_units = omniscient["units"].as_array().unwrap().len();

    post_json(&fx.state, "/api/operator/mode", r#"{"mode":"public"}"#).await;
    let public = body_to_json(get(&fx.state, &path).await).await;

    assert_eq!(public["units"].as_array().unwrap().len(), all_units - 1);
    assert!(public["thoughts"].as_array().unwrap().is_empty());
    assert!(public["machiavellian"].is_null());
}

// =========================================================================
// Operator API
// =========================================================================

#[tokio::test]
async fn test_pause_then_conflict() {
    let fx = make_test_state().await;

    let response = post_json(&fx.state, "/api/operator/pause", "{}").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["previous"], "running");
    assert_eq!(json["status"], "paused");

    let response = post_json(&fx.state, "/api/operator/pause", "{}").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_to_json(get(&fx.state, "/api/operator/status").await).await;
    assert_eq!(json["status"], "paused");
    assert_eq!(json["turn"], 1);
}

#[tokio::test]
async fn test_stop_is_terminal() {
    let fx = make_test_state().await;
    assert_eq!(
        post_json(&fx.state, "/api/operator/stop", "{}").await.status(),
        StatusCode::OK
    );
    assert_eq!(
        fx.state.control.as_ref().unwrap().status(),
        GameStatus::Stopped
    );
    assert_eq!(
        post_json(&fx.state, "/api/operator/resume", "{}").await.status(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_speed_bounds() {
    let fx = make_test_state().await;

    let response = post_json(&fx.state, "/api/operator/speed", r#"{"turn_delay_ms":250}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response).await;
    assert_eq!(json["previous_delay_ms"], 0);
    assert_eq!(fx.state.control.as_ref().unwrap().turn_delay_ms(), 250);

    let response =
        post_json(&fx.state, "/api/operator/speed", r#"{"turn_delay_ms":600000}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operator_without_control() {
    let state = Arc::new(AppState::new());
    let response = post_json(&state, "/api/operator/pause", "{}").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =========================================================================
// Plumbing
// =========================================================================

#[tokio::test]
async fn test_broadcast_channel() {
    let state = AppState::new();
    let mut rx = state.subscribe();

    let summary = TurnBroadcast {
        turn: 42,
        status: GameStatus::Running,
        decisions: 4,
        timeouts: 0,
        actions_applied: 7,
        actions_dropped: 1,
        battles: 0,
        events: 9,
        completed_at: chrono::Utc::now(),
    };

    assert_eq!(state.broadcast(&summary), 1);

    let received = rx.recv().await.unwrap();
    assert_eq!(received.turn, 42);
    assert_eq!(received.actions_applied, 7);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let fx = make_test_state().await;
    let response = get(&fx.state, "/api/nonexistent").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
