//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for turn summaries, the latest
//! [`ObserverSnapshot`] published by the engine, and the shared
//! [`ControlState`] the operator endpoints drive. The snapshot is stored
//! unredacted; handlers redact it for the observation mode in force when
//! the request arrives.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use realpolitik_core::analytics::AnalyticsExport;
use realpolitik_core::{ControlState, GameEngine, GameResult, GameSnapshot, MapView, TurnSummary};
use realpolitik_types::{CivId, GameStatus, ObservationMode};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for turn summaries.
///
/// A subscriber that falls behind by more than this many messages skips
/// ahead to the newest.
const BROADCAST_CAPACITY: usize = 256;

/// JSON turn summary pushed to stream subscribers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TurnBroadcast {
    /// The turn that completed.
    pub turn: u64,
    /// Lifecycle status after the turn.
    pub status: GameStatus,
    /// Decisions received in time.
    pub decisions: u32,
    /// Decisions that timed out.
    pub timeouts: u32,
    /// Commands applied.
    pub actions_applied: u32,
    /// Commands dropped.
    pub actions_dropped: u32,
    /// Battles fought.
    pub battles: u32,
    /// Events logged.
    pub events: u32,
    /// Wall-clock completion time.
    pub completed_at: DateTime<Utc>,
}

impl TurnBroadcast {
    /// Project a core turn summary.
    pub fn from_summary(summary: &TurnSummary, status: GameStatus) -> Self {
        Self {
            turn: summary.turn,
            status,
            decisions: summary.decisions,
            timeouts: summary.timeouts,
            actions_applied: summary.actions_applied,
            actions_dropped: summary.actions_dropped,
            battles: summary.maintenance.battles,
            events: u32::try_from(summary.events.len()).unwrap_or(u32::MAX),
            completed_at: Utc::now(),
        }
    }
}

/// Everything the REST endpoints serve, captured after a turn.
#[derive(Debug, Clone, Default)]
pub struct ObserverSnapshot {
    /// Omniscient game snapshot.
    pub game: Option<GameSnapshot>,
    /// Revealed tiles per civ.
    pub maps: BTreeMap<CivId, MapView>,
    /// Analytics export.
    pub analytics: Option<AnalyticsExport>,
    /// Final result once the game has ended.
    pub result: Option<GameResult>,
}

impl ObserverSnapshot {
    /// Capture the engine's current state.
    pub fn capture(engine: &GameEngine) -> Self {
        let game = engine.snapshot_as(ObservationMode::Omniscient);
        let maps = game
            .civs
            .iter()
            .filter_map(|c| engine.visible_map(c.id).map(|m| (c.id, m)))
            .collect();
        Self {
            game: Some(game),
            maps,
            analytics: Some(engine.analytics_export()),
            result: engine.result().cloned(),
        }
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for turn summaries.
    pub tx: broadcast::Sender<TurnBroadcast>,
    /// The latest snapshot (updated each turn).
    pub snapshot: Arc<RwLock<ObserverSnapshot>>,
    /// Shared lifecycle state (present when a game is attached).
    pub control: Option<Arc<ControlState>>,
}

impl AppState {
    /// Create a new application state with an empty snapshot.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(ObserverSnapshot::default())),
            control: None,
        }
    }

    /// Create a new application state with control state attached.
    pub fn with_control(control: Arc<ControlState>) -> Self {
        Self {
            control: Some(control),
            ..Self::new()
        }
    }

    /// Subscribe to the turn broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TurnBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a turn summary to all subscribers.
    ///
    /// Returns the number of receivers; 0 when nobody is listening.
    pub fn broadcast(&self, summary: &TurnBroadcast) -> usize {
        // send fails only when there are zero receivers.
        self.tx.send(summary.clone()).unwrap_or(0)
    }

    /// Replace the snapshot, waiting for readers to finish.
    pub async fn publish(&self, engine: &GameEngine) {
        let captured = ObserverSnapshot::capture(engine);
        *self.snapshot.write().await = captured;
    }

    /// Replace the snapshot unless a reader holds the lock. Returns
    /// whether the snapshot was updated; a skipped update is caught up on
    /// the next turn.
    pub fn try_publish(&self, engine: &GameEngine) -> bool {
        self.snapshot.try_write().is_ok_and(|mut snap| {
            *snap = ObserverSnapshot::capture(engine);
            true
        })
    }

    /// Observation mode to redact for. Without control state attached
    /// everything is shown.
    pub fn observation_mode(&self) -> ObservationMode {
        self.control
            .as_ref()
            .map_or_else(ObservationMode::default, |c| c.observation_mode())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
