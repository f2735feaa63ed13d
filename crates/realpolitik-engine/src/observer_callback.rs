//! Turn callback that updates the Observer API state.
//!
//! After each turn, this callback broadcasts a [`TurnBroadcast`] to stream
//! subscribers and refreshes the snapshot the REST handlers serve.

use std::sync::Arc;

use realpolitik_core::runner::TurnCallback;
use realpolitik_core::{GameEngine, TurnSummary};
use realpolitik_observer::state::{AppState, TurnBroadcast};
use tracing::debug;

/// Callback that bridges the turn loop to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl TurnCallback for ObserverCallback {
    fn on_turn(&mut self, summary: &TurnSummary, engine: &GameEngine) {
        let broadcast = TurnBroadcast::from_summary(summary, engine.status());
        let receivers = self.state.broadcast(&broadcast);
        debug!(turn = summary.turn, receivers, "Turn broadcast sent");

        // A REST handler holding the read lock makes us skip this update;
        // the next turn catches up.
        if !self.state.try_publish(engine) {
            debug!(turn = summary.turn, "Snapshot busy, update skipped");
        }
    }
}
