//! Autoplay loop with lifecycle controls.
//!
//! [`autoplay`] drives [`GameEngine::run_turn`] until the game ends,
//! honoring pause, resume, stop, and the adjustable turn delay from the
//! shared [`ControlState`](crate::control::ControlState). A pause cancels
//! the pending delay, so no turn starts after `pause` has returned.

use std::time::Duration;

use realpolitik_types::GameStatus;
use tracing::{info, warn};

use crate::control::ControlError;
use crate::engine::{EngineError, GameEngine, GameResult};
use crate::turn::TurnSummary;

/// Callback invoked after each completed turn.
///
/// Implementations publish snapshots to the observer, print progress, and
/// so on.
pub trait TurnCallback: Send {
    /// Called after a turn completes.
    fn on_turn(&mut self, summary: &TurnSummary, engine: &GameEngine);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl TurnCallback for NoOpCallback {
    fn on_turn(&mut self, _summary: &TurnSummary, _engine: &GameEngine) {}
}

/// Run turns until the game ends.
///
/// Starts the game if it is still `ready`. Returns the final result, or
/// the error that stopped the game.
pub async fn autoplay(
    engine: &mut GameEngine,
    callback: &mut dyn TurnCallback,
) -> Result<GameResult, EngineError> {
    if engine.status() == GameStatus::Ready {
        engine.start()?;
    }
    let control = engine.control();
    info!(
        max_turns = engine.config().max_turns,
        turn_delay_ms = control.turn_delay_ms(),
        "Autoplay starting"
    );

    loop {
        if let Some(result) = engine.result() {
            return Ok(result.clone());
        }

        if control.status() == GameStatus::Paused {
            info!(turn = control.turn(), "Paused, waiting for resume");
        }
        if !control.wait_while_paused().await {
            info!("Stop requested");
            return Ok(engine.stop()?.clone());
        }

        let summary = match engine.run_turn().await {
            Ok(summary) => summary,
            // A pause or stop landed after the wait; the loop head handles it.
            Err(e) if turn_deferred(&e) => {
                info!(status = %control.status(), "Turn deferred");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Autoplay halted");
                return Err(e);
            }
        };
        callback.on_turn(&summary, engine);
        if engine.is_finished() {
            continue;
        }

        let delay_ms = control.turn_delay_ms();
        if delay_ms > 0 {
            // A pause or stop cuts the delay short; the loop head handles it.
            control.delay(Duration::from_millis(delay_ms)).await;
        }
    }
}

/// Whether a refused turn should wait for the lifecycle to settle instead
/// of halting autoplay.
fn turn_deferred(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::Control(ControlError::InvalidTransition {
            from: GameStatus::Paused | GameStatus::Stopped,
            ..
        })
    )
}

/// Log the end of a game.
pub fn log_game_end(result: &GameResult) {
    info!(
        reason = ?result.reason,
        turns = result.turns,
        winner = ?result.winner,
        "Game ended"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::GameConfig;
    use crate::decision::IdleProvider;
    use crate::engine::EndReason;

    struct Counter(u64);

    impl TurnCallback for Counter {
        fn on_turn(&mut self, summary: &TurnSummary, _engine: &GameEngine) {
            self.0 = summary.turn;
        }
    }

    fn engine(max_turns: u64, delay: u64) -> GameEngine {
        let config = GameConfig {
            map_width: 8,
            map_height: 8,
            civilizations: 2,
            max_turns,
            turn_delay_ms: delay,
            random_events: false,
            ..GameConfig::default()
        };
        let mut engine = GameEngine::new(config, Arc::new(IdleProvider::new())).unwrap();
        engine.initialize().unwrap();
        engine
    }

    #[tokio::test]
    async fn runs_to_max_turns() {
        let mut engine = engine(4, 0);
        let mut counter = Counter(0);
        let result = autoplay(&mut engine, &mut counter).await.unwrap();
        assert_eq!(result.reason, EndReason::MaxTurns);
        assert_eq!(result.turns, 4);
        assert_eq!(counter.0, 4);
    }

    #[test]
    fn paused_or_stopped_rejection_defers_the_turn() {
        let refused = |from| {
            EngineError::Control(ControlError::InvalidTransition {
                action: "run a turn of",
                from,
            })
        };
        assert!(turn_deferred(&refused(GameStatus::Paused)));
        assert!(turn_deferred(&refused(GameStatus::Stopped)));
        assert!(!turn_deferred(&refused(GameStatus::Ready)));
        assert!(!turn_deferred(&refused(GameStatus::Initializing)));
    }

    #[tokio::test]
    async fn pause_after_wait_skips_the_turn() {
        let mut engine = engine(1_000, 0);
        engine.start().unwrap();
        let control = engine.control();
        control.pause().unwrap();
        assert!(engine.run_turn().await.is_err());
        assert_eq!(engine.state().turn, 0);

        let handle = tokio::spawn(async move {
            let result = autoplay(&mut engine, &mut NoOpCallback).await;
            (result, engine)
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(control.turn(), 0);
        control.stop().unwrap();
        let (result, engine) = handle.await.unwrap();
        assert_eq!(result.unwrap().reason, EndReason::Stopped);
        assert_eq!(engine.state().turn, 0);
    }

    #[tokio::test]
    async fn external_stop_ends_autoplay() {
        let mut engine = engine(1_000, 50);
        let control = engine.control();
        let handle = tokio::spawn(async move {
            let result = autoplay(&mut engine, &mut NoOpCallback).await;
            (result, engine)
        });
        tokio::time::sleep(Duration::from_millis(120)).await;
        control.stop().unwrap();
        let (result, engine) = handle.await.unwrap();
        let result = result.unwrap();
        assert_eq!(result.reason, EndReason::Stopped);
        assert!(result.turns < 1_000);
        assert!(engine.is_finished());
    }

    #[tokio::test]
    async fn pause_holds_the_turn_counter() {
        let mut engine = engine(1_000, 30);
        let control = engine.control();
        let handle = tokio::spawn(async move {
            let result = autoplay(&mut engine, &mut NoOpCallback).await;
            (result, engine)
        });
        tokio::time::sleep(Duration::from_millis(80)).await;
        control.pause().unwrap();
        let paused_at = control.turn();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(control.turn(), paused_at);

        control.resume().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(control.turn() > paused_at);
        control.stop().unwrap();
        let (result, _engine) = handle.await.unwrap();
        assert_eq!(result.unwrap().reason, EndReason::Stopped);
    }
}
