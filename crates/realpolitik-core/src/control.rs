//! Shared lifecycle and observation state.
//!
//! [`ControlState`] is wrapped in an [`Arc`](std::sync::Arc) and shared
//! between the engine, the autoplay runner, and the observer API. Every
//! field is an atomic so readers never take a lock; the [`Notify`] wakes a
//! pending autoplay delay when the status changes.
//!
//! Lifecycle:
//!
//! ```text
//! initializing -> ready -> running <-> paused
//!                   \         \         /
//!                    `-------> stopped <'
//! ```

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use realpolitik_types::{GameStatus, ObservationMode};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::info;

/// Rejected lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// The requested transition is not allowed from the current status.
    #[error("cannot {action} a game that is {from}")]
    InvalidTransition {
        /// What was attempted.
        action: &'static str,
        /// Status at the time.
        from: GameStatus,
    },
}

fn encode_status(status: GameStatus) -> u8 {
    GameStatus::ALL
        .iter()
        .position(|s| *s == status)
        .and_then(|i| u8::try_from(i).ok())
        .unwrap_or(0)
}

fn decode_status(raw: u8) -> GameStatus {
    GameStatus::ALL
        .get(usize::from(raw))
        .copied()
        .unwrap_or(GameStatus::Stopped)
}

fn encode_mode(mode: ObservationMode) -> u8 {
    ObservationMode::ALL
        .iter()
        .position(|m| *m == mode)
        .and_then(|i| u8::try_from(i).ok())
        .unwrap_or(0)
}

fn decode_mode(raw: u8) -> ObservationMode {
    ObservationMode::ALL
        .get(usize::from(raw))
        .copied()
        .unwrap_or_default()
}

/// Lock-free lifecycle state shared with the observer.
#[derive(Debug)]
pub struct ControlState {
    status: AtomicU8,
    observation_mode: AtomicU8,
    turn: AtomicU64,
    turn_delay_ms: AtomicU64,
    wake: Notify,
}

impl ControlState {
    /// Fresh state in [`GameStatus::Initializing`].
    pub fn new(observation_mode: ObservationMode, turn_delay_ms: u64) -> Self {
        Self {
            status: AtomicU8::new(encode_status(GameStatus::Initializing)),
            observation_mode: AtomicU8::new(encode_mode(observation_mode)),
            turn: AtomicU64::new(0),
            turn_delay_ms: AtomicU64::new(turn_delay_ms),
            wake: Notify::new(),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> GameStatus {
        decode_status(self.status.load(Ordering::Acquire))
    }

    /// Whether autoplay may run a turn.
    pub fn is_running(&self) -> bool {
        self.status() == GameStatus::Running
    }

    /// Whether the game has stopped.
    pub fn is_stopped(&self) -> bool {
        self.status() == GameStatus::Stopped
    }

    /// Move from one of `from` to `to`, or fail leaving status unchanged.
    fn transition(
        &self,
        action: &'static str,
        from: &[GameStatus],
        to: GameStatus,
    ) -> Result<GameStatus, ControlError> {
        let next = encode_status(to);
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            let status = decode_status(current);
            if !from.contains(&status) {
                return Err(ControlError::InvalidTransition {
                    action,
                    from: status,
                });
            }
            match self
                .status
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    info!(from = %status, to = %to, "Game status changed");
                    self.wake.notify_waiters();
                    return Ok(status);
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// `initializing -> ready`.
    pub fn mark_ready(&self) -> Result<GameStatus, ControlError> {
        self.transition("initialize", &[GameStatus::Initializing], GameStatus::Ready)
    }

    /// `ready -> running`.
    pub fn start(&self) -> Result<GameStatus, ControlError> {
        self.transition("start", &[GameStatus::Ready], GameStatus::Running)
    }

    /// `running -> paused`. Wakes any pending autoplay delay before
    /// returning.
    pub fn pause(&self) -> Result<GameStatus, ControlError> {
        self.transition("pause", &[GameStatus::Running], GameStatus::Paused)
    }

    /// `paused -> running`.
    pub fn resume(&self) -> Result<GameStatus, ControlError> {
        self.transition("resume", &[GameStatus::Paused], GameStatus::Running)
    }

    /// Any non-terminal status `-> stopped`.
    pub fn stop(&self) -> Result<GameStatus, ControlError> {
        self.transition(
            "stop",
            &[
                GameStatus::Initializing,
                GameStatus::Ready,
                GameStatus::Running,
                GameStatus::Paused,
            ],
            GameStatus::Stopped,
        )
    }

    // -----------------------------------------------------------------------
    // Autoplay waits
    // -----------------------------------------------------------------------

    /// Sleep for `delay` unless the status changes first.
    ///
    /// Returns `true` when the full delay elapsed while still running.
    pub async fn delay(&self, delay: Duration) -> bool {
        let woken = self.wake.notified();
        tokio::pin!(woken);
        woken.as_mut().enable();
        if !self.is_running() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(delay) => self.is_running(),
            () = woken => false,
        }
    }

    /// Wait while paused. Returns `false` once the game has stopped.
    pub async fn wait_while_paused(&self) -> bool {
        loop {
            let woken = self.wake.notified();
            tokio::pin!(woken);
            woken.as_mut().enable();
            match self.status() {
                GameStatus::Paused => woken.await,
                GameStatus::Stopped => return false,
                GameStatus::Initializing | GameStatus::Ready | GameStatus::Running => {
                    return true;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Observation mode and counters
    // -----------------------------------------------------------------------

    /// Current observation mode.
    pub fn observation_mode(&self) -> ObservationMode {
        decode_mode(self.observation_mode.load(Ordering::Acquire))
    }

    /// Change the observation mode. Returns the previous mode.
    pub fn set_observation_mode(&self, mode: ObservationMode) -> ObservationMode {
        decode_mode(self.observation_mode.swap(encode_mode(mode), Ordering::AcqRel))
    }

    /// Last completed turn.
    pub fn turn(&self) -> u64 {
        self.turn.load(Ordering::Acquire)
    }

    pub(crate) fn set_turn(&self, turn: u64) {
        self.turn.store(turn, Ordering::Release);
    }

    /// Autoplay delay in milliseconds.
    pub fn turn_delay_ms(&self) -> u64 {
        self.turn_delay_ms.load(Ordering::Acquire)
    }

    /// Change the autoplay delay. Returns the previous value.
    pub fn set_turn_delay_ms(&self, ms: u64) -> u64 {
        self.turn_delay_ms.swap(ms, Ordering::AcqRel)
    }

    /// Serializable status for the observer.
    pub fn report(&self) -> ControlReport {
        ControlReport {
            status: self.status(),
            turn: self.turn(),
            observation_mode: self.observation_mode(),
            turn_delay_ms: self.turn_delay_ms(),
        }
    }
}

/// JSON status of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReport {
    /// Lifecycle status.
    pub status: GameStatus,
    /// Last completed turn.
    pub turn: u64,
    /// Current observation mode.
    pub observation_mode: ObservationMode,
    /// Autoplay delay in milliseconds.
    pub turn_delay_ms: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn ready() -> ControlState {
        let control = ControlState::new(ObservationMode::Omniscient, 0);
        control.mark_ready().unwrap();
        control
    }

    #[test]
    fn lifecycle_happy_path() {
        let control = ready();
        control.start().unwrap();
        assert!(control.is_running());
        control.pause().unwrap();
        assert_eq!(control.status(), GameStatus::Paused);
        control.resume().unwrap();
        control.stop().unwrap();
        assert!(control.is_stopped());
    }

    #[test]
    fn invalid_transitions_leave_status_unchanged() {
        let control = ControlState::new(ObservationMode::Public, 0);
        assert_eq!(
            control.start().unwrap_err(),
            ControlError::InvalidTransition {
                action: "start",
                from: GameStatus::Initializing,
            }
        );
        assert_eq!(control.status(), GameStatus::Initializing);

        let control = ready();
        assert!(control.pause().is_err());
        assert!(control.resume().is_err());
        control.stop().unwrap();
        assert!(control.stop().is_err());
        assert!(control.start().is_err());
        assert!(control.is_stopped());
    }

    #[test]
    fn observation_mode_swaps() {
        let control = ready();
        let previous = control.set_observation_mode(ObservationMode::Diplomatic);
        assert_eq!(previous, ObservationMode::Omniscient);
        assert_eq!(control.observation_mode(), ObservationMode::Diplomatic);
    }

    #[tokio::test]
    async fn pause_cuts_a_pending_delay_short() {
        let control = Arc::new(ready());
        control.start().unwrap();
        let sleeper = Arc::clone(&control);
        let pending =
            tokio::spawn(async move { sleeper.delay(Duration::from_secs(3600)).await });
        tokio::task::yield_now().await;
        control.pause().unwrap();
        assert!(!pending.await.unwrap());
    }

    #[tokio::test]
    async fn delay_completes_while_running() {
        let control = ready();
        control.start().unwrap();
        assert!(control.delay(Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn wait_while_paused_returns_on_resume() {
        let control = Arc::new(ready());
        control.start().unwrap();
        control.pause().unwrap();
        let waiter = Arc::clone(&control);
        let pending = tokio::spawn(async move { waiter.wait_while_paused().await });
        tokio::task::yield_now().await;
        control.resume().unwrap();
        assert!(pending.await.unwrap());
    }
}
