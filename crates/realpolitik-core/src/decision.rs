//! Decision provider trait and idle implementation.
//!
//! Each turn the engine hands every civilization a [`StateView`] and awaits
//! a [`Decision`]. The [`DecisionProvider`] trait abstracts where decisions
//! come from: an LLM backend, a scripted bot, or a test stub. Providers are
//! injected as `Arc<dyn DecisionProvider>`; the engine wraps every call in a
//! timeout and treats an expired call as an empty decision.

use futures::future::BoxFuture;
use realpolitik_types::{CivId, Decision, StateView};

/// Errors a decision provider can report.
///
/// Any error returned by [`DecisionProvider::decide`] stops the game.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The civilization did not respond within the deadline.
    #[error("civilization {civ} timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The civilization that timed out.
        civ: CivId,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// An internal error in the provider.
    #[error("decision provider error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// A source of civilization decisions.
pub trait DecisionProvider: Send + Sync {
    /// Decide what `civ` does this turn given its `view`.
    ///
    /// Called once per civilization per turn. The returned future owns
    /// everything it needs so several can be awaited together.
    fn decide(
        &self,
        civ: CivId,
        view: StateView,
        turn: u64,
    ) -> BoxFuture<'static, Result<Decision, DecisionError>>;
}

/// A provider that always returns an empty decision.
///
/// Every civilization forfeits its turn; economy and maintenance still run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleProvider;

impl IdleProvider {
    /// Create a new idle provider.
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionProvider for IdleProvider {
    fn decide(
        &self,
        _civ: CivId,
        _view: StateView,
        _turn: u64,
    ) -> BoxFuture<'static, Result<Decision, DecisionError>> {
        Box::pin(async { Ok(Decision::default()) })
    }
}
