//! The turn cycle.
//!
//! Each turn runs through these phases:
//!
//! 1. **Open** -- advance the turn counter, roll random events.
//! 2. **Economy** -- per civ in creation order: reset unit moves, generate
//!    resources, advance research.
//! 3. **Decision** -- build each civ's [`StateView`] and ask the
//!    [`DecisionProvider`], every call under a deadline.
//! 4. **Application** -- apply decisions strictly in creation order, then
//!    detect first contact.
//! 5. **Maintenance** -- battles, growth, espionage, expiry, decay, sweeps,
//!    memories (see [`maintenance`]).
//! 6. **Observation** -- feed the behavior observer and take analytics
//!    snapshots.
//!
//! In [`DecisionScheduling::Concurrent`] mode phase 2 runs for every civ,
//! then all views are built and all decisions fetched at once. In
//! [`DecisionScheduling::Sequential`] mode phases 2 through 4 run one civ
//! at a time, so each civ sees what the previous one did.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use realpolitik_agents::{BehaviorObserver, IntentParser, TechTree};
use realpolitik_types::{CivId, Decision, GameEvent, StateView};
use tracing::{debug, info, warn};

use crate::actions::{self, DecisionReport};
use crate::analytics::Analytics;
use crate::config::{DecisionScheduling, GameConfig};
use crate::decision::{DecisionError, DecisionProvider};
use crate::economy;
use crate::maintenance::{self, MaintenanceReport};
use crate::state::GameState;
use crate::view;

/// Errors that stop a turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// The decision provider failed; the game stops.
    #[error("decision provider failed for {civ}: {source}")]
    Provider {
        /// Civ whose decision was requested.
        civ: CivId,
        /// The underlying provider error.
        source: DecisionError,
    },
}

/// Everything a turn reads but does not own.
#[derive(Clone, Copy)]
pub struct TurnContext<'a> {
    /// Game configuration.
    pub config: &'a GameConfig,
    /// Technology tree.
    pub tree: &'a TechTree,
    /// Free-text action adapter.
    pub parser: &'a IntentParser,
    /// Decision source.
    pub provider: &'a Arc<dyn DecisionProvider>,
}

/// Summary of one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnSummary {
    /// Turn that ran.
    pub turn: u64,
    /// Random events that fired.
    pub random_events: u32,
    /// Technologies completed through research.
    pub discoveries: Vec<(CivId, String)>,
    /// Decisions that arrived in time.
    pub decisions: u32,
    /// Decisions that timed out.
    pub timeouts: u32,
    /// Commands applied.
    pub actions_applied: u32,
    /// Commands or lines dropped.
    pub actions_dropped: u32,
    /// Messages delivered.
    pub messages_sent: u32,
    /// First contacts made by actions.
    pub contacts: u32,
    /// Maintenance results.
    pub maintenance: MaintenanceReport,
    /// Events logged during the turn.
    pub events: Vec<GameEvent>,
}

impl TurnSummary {
    fn absorb(&mut self, report: &DecisionReport) {
        self.actions_applied = self
            .actions_applied
            .saturating_add(u32::try_from(report.applied.len()).unwrap_or(u32::MAX));
        self.actions_dropped = self.actions_dropped.saturating_add(report.dropped);
        self.messages_sent = self.messages_sent.saturating_add(report.messages_sent);
    }
}

/// Run one full turn.
pub async fn run_turn(
    state: &mut GameState,
    ctx: TurnContext<'_>,
    observer: &mut BehaviorObserver,
    analytics: &mut Analytics,
    rng: &mut (dyn RngCore + Send),
) -> Result<TurnSummary, TurnError> {
    // --- Phase 1: Open ---
    state.turn = state.turn.saturating_add(1);
    state.arrivals.clear();
    let turn = state.turn;
    let first_event = state.events.len();
    let mut summary = TurnSummary {
        turn,
        ..TurnSummary::default()
    };
    debug!(turn, "Turn opened");

    if ctx.config.random_events {
        summary.random_events = maintenance::roll_random_events(state, rng);
    }

    // --- Phases 2-4 ---
    match ctx.config.decision_scheduling {
        DecisionScheduling::Concurrent => {
            for civ in state.civ_ids() {
                run_economy(state, civ, ctx.tree, &mut summary);
            }
            let views: Vec<(CivId, StateView)> = state
                .civ_ids()
                .into_iter()
                .filter_map(|civ| {
                    view::build_view(state, civ, ctx.tree, &ctx.config.memory).map(|v| (civ, v))
                })
                .collect();
            let fetches = views
                .into_iter()
                .map(|(civ, v)| fetch_decision(ctx, civ, v, turn));
            let decisions = futures::future::join_all(fetches).await;
            let mut ready = Vec::with_capacity(decisions.len());
            for (civ, decision) in decisions {
                ready.push((civ, decision?));
            }
            for (civ, decision) in ready {
                apply(state, ctx, observer, civ, decision, &mut summary);
            }
        }
        DecisionScheduling::Sequential => {
            for civ in state.civ_ids() {
                run_economy(state, civ, ctx.tree, &mut summary);
                let Some(v) = view::build_view(state, civ, ctx.tree, &ctx.config.memory) else {
                    continue;
                };
                let (_, decision) = fetch_decision(ctx, civ, v, turn).await;
                apply(state, ctx, observer, civ, decision?, &mut summary);
            }
        }
    }

    // --- Phase 5: Maintenance ---
    summary.maintenance = maintenance::run(state, ctx.tree, rng);

    // --- Phase 6: Observation ---
    let metrics = state.all_metrics(ctx.tree);
    observer.observe_events(turn, &state.events, &metrics);
    observer.observe_composition(turn, &metrics);
    analytics.maybe_snapshot(state);

    summary.events = state
        .events
        .get(first_event..)
        .map(<[GameEvent]>::to_vec)
        .unwrap_or_default();
    info!(
        turn,
        decisions = summary.decisions,
        timeouts = summary.timeouts,
        applied = summary.actions_applied,
        dropped = summary.actions_dropped,
        battles = summary.maintenance.battles,
        events = summary.events.len(),
        "Turn complete"
    );
    Ok(summary)
}

fn run_economy(state: &mut GameState, civ: CivId, tree: &TechTree, summary: &mut TurnSummary) {
    for unit in state.units.values_mut().filter(|u| u.owner == civ) {
        unit.moves_remaining = unit.movement;
    }
    economy::generate_resources(state, civ);
    if let Some(technology) = economy::advance_research(state, civ, tree) {
        summary.discoveries.push((civ, technology));
    }
}

/// Ask the provider for one decision under the configured deadline.
///
/// A timeout yields `Ok(None)`; a provider error is returned as-is.
async fn fetch_decision(
    ctx: TurnContext<'_>,
    civ: CivId,
    view: StateView,
    turn: u64,
) -> (CivId, Result<Option<Decision>, TurnError>) {
    let deadline_ms = ctx.config.decision_timeout_ms;
    let call = ctx.provider.decide(civ, view, turn);
    let outcome = match tokio::time::timeout(Duration::from_millis(deadline_ms), call).await {
        Ok(Ok(decision)) => Ok(Some(decision)),
        Ok(Err(source)) => Err(TurnError::Provider { civ, source }),
        Err(_elapsed) => {
            warn!(%civ, turn, deadline_ms, "Decision timed out, turn forfeited");
            Ok(None)
        }
    };
    (civ, outcome)
}

fn apply(
    state: &mut GameState,
    ctx: TurnContext<'_>,
    observer: &mut BehaviorObserver,
    civ: CivId,
    decision: Option<Decision>,
    summary: &mut TurnSummary,
) {
    let decision = match decision {
        Some(d) => {
            summary.decisions = summary.decisions.saturating_add(1);
            d
        }
        None => {
            summary.timeouts = summary.timeouts.saturating_add(1);
            Decision::default()
        }
    };
    let report = actions::apply_decision(state, civ, decision, ctx.tree, ctx.parser, observer);
    summary.absorb(&report);
    summary.contacts = summary
        .contacts
        .saturating_add(maintenance::detect_first_contact(state));
}
