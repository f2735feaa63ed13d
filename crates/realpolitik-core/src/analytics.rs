//! Scores, rankings, and the analytics export.
//!
//! Nothing here mutates gameplay state. Resource snapshots are taken every
//! [`SNAPSHOT_INTERVAL`] turns and kept for the export.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use realpolitik_agents::behavior::TurnCounts;
use realpolitik_agents::{BehaviorObserver, BehaviorRecord, ScoreBreakdown, TechTree, machiavelli};
use realpolitik_types::{CivId, DiplomaticStatus, Resources};
use serde::{Deserialize, Serialize};

use crate::state::GameState;

/// Turns between resource distribution snapshots.
pub const SNAPSHOT_INTERVAL: u64 = 10;

/// Every civ's ledger at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Turn the snapshot was taken after.
    pub turn: u64,
    /// Wall-clock time of the snapshot.
    pub taken_at: DateTime<Utc>,
    /// Ledger per civ.
    pub resources: BTreeMap<CivId, Resources>,
}

/// One unordered pair in the relationship matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Earlier civ in creation order.
    pub a: CivId,
    /// Later civ in creation order.
    pub b: CivId,
    /// Derived status.
    pub status: DiplomaticStatus,
    /// How `a` rates `b`.
    pub a_rates_b: f64,
    /// How `b` rates `a`.
    pub b_rates_a: f64,
}

/// A civ's place in the final standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Civ.
    pub civ: CivId,
    /// Display name.
    pub name: String,
    /// Creation order, the tie-breaker.
    pub order: u32,
    /// Composite score.
    pub score: u64,
}

/// Everything the presentation layer exports for offline analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsExport {
    /// When the export was produced.
    pub generated_at: DateTime<Utc>,
    /// Last completed turn.
    pub turn: u64,
    /// Behavior records per civ.
    pub behavior: BTreeMap<CivId, BehaviorRecord>,
    /// Pairwise relationships.
    pub relationships: Vec<Relationship>,
    /// Deception, betrayal, and power-seeking counts per turn.
    pub time_series: BTreeMap<u64, TurnCounts>,
    /// Periodic resource snapshots.
    pub resource_snapshots: Vec<ResourceSnapshot>,
    /// Current standings.
    pub standings: Vec<Standing>,
}

/// Accumulates periodic snapshots.
#[derive(Debug, Clone, Default)]
pub struct Analytics {
    snapshots: Vec<ResourceSnapshot>,
}

impl Analytics {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a snapshot if `state.turn` is a snapshot turn.
    pub fn maybe_snapshot(&mut self, state: &GameState) -> bool {
        if state.turn == 0 || state.turn.checked_rem(SNAPSHOT_INTERVAL) != Some(0) {
            return false;
        }
        self.snapshots.push(ResourceSnapshot {
            turn: state.turn,
            taken_at: Utc::now(),
            resources: state
                .civs
                .iter()
                .map(|c| (c.id, c.resources.clone()))
                .collect(),
        });
        true
    }

    /// Snapshots taken so far.
    pub fn snapshots(&self) -> &[ResourceSnapshot] {
        &self.snapshots
    }
}

/// `5*settlements + 2*population + 3*technologies + military units +
/// resources/10`.
pub fn composite_score(state: &GameState, civ: CivId) -> u64 {
    let settlements = u64::try_from(state.settlements_of(civ).len()).unwrap_or(u64::MAX);
    let population = u64::from(state.population(civ));
    let military = u64::try_from(
        state
            .units_of(civ)
            .iter()
            .filter(|u| u.kind.is_military())
            .count(),
    )
    .unwrap_or(u64::MAX);
    let (techs, resources) = state.civ(civ).map_or((0, 0), |c| {
        (
            u64::try_from(c.technologies.len()).unwrap_or(u64::MAX),
            c.resources.total(),
        )
    });
    settlements
        .saturating_mul(5)
        .saturating_add(population.saturating_mul(2))
        .saturating_add(techs.saturating_mul(3))
        .saturating_add(military)
        .saturating_add(resources / 10)
}

/// Every civ ranked by composite score, ties broken by creation order.
pub fn standings(state: &GameState) -> Vec<Standing> {
    let mut out: Vec<Standing> = state
        .civs
        .iter()
        .map(|c| Standing {
            civ: c.id,
            name: c.name.clone(),
            order: c.order,
            score: composite_score(state, c.id),
        })
        .collect();
    out.sort_by(|x, y| y.score.cmp(&x.score).then(x.order.cmp(&y.order)));
    out
}

/// Highest-ranked civ.
pub fn winner(state: &GameState) -> Option<CivId> {
    standings(state).first().map(|s| s.civ)
}

/// Status and mutual ratings for every pair.
pub fn relationship_matrix(state: &GameState) -> Vec<Relationship> {
    let mut out = Vec::new();
    for (i, a) in state.civs.iter().enumerate() {
        for b in state.civs.iter().skip(i.saturating_add(1)) {
            out.push(Relationship {
                a: a.id,
                b: b.id,
                status: state.status(a.id, b.id),
                a_rates_b: a.reputation_of(b.id),
                b_rates_a: b.reputation_of(a.id),
            });
        }
    }
    out
}

/// Machiavellian score for every civ.
pub fn machiavellian_scores(
    state: &GameState,
    observer: &BehaviorObserver,
    tree: &TechTree,
) -> BTreeMap<CivId, ScoreBreakdown> {
    let metrics = state.all_metrics(tree);
    state
        .civs
        .iter()
        .map(|c| {
            (
                c.id,
                machiavelli::score(
                    c.id,
                    observer.records(),
                    &metrics,
                    &c.personality,
                    &observer.config().weights,
                ),
            )
        })
        .collect()
}

/// Assemble the export.
pub fn export(state: &GameState, observer: &BehaviorObserver, analytics: &Analytics) -> AnalyticsExport {
    AnalyticsExport {
        generated_at: Utc::now(),
        turn: state.turn,
        behavior: observer.records().clone(),
        relationships: relationship_matrix(state),
        time_series: observer.series().clone(),
        resource_snapshots: analytics.snapshots().to_vec(),
        standings: standings(state),
    }
}
