//! Read-only projections for the presentation layer.
//!
//! Snapshots are owned, serializable copies of the game state. What they
//! carry depends on the [`ObservationMode`]: private thoughts and
//! Machiavellian scores only appear in omniscient mode, as do secret
//! agreements, spies, and covert events. The diplomatic mode keeps public
//! agreements; the public mode drops them.

use std::collections::BTreeMap;

use realpolitik_agents::{BehaviorObserver, ScoreBreakdown, TechTree};
use realpolitik_types::{
    ActionRecord, Agreement, CivId, GameEvent, GameStatus, ObservationMode, Resources, Settlement,
    Tile, Unit,
};
use serde::Serialize;

use crate::analytics::{self, Relationship, Standing};
use crate::state::{GameState, Thought};

/// Most recent events carried by a full snapshot.
pub const SNAPSHOT_EVENT_LIMIT: usize = 200;

/// Public and gated details of one civ.
#[derive(Debug, Clone, Serialize)]
pub struct CivSnapshot {
    /// Identifier.
    pub id: CivId,
    /// Display name.
    pub name: String,
    /// Creation order.
    pub order: u32,
    /// Resource ledger.
    pub resources: Resources,
    /// Known technologies.
    pub technologies: Vec<String>,
    /// Technology being researched.
    pub current_research: Option<String>,
    /// Settlements.
    pub settlements: Vec<Settlement>,
    /// Units; spies only in omniscient mode.
    pub units: Vec<Unit>,
    /// Ratings of other civs.
    pub reputation: BTreeMap<CivId, f64>,
    /// Public agreements; empty in public mode.
    pub public_agreements: Vec<Agreement>,
    /// Secret agreements; omniscient mode only.
    pub secret_agreements: Vec<Agreement>,
    /// Personality traits.
    pub personality: Vec<String>,
    /// Recent actions.
    pub action_history: Vec<ActionRecord>,
    /// Composite score.
    pub score: u64,
    /// Machiavellian score; omniscient mode only.
    pub machiavellian: Option<ScoreBreakdown>,
    /// Private thoughts; omniscient mode only.
    pub thoughts: Vec<Thought>,
}

/// The whole game as the observer may see it.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    /// Last completed turn.
    pub turn: u64,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Mode the snapshot was redacted for.
    pub observation_mode: ObservationMode,
    /// Map width.
    pub map_width: u32,
    /// Map height.
    pub map_height: u32,
    /// Every tile.
    pub tiles: Vec<Tile>,
    /// Every civ.
    pub civs: Vec<CivSnapshot>,
    /// Most recent events, newest last.
    pub events: Vec<GameEvent>,
    /// Pairwise relationships.
    pub relationships: Vec<Relationship>,
    /// Current standings.
    pub standings: Vec<Standing>,
}

/// Tiles one civ has revealed.
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    /// Viewer.
    pub civ: CivId,
    /// Map width.
    pub width: u32,
    /// Map height.
    pub height: u32,
    /// Revealed tiles.
    pub tiles: Vec<Tile>,
}

impl CivSnapshot {
    /// Copy with everything `mode` may not see removed.
    #[must_use]
    pub fn redacted(&self, mode: ObservationMode) -> Self {
        let mut out = self.clone();
        if !mode.exposes_secrets() {
            out.units.retain(|u| !u.covert);
            out.secret_agreements.clear();
        }
        if !mode.exposes_thoughts() {
            out.thoughts.clear();
            out.machiavellian = None;
        }
        if !shows_public_agreements(mode) {
            out.public_agreements.clear();
        }
        out
    }
}

impl GameSnapshot {
    /// Copy with everything `mode` may not see removed.
    ///
    /// Redacting an omniscient snapshot yields the same data as building
    /// one for `mode` directly, apart from the event window.
    #[must_use]
    pub fn redacted(&self, mode: ObservationMode) -> Self {
        Self {
            turn: self.turn,
            status: self.status,
            observation_mode: mode,
            map_width: self.map_width,
            map_height: self.map_height,
            tiles: self.tiles.clone(),
            civs: self.civs.iter().map(|c| c.redacted(mode)).collect(),
            events: self
                .events
                .iter()
                .filter(|e| mode.exposes_secrets() || !e.kind.is_covert())
                .cloned()
                .collect(),
            relationships: self.relationships.clone(),
            standings: self.standings.clone(),
        }
    }
}

/// Sources a snapshot reads from.
#[derive(Clone, Copy)]
pub struct SnapshotSource<'a> {
    /// Game state.
    pub state: &'a GameState,
    /// Behavior observer.
    pub observer: &'a BehaviorObserver,
    /// Technology tree.
    pub tree: &'a TechTree,
    /// Lifecycle status.
    pub status: GameStatus,
}

fn shows_public_agreements(mode: ObservationMode) -> bool {
    !matches!(mode, ObservationMode::Public)
}

/// One civ, redacted for `mode`.
pub fn civ_snapshot(src: SnapshotSource<'_>, civ: CivId, mode: ObservationMode) -> Option<CivSnapshot> {
    let c = src.state.civ(civ)?;
    let machiavellian = if mode.exposes_thoughts() {
        analytics::machiavellian_scores(src.state, src.observer, src.tree).remove(&civ)
    } else {
        None
    };
    Some(CivSnapshot {
        id: c.id,
        name: c.name.clone(),
        order: c.order,
        resources: c.resources.clone(),
        technologies: c.technologies.iter().cloned().collect(),
        current_research: c.current_research.clone(),
        settlements: src.state.settlements_of(civ).into_iter().cloned().collect(),
        units: src
            .state
            .units_of(civ)
            .into_iter()
            .filter(|u| !u.covert || mode.exposes_secrets())
            .cloned()
            .collect(),
        reputation: c.reputation.clone(),
        public_agreements: if shows_public_agreements(mode) {
            c.public_agreements.values().cloned().collect()
        } else {
            Vec::new()
        },
        secret_agreements: if mode.exposes_secrets() {
            c.secret_agreements.values().cloned().collect()
        } else {
            Vec::new()
        },
        personality: c.personality.clone(),
        action_history: c.action_history.iter().cloned().collect(),
        score: analytics::composite_score(src.state, civ),
        machiavellian,
        thoughts: if mode.exposes_thoughts() {
            src.state.thoughts.get(&civ).cloned().unwrap_or_default()
        } else {
            Vec::new()
        },
    })
}

/// The full game, redacted for `mode`.
pub fn game_snapshot(src: SnapshotSource<'_>, mode: ObservationMode) -> GameSnapshot {
    let state = src.state;
    let shown = |e: &&GameEvent| mode.exposes_secrets() || !e.kind.is_covert();
    let total = state.events.iter().filter(shown).count();
    let events: Vec<GameEvent> = state
        .events
        .iter()
        .filter(shown)
        .skip(total.saturating_sub(SNAPSHOT_EVENT_LIMIT))
        .cloned()
        .collect();
    GameSnapshot {
        turn: state.turn,
        status: src.status,
        observation_mode: mode,
        map_width: state.map.width(),
        map_height: state.map.height(),
        tiles: state.map.tiles().cloned().collect(),
        civs: state
            .civs
            .iter()
            .filter_map(|c| civ_snapshot(src, c.id, mode))
            .collect(),
        events,
        relationships: analytics::relationship_matrix(state),
        standings: analytics::standings(state),
    }
}

/// Tiles `civ` has revealed.
pub fn visible_map(state: &GameState, civ: CivId) -> Option<MapView> {
    state.civ(civ)?;
    Some(MapView {
        civ,
        width: state.map.width(),
        height: state.map.height(),
        tiles: state
            .fog
            .visible_positions(civ)
            .into_iter()
            .filter_map(|p| state.map.tile(p).cloned())
            .collect(),
    })
}
