//! Game state owned by the engine.
//!
//! [`GameState`] bundles everything a turn mutates: the map, fog of war,
//! civilizations, settlements, units, the event and communication logs,
//! and the memory bank. Settlements and units live here rather than on
//! their owners so tiles, battles, and views can look them up by id.
//!
//! Derived facts (diplomatic status, first contact) are never stored; the
//! accessors below fold the event log on every call.

use std::collections::{BTreeMap, BTreeSet};

use realpolitik_agents::diplomacy;
use realpolitik_agents::espionage::TargetProfile;
use realpolitik_agents::{CivMetrics, MemoryBank, TechTree};
use realpolitik_types::{
    CivId, Civilization, DiplomaticStatus, EventId, GameEvent, GameEventKind, Message, Position,
    Settlement, SettlementId, Terrain, Unit, UnitId, UnitKind, normalize_label,
};
use realpolitik_world::{FogOfWar, WorldMap};
use serde::{Deserialize, Serialize};

/// A private thought recorded for the omniscient observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    /// Turn the decision was made.
    pub turn: u64,
    /// Thought text.
    pub text: String,
}

/// The mutable game state passed through the turn cycle.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Current turn (0 before the first turn).
    pub turn: u64,
    /// Tile grid.
    pub map: WorldMap,
    /// Per-civ visibility.
    pub fog: FogOfWar,
    /// Civilizations in creation order.
    pub civs: Vec<Civilization>,
    /// Every settlement.
    pub settlements: BTreeMap<SettlementId, Settlement>,
    /// Every living unit.
    pub units: BTreeMap<UnitId, Unit>,
    /// Append-only event log.
    pub events: Vec<GameEvent>,
    /// Append-only communication log.
    pub messages: Vec<Message>,
    /// Per-civ memory stores.
    pub memory: MemoryBank,
    /// Private thoughts per civ.
    pub thoughts: BTreeMap<CivId, Vec<Thought>>,
    /// Resource-generation passes run per civ.
    pub resource_passes: BTreeMap<CivId, u64>,
    /// Last civ to move a unit onto each tile this turn.
    pub arrivals: BTreeMap<Position, CivId>,
}

impl GameState {
    /// State with an empty map and no civilizations.
    pub fn empty() -> Self {
        let map = WorldMap::filled(0, 0, Terrain::Grassland);
        let fog = FogOfWar::for_map(&map);
        Self {
            turn: 0,
            map,
            fog,
            civs: Vec::new(),
            settlements: BTreeMap::new(),
            units: BTreeMap::new(),
            events: Vec::new(),
            messages: Vec::new(),
            memory: MemoryBank::new(),
            thoughts: BTreeMap::new(),
            resource_passes: BTreeMap::new(),
            arrivals: BTreeMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Civilizations
    // -----------------------------------------------------------------------

    /// Civ ids in creation order.
    pub fn civ_ids(&self) -> Vec<CivId> {
        self.civs.iter().map(|c| c.id).collect()
    }

    /// Look up a civ.
    pub fn civ(&self, id: CivId) -> Option<&Civilization> {
        self.civs.iter().find(|c| c.id == id)
    }

    /// Look up a civ mutably.
    pub fn civ_mut(&mut self, id: CivId) -> Option<&mut Civilization> {
        self.civs.iter_mut().find(|c| c.id == id)
    }

    /// Display name of a civ, or its id when unknown.
    pub fn civ_name(&self, id: CivId) -> String {
        self.civ(id).map_or_else(|| id.to_string(), |c| c.name.clone())
    }

    /// Mutable references to two distinct civs.
    pub fn civ_pair_mut(
        &mut self,
        a: CivId,
        b: CivId,
    ) -> Option<(&mut Civilization, &mut Civilization)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for civ in &mut self.civs {
            if civ.id == a {
                first = Some(civ);
            } else if civ.id == b {
                second = Some(civ);
            }
        }
        first.zip(second)
    }

    /// Resolve a civ reference: an id, a name, or a name with stray casing
    /// and punctuation.
    pub fn resolve_civ(&self, raw: &str) -> Option<CivId> {
        let wanted = normalize_label(raw);
        self.civs
            .iter()
            .find(|c| c.id.to_string() == raw.trim() || normalize_label(&c.name) == wanted)
            .map(|c| c.id)
    }

    // -----------------------------------------------------------------------
    // Settlements and units
    // -----------------------------------------------------------------------

    /// A civ's settlements, capital first, then by founding turn.
    pub fn settlements_of(&self, civ: CivId) -> Vec<&Settlement> {
        let mut out: Vec<&Settlement> = self
            .settlements
            .values()
            .filter(|s| s.owner == civ)
            .collect();
        out.sort_by_key(|s| (!s.capital, s.founded_turn, s.name.clone()));
        out
    }

    /// The settlement on a tile.
    pub fn settlement_at(&self, pos: Position) -> Option<&Settlement> {
        self.map
            .tile(pos)
            .and_then(|t| t.settlement)
            .and_then(|id| self.settlements.get(&id))
    }

    /// Resolve a settlement reference for `civ`: `None` picks the capital.
    pub fn resolve_settlement(&self, civ: CivId, raw: Option<&str>) -> Option<SettlementId> {
        let owned = self.settlements_of(civ);
        match raw.map(str::trim).filter(|r| !r.is_empty()) {
            None => owned.first().map(|s| s.id),
            Some(raw) => {
                let wanted = normalize_label(raw);
                owned
                    .iter()
                    .find(|s| s.id.to_string() == raw || normalize_label(&s.name) == wanted)
                    .map(|s| s.id)
            }
        }
    }

    /// A civ's units.
    pub fn units_of(&self, civ: CivId) -> Vec<&Unit> {
        self.units.values().filter(|u| u.owner == civ).collect()
    }

    /// Units on a tile.
    pub fn units_at(&self, pos: Position) -> Vec<&Unit> {
        self.units.values().filter(|u| u.position == pos).collect()
    }

    /// Resolve a unit reference for `civ`: an id, or a kind label picking
    /// the first matching unit with moves left.
    pub fn resolve_unit(&self, civ: CivId, raw: &str) -> Option<UnitId> {
        let raw = raw.trim();
        if let Some(unit) = self
            .units
            .values()
            .find(|u| u.owner == civ && u.id.to_string() == raw)
        {
            return Some(unit.id);
        }
        let kind: UnitKind = raw.parse().ok()?;
        let mut candidates: Vec<&Unit> = self
            .units
            .values()
            .filter(|u| u.owner == civ && u.kind == kind)
            .collect();
        candidates.sort_by_key(|u| u.moves_remaining == 0);
        candidates.first().map(|u| u.id)
    }

    /// Recount `unit_count` on every tile.
    pub fn refresh_unit_counts(&mut self) {
        let mut counts: BTreeMap<Position, u32> = BTreeMap::new();
        for unit in self.units.values() {
            let slot = counts.entry(unit.position).or_insert(0);
            *slot = slot.saturating_add(1);
        }
        let positions: Vec<Position> = self.map.tiles().map(|t| t.position).collect();
        for pos in positions {
            if let Some(tile) = self.map.tile_mut(pos) {
                tile.unit_count = counts.get(&pos).copied().unwrap_or(0);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Event log
    // -----------------------------------------------------------------------

    /// Append an event stamped with the current turn.
    pub fn log(&mut self, kind: GameEventKind) -> EventId {
        let event = GameEvent::new(self.turn, kind);
        let id = event.id;
        self.events.push(event);
        id
    }

    /// Derived diplomatic status of a pair.
    pub fn status(&self, a: CivId, b: CivId) -> DiplomaticStatus {
        diplomacy::status(&self.events, a, b)
    }

    /// Whether the pair has met.
    pub fn has_met(&self, a: CivId, b: CivId) -> bool {
        diplomacy::has_met(&self.events, a, b)
    }

    /// Every civ `civ` has met.
    pub fn met_civs(&self, civ: CivId) -> BTreeSet<CivId> {
        diplomacy::met_civs(&self.events, civ)
    }

    /// Log first contact for the pair if it has not happened yet.
    ///
    /// Returns `true` when a new event was appended.
    pub fn ensure_contact(&mut self, a: CivId, b: CivId) -> bool {
        if a == b || self.has_met(a, b) {
            return false;
        }
        self.log(GameEventKind::FirstContact { a, b });
        true
    }

    /// Log a declaration of war unless the pair is already at war.
    ///
    /// First contact is logged first when missing so the status fold sees
    /// the war.
    pub fn declare_war(&mut self, aggressor: CivId, target: CivId, reason: impl Into<String>) -> bool {
        if aggressor == target {
            return false;
        }
        self.ensure_contact(aggressor, target);
        if self.status(aggressor, target) == DiplomaticStatus::War {
            return false;
        }
        self.log(GameEventKind::DeclarationOfWar {
            aggressor,
            target,
            reason: reason.into(),
        });
        true
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    /// Summed strength of a civ's military units.
    pub fn military_strength(&self, civ: CivId) -> f64 {
        self.units
            .values()
            .filter(|u| u.owner == civ && u.kind.is_military())
            .map(|u| u.strength)
            .sum()
    }

    /// Total population across a civ's settlements.
    pub fn population(&self, civ: CivId) -> u32 {
        self.settlements
            .values()
            .filter(|s| s.owner == civ)
            .map(|s| s.population)
            .fold(0, u32::saturating_add)
    }

    /// Observer metrics for a civ.
    pub fn metrics(&self, civ: CivId, tree: &TechTree) -> CivMetrics {
        let (military_buildings, total_buildings) = self
            .settlements
            .values()
            .filter(|s| s.owner == civ)
            .flat_map(|s| s.buildings.iter())
            .fold((0_u32, 0_u32), |(m, t), b| {
                (m.saturating_add(u32::from(b.is_military())), t.saturating_add(1))
            });
        let (military_techs, total_techs, gold, total_resources) =
            self.civ(civ).map_or((0, 0, 0, 0), |c| {
                (
                    u32::try_from(tree.military_count(&c.technologies)).unwrap_or(u32::MAX),
                    u32::try_from(c.technologies.len()).unwrap_or(u32::MAX),
                    c.resources.get(realpolitik_types::ResourceKind::Gold),
                    c.resources.total(),
                )
            });
        CivMetrics {
            military_strength: self.military_strength(civ),
            military_buildings,
            total_buildings,
            military_techs,
            total_techs,
            gold,
            total_resources,
        }
    }

    /// Observer metrics for every civ.
    pub fn all_metrics(&self, tree: &TechTree) -> BTreeMap<CivId, CivMetrics> {
        self.civs
            .iter()
            .map(|c| (c.id, self.metrics(c.id, tree)))
            .collect()
    }

    /// What a spy can learn about `civ`.
    pub fn target_profile(&self, civ: CivId) -> TargetProfile {
        let (technologies, gold) = self.civ(civ).map_or_else(
            || (Vec::new(), 0),
            |c| {
                (
                    c.technologies.iter().cloned().collect(),
                    c.resources.get(realpolitik_types::ResourceKind::Gold),
                )
            },
        );
        TargetProfile {
            military_strength: self.military_strength(civ),
            technologies,
            gold,
            settlements: u32::try_from(self.settlements_of(civ).len()).unwrap_or(u32::MAX),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::empty()
    }
}
