//! Core entity structs: map positions, resource ledgers, settlements,
//! units, agreements, intelligence, and civilizations.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::decision::{ReputationStrategy, StrategicPlan};
use crate::enums::{
    AgreementKind, BuildingKind, Improvement, MissionKind, MissionStatus, ResourceKind, Terrain,
    TileResource, UnitKind,
};
use crate::ids::{AgreementId, CampaignId, CivId, MessageId, SettlementId, UnitId};

/// Capacity of the per-civilization action history ring.
pub const ACTION_HISTORY_CAPACITY: usize = 50;

/// Neutral reputation; also the default for civs never rated.
pub const NEUTRAL_REPUTATION: f64 = 50.0;

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// A tile coordinate. `(0, 0)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance (diagonal steps cost one).
    pub const fn distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One cell of the world map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Where the tile is.
    pub position: Position,
    /// Base terrain.
    pub terrain: Terrain,
    /// Yields produced when worked.
    pub yields: Resources,
    /// Optional special deposit.
    pub resource: Option<TileResource>,
    /// Optional improvement.
    pub improvement: Option<Improvement>,
    /// Settlement occupying the tile.
    pub settlement: Option<SettlementId>,
    /// Number of units on the tile.
    pub unit_count: u32,
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A ledger of named non-negative quantities.
///
/// Arithmetic saturates: [`Resources::deduct`] clamps each component at
/// zero rather than failing, and [`Resources::add`] saturates at `u32::MAX`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resources {
    amounts: BTreeMap<ResourceKind, u32>,
}

impl Resources {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from `(kind, amount)` pairs.
    pub fn from_pairs(pairs: &[(ResourceKind, u32)]) -> Self {
        let mut out = Self::new();
        for &(kind, amount) in pairs {
            out.credit(kind, amount);
        }
        out
    }

    /// Amount of one kind (zero if absent).
    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.amounts.get(&kind).copied().unwrap_or(0)
    }

    /// Overwrite one kind.
    pub fn set(&mut self, kind: ResourceKind, amount: u32) {
        self.amounts.insert(kind, amount);
    }

    /// Add to one kind.
    pub fn credit(&mut self, kind: ResourceKind, amount: u32) {
        let entry = self.amounts.entry(kind).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Subtract from one kind, clamping at zero. Returns what was removed.
    pub fn debit(&mut self, kind: ResourceKind, amount: u32) -> u32 {
        let entry = self.amounts.entry(kind).or_insert(0);
        let removed = (*entry).min(amount);
        *entry = entry.saturating_sub(amount);
        removed
    }

    /// Add every component of `other`.
    pub fn add(&mut self, other: &Self) {
        for (&kind, &amount) in &other.amounts {
            self.credit(kind, amount);
        }
    }

    /// Subtract every component of `cost`, clamping each at zero.
    pub fn deduct(&mut self, cost: &Self) {
        for (&kind, &amount) in &cost.amounts {
            self.debit(kind, amount);
        }
    }

    /// Whether every component of `cost` is covered.
    pub fn can_afford(&self, cost: &Self) -> bool {
        cost.amounts
            .iter()
            .all(|(&kind, &amount)| self.get(kind) >= amount)
    }

    /// Sum of all components.
    pub fn total(&self) -> u64 {
        self.amounts.values().map(|&v| u64::from(v)).sum()
    }

    /// Iterate `(kind, amount)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.amounts.iter().map(|(&k, &v)| (k, v))
    }
}

impl core::fmt::Display for Resources {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (kind, amount) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{amount} {kind}")?;
            first = false;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Settlements and units
// ---------------------------------------------------------------------------

/// A settlement owned by a civilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Identifier.
    pub id: SettlementId,
    /// Owning civilization.
    pub owner: CivId,
    /// Display name.
    pub name: String,
    /// Tile the settlement occupies.
    pub position: Position,
    /// Population, never below 1.
    pub population: u32,
    /// Buildings present.
    pub buildings: BTreeSet<BuildingKind>,
    /// Whether this is the civilization's capital.
    pub capital: bool,
    /// Turn the settlement was founded.
    pub founded_turn: u64,
}

impl Settlement {
    /// Remove population, never dropping below 1.
    pub fn reduce_population(&mut self, amount: u32) {
        self.population = self.population.saturating_sub(amount).max(1);
    }
}

/// A covert mission assigned to a spy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    /// What the spy is trying to do.
    pub kind: MissionKind,
    /// Civilization being targeted.
    pub target: CivId,
    /// Third civilization named by a disinformation mission.
    pub subject: Option<CivId>,
    /// Turns required before resolution.
    pub duration: u32,
    /// Turns completed so far.
    pub progress: u32,
    /// Base risk before experience reduction.
    pub risk: f64,
    /// Lifecycle status.
    pub status: MissionStatus,
    /// Turn the mission was assigned.
    pub assigned_turn: u64,
}

impl Mission {
    /// Whether the mission has yet to resolve.
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, MissionStatus::Pending)
    }
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Identifier.
    pub id: UnitId,
    /// Owning civilization.
    pub owner: CivId,
    /// Kind.
    pub kind: UnitKind,
    /// Current tile.
    pub position: Position,
    /// Combat strength; doubles as health.
    pub strength: f64,
    /// Tiles per turn.
    pub movement: u32,
    /// Reveal radius.
    pub vision: u32,
    /// Engagement range.
    pub attack_range: u32,
    /// Moves left this turn.
    pub moves_remaining: u32,
    /// Missions or battles survived.
    pub experience: u32,
    /// Covert units never fight and are invisible to others.
    pub covert: bool,
    /// Assigned mission for covert units.
    pub mission: Option<Mission>,
    /// Cover identity.
    pub disguise: Option<String>,
}

impl Unit {
    /// Whether the unit is an idle covert operative. A spy whose last
    /// mission has resolved is idle again.
    pub const fn is_idle_spy(&self) -> bool {
        match &self.mission {
            Some(mission) => self.covert && !mission.is_pending(),
            None => self.covert,
        }
    }
}

// ---------------------------------------------------------------------------
// Diplomacy and intelligence
// ---------------------------------------------------------------------------

/// One party's copy of an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    /// Shared id; both parties key their copy by it.
    pub id: AgreementId,
    /// The other party.
    pub partner: CivId,
    /// Kind.
    pub kind: AgreementKind,
    /// Opaque terms text.
    pub terms: String,
    /// Turn signed.
    pub created_turn: u64,
    /// Whether this copy has been broken.
    pub broken: bool,
    /// Secret agreements live in a separate table and are never public.
    pub secret: bool,
}

/// A fact learned about another civilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fact", rename_all = "snake_case")]
pub enum IntelFact {
    /// Estimated military strength.
    MilitaryStrength {
        /// Summed strength of military units.
        strength: f64,
    },
    /// Known technologies.
    Technologies {
        /// Technology names.
        technologies: Vec<String>,
    },
    /// Treasury size.
    Treasury {
        /// Gold on hand.
        gold: u32,
    },
    /// Number of settlements.
    SettlementCount {
        /// Count.
        count: u32,
    },
    /// Free-form claim (used by disinformation).
    Claim {
        /// Claim text.
        text: String,
    },
}

/// A dated intelligence record with an accuracy estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelRecord {
    /// Turn the intel was obtained.
    pub turn: u64,
    /// The fact itself.
    pub fact: IntelFact,
    /// Confidence in `[0, 1]`; decays over time.
    pub accuracy: f64,
    /// Campaign that planted this record, if it is disinformation.
    pub planted_by: Option<CampaignId>,
}

/// An active disinformation campaign run by a civilization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisinformationCampaign {
    /// Identifier.
    pub id: CampaignId,
    /// Civilization being deceived.
    pub target: CivId,
    /// Civilization the false claim is about.
    pub subject: CivId,
    /// The false claim.
    pub claim: String,
    /// Turn launched.
    pub launched_turn: u64,
    /// Turns until expiry.
    pub turns_remaining: u32,
}

/// One entry in a civilization's action history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Turn the action was applied.
    pub turn: u64,
    /// Short description.
    pub description: String,
}

// ---------------------------------------------------------------------------
// Civilization
// ---------------------------------------------------------------------------

/// A participating civilization.
///
/// Settlements and units are owned by the game state and reference their
/// owner; this struct keeps only per-civ bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Civilization {
    /// Identifier.
    pub id: CivId,
    /// Display name.
    pub name: String,
    /// Creation order; lower goes first and wins ties.
    pub order: u32,
    /// Resource ledger.
    pub resources: Resources,
    /// Known technologies.
    pub technologies: BTreeSet<String>,
    /// Technology being researched.
    pub current_research: Option<String>,
    /// Science accumulated toward `current_research`.
    pub research_progress: u32,
    /// Reputation of other civs, 0-100.
    pub reputation: BTreeMap<CivId, f64>,
    /// Public agreements keyed by shared id.
    pub public_agreements: BTreeMap<AgreementId, Agreement>,
    /// Secret agreements keyed by shared id.
    pub secret_agreements: BTreeMap<AgreementId, Agreement>,
    /// Most recent actions, oldest first.
    pub action_history: VecDeque<ActionRecord>,
    /// Personality trait words.
    pub personality: Vec<String>,
    /// Active disinformation campaigns this civ is running.
    pub disinformation: Vec<DisinformationCampaign>,
    /// Intelligence records per observed civ.
    pub intel: BTreeMap<CivId, Vec<IntelRecord>>,
    /// Latest strategic plan.
    pub strategic_plan: Option<StrategicPlan>,
    /// Latest reputation strategy.
    pub reputation_strategy: Option<ReputationStrategy>,
}

impl Civilization {
    /// A fresh civilization with empty ledgers.
    pub fn new(name: impl Into<String>, order: u32, personality: Vec<String>) -> Self {
        Self {
            id: CivId::new(),
            name: name.into(),
            order,
            resources: Resources::new(),
            technologies: BTreeSet::new(),
            current_research: None,
            research_progress: 0,
            reputation: BTreeMap::new(),
            public_agreements: BTreeMap::new(),
            secret_agreements: BTreeMap::new(),
            action_history: VecDeque::with_capacity(ACTION_HISTORY_CAPACITY),
            personality,
            disinformation: Vec::new(),
            intel: BTreeMap::new(),
            strategic_plan: None,
            reputation_strategy: None,
        }
    }

    /// Reputation this civ assigns `other` (default neutral).
    pub fn reputation_of(&self, other: CivId) -> f64 {
        self.reputation
            .get(&other)
            .copied()
            .unwrap_or(NEUTRAL_REPUTATION)
    }

    /// Shift reputation of `other` by `delta`, clamped to `[0, 100]`.
    pub fn adjust_reputation(&mut self, other: CivId, delta: f64) {
        let next = (self.reputation_of(other) + delta).clamp(0.0, 100.0);
        self.reputation.insert(other, next);
    }

    /// Push onto the action ring, evicting the oldest entry when full.
    pub fn record_action(&mut self, turn: u64, description: impl Into<String>) {
        if self.action_history.len() >= ACTION_HISTORY_CAPACITY {
            self.action_history.pop_front();
        }
        self.action_history.push_back(ActionRecord {
            turn,
            description: description.into(),
        });
    }

    /// Whether the civ knows a technology.
    pub fn has_tech(&self, name: &str) -> bool {
        self.technologies.contains(name)
    }

    /// Look up an agreement in either table.
    pub fn agreement(&self, id: AgreementId) -> Option<&Agreement> {
        self.public_agreements
            .get(&id)
            .or_else(|| self.secret_agreements.get(&id))
    }
}

/// A message between civilizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier.
    pub id: MessageId,
    /// Turn sent.
    pub turn: u64,
    /// Sender.
    pub from: CivId,
    /// Recipient, or `None` for a broadcast to every met civ.
    pub to: Option<CivId>,
    /// Text.
    pub content: String,
}

impl Message {
    /// Whether `civ` can read this message (recipient or broadcast, not sender).
    pub fn delivered_to(&self, civ: CivId) -> bool {
        self.from != civ && self.to.is_none_or(|to| to == civ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduct_clamps_each_component() {
        let mut wallet = Resources::from_pairs(&[(ResourceKind::Gold, 5), (ResourceKind::Food, 10)]);
        let cost = Resources::from_pairs(&[(ResourceKind::Gold, 8), (ResourceKind::Food, 3)]);
        wallet.deduct(&cost);
        assert_eq!(wallet.get(ResourceKind::Gold), 0);
        assert_eq!(wallet.get(ResourceKind::Food), 7);
        assert_eq!(wallet.get(ResourceKind::Science), 0);
    }

    #[test]
    fn can_afford_checks_every_component() {
        let wallet = Resources::from_pairs(&[(ResourceKind::Production, 10)]);
        assert!(wallet.can_afford(&Resources::from_pairs(&[(ResourceKind::Production, 10)])));
        assert!(!wallet.can_afford(&Resources::from_pairs(&[
            (ResourceKind::Production, 5),
            (ResourceKind::Gold, 1),
        ])));
    }

    #[test]
    fn chebyshev_distance() {
        assert_eq!(Position::new(1, 1).distance(Position::new(3, 2)), 2);
        assert_eq!(Position::new(4, 4).distance(Position::new(4, 4)), 0);
    }

    #[test]
    fn population_floor_is_one() {
        let mut s = Settlement {
            id: SettlementId::new(),
            owner: CivId::new(),
            name: "Test".into(),
            position: Position::new(0, 0),
            population: 2,
            buildings: BTreeSet::new(),
            capital: false,
            founded_turn: 0,
        };
        s.reduce_population(5);
        assert_eq!(s.population, 1);
    }

    #[test]
    fn reputation_clamps_and_defaults() {
        let mut civ = Civilization::new("A", 0, Vec::new());
        let other = CivId::new();
        assert!((civ.reputation_of(other) - 50.0).abs() < f64::EPSILON);
        civ.adjust_reputation(other, -80.0);
        assert!(civ.reputation_of(other).abs() < f64::EPSILON);
        civ.adjust_reputation(other, 500.0);
        assert!((civ.reputation_of(other) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn action_ring_is_bounded() {
        let mut civ = Civilization::new("A", 0, Vec::new());
        for turn in 0..60 {
            civ.record_action(turn, format!("action {turn}"));
        }
        assert_eq!(civ.action_history.len(), ACTION_HISTORY_CAPACITY);
        assert_eq!(civ.action_history.front().map(|r| r.turn), Some(10));
    }

    #[test]
    fn broadcast_reaches_everyone_but_sender() {
        let a = CivId::new();
        let b = CivId::new();
        let msg = Message {
            id: MessageId::new(),
            turn: 1,
            from: a,
            to: None,
            content: "hello".into(),
        };
        assert!(msg.delivered_to(b));
        assert!(!msg.delivered_to(a));
    }
}
