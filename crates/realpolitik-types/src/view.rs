//! The per-civilization state view handed to a decision provider.
//!
//! A view only contains what the civ can legitimately know: its own state,
//! tiles it has revealed, civs it has met, and events it took part in.

use serde::{Deserialize, Serialize};

use crate::decision::StrategicPlan;
use crate::enums::{DiplomaticStatus, Improvement, Terrain, TileResource, UnitKind};
use crate::events::GameEvent;
use crate::ids::{CivId, SettlementId};
use crate::memory::MemoryEntry;
use crate::structs::{
    Agreement, DisinformationCampaign, IntelFact, Message, Position, Resources, Settlement, Unit,
};

/// Everything a civ sees when deciding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    /// Current turn.
    pub turn: u64,
    /// The civ's own state.
    pub civilization: OwnCivView,
    /// Revealed tiles.
    pub visible_tiles: Vec<VisibleTile>,
    /// Civs met so far.
    pub known_civilizations: Vec<KnownCivSummary>,
    /// Recent events the civ was party to (or public ones).
    pub recent_events: Vec<GameEvent>,
    /// Messages delivered to the civ recently.
    pub received_communications: Vec<Message>,
    /// Relevant memories, sorted by recency.
    pub memories: Vec<MemoryEntry>,
    /// Opportunities worth considering.
    pub opportunities: Vec<String>,
    /// Threats worth considering.
    pub threats: Vec<String>,
    /// Technologies whose prerequisites are met.
    pub available_technologies: Vec<String>,
}

/// A civ's view of itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnCivView {
    /// Identifier.
    pub id: CivId,
    /// Name.
    pub name: String,
    /// Resource ledger.
    pub resources: Resources,
    /// Known technologies.
    pub technologies: Vec<String>,
    /// Current research.
    pub current_research: Option<String>,
    /// Progress toward current research.
    pub research_progress: u32,
    /// Owned settlements.
    pub settlements: Vec<Settlement>,
    /// Owned units.
    pub units: Vec<Unit>,
    /// Personality traits.
    pub personality: Vec<String>,
    /// Public agreements.
    pub public_agreements: Vec<Agreement>,
    /// Secret agreements.
    pub secret_agreements: Vec<Agreement>,
    /// Running disinformation campaigns.
    pub active_disinformation: Vec<DisinformationCampaign>,
    /// Current strategic plan.
    pub strategic_plan: Option<StrategicPlan>,
}

/// A revealed tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleTile {
    /// Where.
    pub position: Position,
    /// Terrain.
    pub terrain: Terrain,
    /// Deposit.
    pub resource: Option<TileResource>,
    /// Improvement.
    pub improvement: Option<Improvement>,
    /// Settlement on the tile.
    pub settlement: Option<SettlementId>,
    /// Owner of that settlement.
    pub settlement_owner: Option<CivId>,
    /// Non-covert units on the tile.
    pub units: Vec<VisibleUnit>,
}

/// A unit as seen on a revealed tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleUnit {
    /// Owner.
    pub owner: CivId,
    /// Kind.
    pub kind: UnitKind,
    /// Strength.
    pub strength: f64,
}

/// What a civ knows about another civ it has met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownCivSummary {
    /// Identifier.
    pub id: CivId,
    /// Name.
    pub name: String,
    /// Derived status.
    pub status: DiplomaticStatus,
    /// Reputation this civ assigns them.
    pub reputation: f64,
    /// Their settlements on revealed tiles.
    pub visible_settlements: u32,
    /// Their military units on revealed tiles.
    pub visible_military_units: u32,
    /// Intelligence held about them, including planted records.
    pub intel: Vec<IntelView>,
}

/// An intel record with its provenance hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelView {
    /// Turn obtained.
    pub turn: u64,
    /// The fact.
    pub fact: IntelFact,
    /// Accuracy estimate.
    pub accuracy: f64,
}
