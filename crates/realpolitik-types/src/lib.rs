//! Shared type definitions for the Realpolitik simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace: the world, civilizations, the event log, decisions, and
//! the views handed to decision providers.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (terrain, units, missions, statuses)
//! - [`structs`] -- Core entity structs (resources, settlements, units, civs)
//! - [`events`] -- Typed game event log entries
//! - [`decision`] -- Decisions and typed commands from providers
//! - [`memory`] -- Memory entries and payloads
//! - [`view`] -- Per-civilization state view

pub mod decision;
pub mod enums;
pub mod events;
pub mod ids;
pub mod memory;
pub mod structs;
pub mod view;

// Re-export all public types at crate root for convenience.
pub use decision::{
    Command, Communication, Decision, DisinformationPlan, ReputationStrategy, StrategicPlan,
};
pub use enums::{
    AgreementKind, BuildingKind, DiplomaticStatus, EspionageOutcome, GameStatus, ImportanceBucket,
    Improvement, MemoryType, MissionKind, MissionStatus, NotificationKind, ObservationMode,
    ParseKindError, RandomEventKind, ResourceDistribution, ResourceKind, SabotageKind, Terrain,
    TileResource, UnitKind, normalize_label,
};
pub use events::{GameEvent, GameEventKind};
pub use ids::{AgreementId, CampaignId, CivId, EventId, MemoryId, MessageId, SettlementId, UnitId};
pub use memory::{MemoryEntry, MemoryPayload};
pub use structs::{
    ACTION_HISTORY_CAPACITY, ActionRecord, Agreement, Civilization, DisinformationCampaign,
    IntelFact, IntelRecord, Message, Mission, NEUTRAL_REPUTATION, Position, Resources, Settlement,
    Tile, Unit,
};
pub use view::{IntelView, KnownCivSummary, OwnCivView, StateView, VisibleTile, VisibleUnit};
