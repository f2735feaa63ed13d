//! Enumeration types for the Realpolitik simulation.
//!
//! Every enum serializes as `snake_case`. Kinds that agents can name in
//! free text (units, buildings, missions, agreements, improvements) also
//! implement [`FromStr`], accepting spaces, hyphens, or underscores.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a label does not name any variant of a kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{label}`")]
pub struct ParseKindError {
    /// Which enum was being parsed (e.g. "unit").
    pub kind: &'static str,
    /// The label that failed to parse.
    pub label: String,
}

/// Normalize a free-text label: trim, lowercase, spaces and hyphens to `_`.
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Implements `label()`, `ALL`, `Display`, and `FromStr` for a fieldless enum.
macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical `snake_case` label.
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ParseKindError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_label(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == wanted)
                    .ok_or_else(|| ParseKindError {
                        kind: $kind,
                        label: s.to_owned(),
                    })
            }
        }
    };
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Terrain of a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Fertile open land.
    Grassland,
    /// Dry open land.
    Plains,
    /// Rolling hills, good for production.
    Hills,
    /// Woodland.
    Forest,
    /// Arid land with poor yields.
    Desert,
    /// Impassable peaks.
    Mountains,
    /// Impassable water.
    Water,
}

labelled_enum!(Terrain, "terrain", {
    Grassland => "grassland",
    Plains => "plains",
    Hills => "hills",
    Forest => "forest",
    Desert => "desert",
    Mountains => "mountains",
    Water => "water",
});

impl Terrain {
    /// Whether land units may enter or settle this terrain.
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Mountains | Self::Water)
    }
}

/// A named quantity in a civilization's resource ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Feeds population growth.
    Food,
    /// Spent on units, buildings, and improvements.
    Production,
    /// Treasury.
    Gold,
    /// Feeds research.
    Science,
}

labelled_enum!(ResourceKind, "resource", {
    Food => "food",
    Production => "production",
    Gold => "gold",
    Science => "science",
});

/// A special resource deposit on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileResource {
    /// Extra food.
    Wheat,
    /// Extra food.
    Cattle,
    /// Extra production.
    Iron,
    /// Extra production.
    Horses,
    /// Extra gold.
    GoldOre,
    /// Extra production.
    Stone,
}

labelled_enum!(TileResource, "tile resource", {
    Wheat => "wheat",
    Cattle => "cattle",
    Iron => "iron",
    Horses => "horses",
    GoldOre => "gold_ore",
    Stone => "stone",
});

/// A tile improvement built by a civilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Improvement {
    /// +food.
    Farm,
    /// +production.
    Mine,
    /// +gold.
    TradingPost,
}

labelled_enum!(Improvement, "improvement", {
    Farm => "farm",
    Mine => "mine",
    TradingPost => "trading_post",
});

/// Kind of unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Founds new settlements.
    Settler,
    /// Basic melee unit.
    Warrior,
    /// Ranged unit.
    Archer,
    /// Fast mounted unit.
    Horseman,
    /// Fast unit with wide vision.
    Scout,
    /// Covert operative.
    Spy,
}

labelled_enum!(UnitKind, "unit", {
    Settler => "settler",
    Warrior => "warrior",
    Archer => "archer",
    Horseman => "horseman",
    Scout => "scout",
    Spy => "spy",
});

impl UnitKind {
    /// Whether this unit counts toward military strength.
    pub const fn is_military(self) -> bool {
        matches!(self, Self::Warrior | Self::Archer | Self::Horseman)
    }
}

/// A building inside a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// +food.
    Granary,
    /// +science.
    Library,
    /// +gold.
    Market,
    /// +production.
    Workshop,
    /// Military training.
    Barracks,
    /// Settlement defense.
    Walls,
    /// Stability.
    Temple,
}

labelled_enum!(BuildingKind, "building", {
    Granary => "granary",
    Library => "library",
    Market => "market",
    Workshop => "workshop",
    Barracks => "barracks",
    Walls => "walls",
    Temple => "temple",
});

impl BuildingKind {
    /// Whether this building counts as military construction.
    pub const fn is_military(self) -> bool {
        matches!(self, Self::Barracks | Self::Walls)
    }
}

// ---------------------------------------------------------------------------
// Espionage
// ---------------------------------------------------------------------------

/// Covert mission kinds a spy can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    /// Produce one intel record about the target.
    GatherIntel,
    /// Copy a technology the target has and the actor lacks.
    StealTechnology,
    /// Damage the target's resources, research, or buildings.
    Sabotage,
    /// Plant a false belief in the target about a third civ.
    SpreadDisinformation,
}

labelled_enum!(MissionKind, "mission", {
    GatherIntel => "gather_intel",
    StealTechnology => "steal_technology",
    Sabotage => "sabotage",
    SpreadDisinformation => "spread_disinformation",
});

impl MissionKind {
    /// Base risk before experience reduction.
    pub const fn base_risk(self) -> f64 {
        match self {
            Self::GatherIntel => 0.3,
            Self::StealTechnology => 0.5,
            Self::Sabotage => 0.6,
            Self::SpreadDisinformation => 0.4,
        }
    }

    /// Default duration in turns when none is given.
    pub const fn default_duration(self) -> u32 {
        match self {
            Self::GatherIntel => 2,
            Self::StealTechnology | Self::Sabotage => 4,
            Self::SpreadDisinformation => 3,
        }
    }
}

/// Lifecycle status of a covert mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    /// Still in progress.
    Pending,
    /// Resolved successfully.
    Succeeded,
    /// Resolved unsuccessfully.
    Failed,
}

/// What a successful sabotage mission destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SabotageKind {
    /// A share of the target's stockpile.
    ResourceDestruction,
    /// Research progress lost.
    ResearchSetback,
    /// One building in one settlement.
    BuildingDestruction,
}

/// Resolution of an espionage mission as recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EspionageOutcome {
    /// Mission succeeded.
    Succeeded,
    /// Mission failed and the spy escaped.
    Failed,
    /// Mission failed and the spy was captured.
    Captured,
}

// ---------------------------------------------------------------------------
// Diplomacy
// ---------------------------------------------------------------------------

/// Kind of agreement between two civilizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementKind {
    /// Mutual defense.
    Alliance,
    /// End of hostilities.
    Peace,
    /// Trade pact.
    Trade,
    /// Promise not to attack.
    NonAggression,
    /// Shared research.
    Research,
}

labelled_enum!(AgreementKind, "agreement", {
    Alliance => "alliance",
    Peace => "peace",
    Trade => "trade",
    NonAggression => "non_aggression",
    Research => "research",
});

/// Derived relationship between two civilizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiplomaticStatus {
    /// The pair has not met.
    Unknown,
    /// Met, not allied, not at war.
    Neutral,
    /// Standing alliance.
    Allied,
    /// At war.
    War,
}

labelled_enum!(DiplomaticStatus, "status", {
    Unknown => "unknown",
    Neutral => "neutral",
    Allied => "allied",
    War => "war",
});

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// How much of the hidden state the presentation layer may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// Everything, including private thoughts.
    #[default]
    Omniscient,
    /// Public agreements and events, no thoughts.
    Diplomatic,
    /// Public events only.
    Public,
}

labelled_enum!(ObservationMode, "observation mode", {
    Omniscient => "omniscient",
    Diplomatic => "diplomatic",
    Public => "public",
});

impl ObservationMode {
    /// Whether private thoughts may be shown.
    pub const fn exposes_thoughts(self) -> bool {
        matches!(self, Self::Omniscient)
    }

    /// Whether secret agreements may be shown.
    pub const fn exposes_secrets(self) -> bool {
        matches!(self, Self::Omniscient)
    }
}

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Created, world not built.
    Initializing,
    /// World built, not started.
    Ready,
    /// Autoplay active.
    Running,
    /// Autoplay suspended.
    Paused,
    /// Terminal.
    Stopped,
}

labelled_enum!(GameStatus, "game status", {
    Initializing => "initializing",
    Ready => "ready",
    Running => "running",
    Paused => "paused",
    Stopped => "stopped",
});

/// How often special tile resources appear during map generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceDistribution {
    /// Moderate frequency.
    #[default]
    Balanced,
    /// Many deposits.
    Abundant,
    /// Few deposits.
    Scarce,
    /// Frequency itself drawn at random.
    Random,
}

/// Notification kinds a caller can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A turn began.
    TurnStart,
    /// A turn finished, maintenance included.
    TurnEnd,
    /// Autoplay started.
    GameStart,
    /// The game stopped.
    GameEnd,
    /// A settlement was founded.
    SettlementFounded,
    /// A battle was resolved.
    BattleOccurred,
    /// A civ discovered or stole a technology.
    TechnologyDiscovered,
    /// A unit was created.
    UnitCreated,
    /// Any diplomatic or covert event.
    DiplomaticEvent,
}

/// Random world event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomEventKind {
    /// Settlements lose population.
    Plague,
    /// Food windfall.
    BountifulHarvest,
    /// Gold windfall.
    GoldDiscovery,
    /// A settlement loses a building.
    Earthquake,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Type tag on a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Who the agent is.
    Identity,
    /// Personality traits.
    Personality,
    /// Periodic summaries of position.
    Reflection,
    /// Actions the agent chose.
    Decision,
    /// Private reasoning.
    Thinking,
    /// Things the agent saw happen.
    Observation,
    /// Messages sent or received.
    Communication,
    /// Strategic plans.
    Plan,
}

/// Coarse importance bucket used by the memory index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceBucket {
    /// Below 0.4.
    Low,
    /// 0.4 up to 0.6.
    Medium,
    /// 0.6 up to 0.8.
    High,
    /// 0.8 and above.
    Critical,
}

impl ImportanceBucket {
    /// Bucket an importance in `[0, 1]`.
    pub fn of(importance: f64) -> Self {
        if importance >= 0.8 {
            Self::Critical
        } else if importance >= 0.6 {
            Self::High
        } else if importance >= 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_with_loose_separators() {
        assert_eq!("Trading Post".parse::<Improvement>().unwrap(), Improvement::TradingPost);
        assert_eq!("non-aggression".parse::<AgreementKind>().unwrap(), AgreementKind::NonAggression);
        assert_eq!(" gather intel ".parse::<MissionKind>().unwrap(), MissionKind::GatherIntel);
        assert!("catapult".parse::<UnitKind>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&MissionKind::StealTechnology).unwrap();
        assert_eq!(json, "\"steal_technology\"");
        assert_eq!(MissionKind::StealTechnology.to_string(), "steal_technology");
    }

    #[test]
    fn impassable_terrain() {
        assert!(!Terrain::Water.is_passable());
        assert!(!Terrain::Mountains.is_passable());
        assert!(Terrain::Hills.is_passable());
    }

    #[test]
    fn importance_buckets() {
        assert_eq!(ImportanceBucket::of(0.95), ImportanceBucket::Critical);
        assert_eq!(ImportanceBucket::of(0.8), ImportanceBucket::Critical);
        assert_eq!(ImportanceBucket::of(0.7), ImportanceBucket::High);
        assert_eq!(ImportanceBucket::of(0.5), ImportanceBucket::Medium);
        assert_eq!(ImportanceBucket::of(0.1), ImportanceBucket::Low);
    }

    #[test]
    fn only_omniscient_exposes_thoughts() {
        assert!(ObservationMode::Omniscient.exposes_thoughts());
        assert!(!ObservationMode::Diplomatic.exposes_thoughts());
        assert!(!ObservationMode::Public.exposes_thoughts());
    }
}
