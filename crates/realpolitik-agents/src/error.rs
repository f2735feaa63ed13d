//! Error types for the `realpolitik-agents` crate.
//!
//! Every fallible operation returns [`AgentError`]. None of these are fatal
//! to a turn: the scheduler logs them and drops the offending action.

use realpolitik_types::{CivId, MissionKind, UnitId};

/// Errors raised by diplomacy, espionage, and research operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The technology is not in the tech tree.
    #[error("unknown technology `{0}`")]
    UnknownTechnology(String),

    /// The civ already knows the technology.
    #[error("technology `{0}` is already known")]
    AlreadyKnown(String),

    /// Prerequisites are missing.
    #[error("technology `{technology}` requires {missing:?}")]
    MissingPrerequisites {
        /// Requested technology.
        technology: String,
        /// Prerequisites the civ lacks.
        missing: Vec<String>,
    },

    /// The unit is not a covert operative.
    #[error("unit {0} is not a spy")]
    NotASpy(UnitId),

    /// The spy already has a mission.
    #[error("spy {unit} is already on a {mission} mission")]
    SpyBusy {
        /// The spy.
        unit: UnitId,
        /// Its current mission.
        mission: MissionKind,
    },

    /// A civ tried to target itself.
    #[error("civilization {0} cannot target itself")]
    SelfTarget(CivId),

    /// A mission or campaign needs a third civ and none was given.
    #[error("{0} needs a subject civilization distinct from actor and target")]
    MissingSubject(MissionKind),

    /// The intent pattern table failed to compile.
    #[error("intent pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}
