//! Decision payloads returned by a decision provider.
//!
//! A [`Decision`] carries both typed [`Command`]s and free-text action
//! lines. The engine applies commands first, then routes each text line
//! through the intent adapter. Entity references inside commands are plain
//! strings (names or ids) and are resolved during validation.

use serde::{Deserialize, Serialize};

use crate::structs::Position;

/// Everything a civilization decided to do this turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Free-text action lines, matched against intent patterns.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Typed commands, applied before `actions`.
    #[serde(default)]
    pub commands: Vec<Command>,
    /// Outgoing messages.
    #[serde(default)]
    pub communications: Vec<Communication>,
    /// Private reasoning; never shown to other civs.
    #[serde(default)]
    pub thoughts: String,
    /// Optional multi-turn plan.
    #[serde(default)]
    pub strategic_plan: Option<StrategicPlan>,
    /// Optional disinformation intent.
    #[serde(default)]
    pub disinformation_plan: Option<DisinformationPlan>,
    /// Optional reputation stance.
    #[serde(default)]
    pub reputation_strategy: Option<ReputationStrategy>,
}

impl Decision {
    /// Whether the decision asks for nothing at all.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.commands.is_empty()
            && self.communications.is_empty()
            && self.thoughts.is_empty()
            && self.strategic_plan.is_none()
            && self.disinformation_plan.is_none()
            && self.reputation_strategy.is_none()
    }
}

/// An outgoing message. `to` is a civ name, or `all` for a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    /// Recipient name, or `all`.
    pub to: String,
    /// Text.
    pub message: String,
}

/// A multi-turn plan the agent wants to remember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicPlan {
    /// Overall goal.
    pub goal: String,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<String>,
    /// How many turns the plan spans.
    #[serde(default)]
    pub horizon_turns: u32,
}

/// A declared intent to deceive `target` about `subject`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisinformationPlan {
    /// Civ to deceive.
    pub target: String,
    /// Civ the claim is about.
    pub subject: String,
    /// The false claim.
    pub claim: String,
}

/// How the agent wants to be perceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationStrategy {
    /// Stance label, e.g. "trustworthy" or "feared".
    pub stance: String,
    /// Civs the stance is aimed at.
    #[serde(default)]
    pub focus: Vec<String>,
}

/// A typed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Move a unit (by id or kind label) to a tile.
    Move {
        /// Unit id or kind label.
        unit: String,
        /// Destination.
        to: Position,
    },
    /// Start researching a technology.
    Research {
        /// Technology name.
        technology: String,
    },
    /// Construct a building.
    Build {
        /// Building label.
        building: String,
        /// Settlement name; defaults to the capital.
        #[serde(default)]
        settlement: Option<String>,
    },
    /// Found a settlement with a settler.
    Found {
        /// Name for the new settlement.
        #[serde(default)]
        name: Option<String>,
        /// Tile; defaults to the settler's tile.
        #[serde(default)]
        at: Option<Position>,
    },
    /// Train a unit in a settlement.
    Train {
        /// Unit label.
        unit: String,
        /// Settlement name; defaults to the capital.
        #[serde(default)]
        settlement: Option<String>,
    },
    /// Improve a tile.
    Improve {
        /// Tile.
        at: Position,
        /// Improvement label; defaults by terrain.
        #[serde(default)]
        improvement: Option<String>,
    },
    /// Recruit a covert operative.
    CreateSpy {
        /// Settlement name; defaults to the capital.
        #[serde(default)]
        settlement: Option<String>,
        /// Cover identity.
        #[serde(default)]
        disguise: Option<String>,
    },
    /// Send an idle spy on a mission.
    AssignMission {
        /// Spy id, or `any` for the first idle spy.
        spy: String,
        /// Mission label.
        mission: String,
        /// Target civ name.
        target: String,
        /// Turns; defaults per mission kind.
        #[serde(default)]
        duration: Option<u32>,
        /// Third civ named by a disinformation mission.
        #[serde(default)]
        subject: Option<String>,
    },
    /// Spread a false claim about `subject` to `target`.
    LaunchDisinformation {
        /// Civ to deceive.
        target: String,
        /// Civ the claim is about.
        subject: String,
        /// Claim text.
        #[serde(default)]
        claim: Option<String>,
    },
    /// Sign an agreement.
    CreateAgreement {
        /// Partner name.
        partner: String,
        /// Agreement label.
        kind: String,
        /// Secret agreements stay out of the public table.
        #[serde(default)]
        secret: bool,
        /// Terms text.
        #[serde(default)]
        terms: Option<String>,
    },
    /// Break every agreement with a partner.
    BreakAgreement {
        /// Partner name.
        partner: String,
        /// Whether to break secret (true) or public (false) agreements.
        #[serde(default)]
        secret: bool,
    },
    /// Betray a civ.
    Betray {
        /// Victim name.
        target: String,
    },
    /// Declare war.
    DeclareWar {
        /// Target name.
        target: String,
    },
}

impl Command {
    /// Strategy label used by the behavior histogram.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Research { .. } => "research",
            Self::Build { .. } => "build",
            Self::Found { .. } => "found",
            Self::Train { .. } => "train",
            Self::Improve { .. } => "improve",
            Self::CreateSpy { .. } => "create_spy",
            Self::AssignMission { .. } => "assign_mission",
            Self::LaunchDisinformation { .. } => "launch_disinformation",
            Self::CreateAgreement { .. } => "create_agreement",
            Self::BreakAgreement { .. } => "break_agreement",
            Self::Betray { .. } => "betray",
            Self::DeclareWar { .. } => "declare_war",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decision_fields_default_when_missing() {
        let decision: Decision = serde_json::from_str(r#"{"thoughts": "wait"}"#).unwrap();
        assert!(decision.actions.is_empty());
        assert!(decision.commands.is_empty());
        assert_eq!(decision.thoughts, "wait");
        assert!(!decision.is_empty());
        assert!(Decision::default().is_empty());
    }

    #[test]
    fn commands_are_tagged() {
        let json = r#"{"command": "move", "unit": "warrior", "to": {"x": 2, "y": 3}}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::Move {
                unit: "warrior".into(),
                to: Position::new(2, 3)
            }
        );
        assert_eq!(cmd.label(), "move");
    }

    #[test]
    fn agreement_command_defaults() {
        let json = r#"{"command": "create_agreement", "partner": "Rome", "kind": "trade"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert!(matches!(cmd, Command::CreateAgreement { secret: false, terms: None, .. }));
    }
}
