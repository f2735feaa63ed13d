//! Command validation and execution.
//!
//! A decision is applied in a fixed order: typed commands, then the
//! disinformation plan (as a command), then each free-text action line
//! through the intent adapter. Every command is validated against the
//! current state before it touches anything; a failure is a
//! [`CommandError`], logged at `warn` and dropped. Nothing a provider sends
//! can abort a turn.
//!
//! - [`development`] -- move, research, build, found, train, improve
//! - [`covert`] -- spies, missions, disinformation
//! - [`diplomatic`] -- agreements, betrayal, war, communications

pub mod covert;
pub mod development;
pub mod diplomatic;

use realpolitik_agents::{AgentError, BehaviorObserver, IntentParser, TechTree};
use realpolitik_types::{
    AgreementKind, BuildingKind, CivId, Command, Decision, Improvement, MemoryEntry,
    MemoryPayload, MemoryType, ParseKindError, Position, Resources, Terrain, UnitId,
};
use realpolitik_world::WorldError;
use tracing::{debug, warn};

use crate::state::{GameState, Thought};

/// Why a command was rejected.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No unit of this civ matches the reference.
    #[error("no unit matching `{0}`")]
    UnknownUnit(String),

    /// No civilization matches the reference.
    #[error("no civilization matching `{0}`")]
    UnknownCiv(String),

    /// No settlement of this civ matches the reference.
    #[error("no settlement matching `{0}`")]
    UnknownSettlement(String),

    /// A kind label (unit, building, mission, ...) did not parse.
    #[error(transparent)]
    UnknownKind(#[from] ParseKindError),

    /// The destination is further than the unit can move this turn.
    #[error("unit {unit} needs {distance} moves but has {remaining}")]
    OutOfRange {
        /// The unit.
        unit: UnitId,
        /// Tiles to travel.
        distance: u32,
        /// Moves left.
        remaining: u32,
    },

    /// Off the map, impassable, or already settled.
    #[error(transparent)]
    World(#[from] WorldError),

    /// The civ cannot pay for it.
    #[error("cannot afford {what} (costs {cost})")]
    Unaffordable {
        /// What was requested.
        what: String,
        /// Its cost.
        cost: Resources,
    },

    /// A prerequisite technology is missing.
    #[error("{what} requires {technology}")]
    MissingTechnology {
        /// What was requested.
        what: String,
        /// The technology it needs.
        technology: String,
    },

    /// The settlement already has the building.
    #[error("{settlement} already has a {building}")]
    AlreadyBuilt {
        /// The building.
        building: BuildingKind,
        /// Settlement name.
        settlement: String,
    },

    /// No settler can reach the requested tile.
    #[error("no settler can reach {0}")]
    NoSettler(Position),

    /// A new settlement would crowd an existing one.
    #[error("{position} is within {distance} tiles of an existing settlement")]
    TooClose {
        /// Requested tile.
        position: Position,
        /// Distance to the nearest settlement.
        distance: u32,
    },

    /// The tile is neither in reach of a settlement nor of a unit.
    #[error("{0} is outside this civilization's reach")]
    OutOfReach(Position),

    /// The improvement does not fit the terrain.
    #[error("cannot build a {improvement} on {terrain}")]
    WrongTerrain {
        /// The improvement.
        improvement: Improvement,
        /// The tile terrain.
        terrain: Terrain,
    },

    /// No terrain default and no improvement named.
    #[error("nothing to build on {0}")]
    NoImprovement(Terrain),

    /// Diplomacy needs first contact.
    #[error("has not met {0}")]
    NotMet(CivId),

    /// Only a peace agreement can be made with an enemy.
    #[error("at war with {0}")]
    AtWar(CivId),

    /// Already at war with the target.
    #[error("already at war with {0}")]
    AlreadyAtWar(CivId),

    /// The partner does not trust the proposer enough.
    #[error("{partner} does not trust us (reputation {reputation:.0})")]
    Untrusted {
        /// The partner.
        partner: CivId,
        /// Partner's rating of the proposer.
        reputation: f64,
    },

    /// A live agreement of this kind already exists.
    #[error("a {kind} agreement with {partner} is already in force")]
    DuplicateAgreement {
        /// The partner.
        partner: CivId,
        /// Agreement kind.
        kind: AgreementKind,
    },

    /// No live agreement to break.
    #[error("no live agreement with {0}")]
    NothingToBreak(CivId),

    /// No spy is free for a mission.
    #[error("no idle spy available")]
    NoIdleSpy,

    /// Espionage, diplomacy, or research refused the operation.
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// A command that passed validation and was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Command label, for the strategy histogram.
    pub label: &'static str,
    /// What happened, for the action history and decision memory.
    pub description: String,
    /// The civ acted upon, if any.
    pub target: Option<CivId>,
}

impl Applied {
    fn new(command: &Command, description: impl Into<String>) -> Self {
        Self {
            label: command.label(),
            description: description.into(),
            target: None,
        }
    }

    const fn against(mut self, target: CivId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Outcome of applying a whole decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionReport {
    /// Commands applied.
    pub applied: Vec<Applied>,
    /// Commands or lines dropped.
    pub dropped: u32,
    /// Messages delivered.
    pub messages_sent: u32,
}

/// Validate and apply one command for `civ`.
pub fn apply_command(
    state: &mut GameState,
    civ: CivId,
    command: &Command,
    tree: &TechTree,
) -> Result<Applied, CommandError> {
    match command {
        Command::Move { unit, to } => development::move_unit(state, civ, unit, *to)
            .map(|d| Applied::new(command, d)),
        Command::Research { technology } => {
            development::research(state, civ, technology, tree).map(|d| Applied::new(command, d))
        }
        Command::Build {
            building,
            settlement,
        } => development::build(state, civ, building, settlement.as_deref())
            .map(|d| Applied::new(command, d)),
        Command::Found { name, at } => {
            development::found(state, civ, name.as_deref(), *at).map(|d| Applied::new(command, d))
        }
        Command::Train { unit, settlement } => {
            development::train(state, civ, unit, settlement.as_deref())
                .map(|d| Applied::new(command, d))
        }
        Command::Improve { at, improvement } => {
            development::improve(state, civ, *at, improvement.as_deref())
                .map(|d| Applied::new(command, d))
        }
        Command::CreateSpy {
            settlement,
            disguise,
        } => covert::create_spy(state, civ, settlement.as_deref(), disguise.as_deref())
            .map(|d| Applied::new(command, d)),
        Command::AssignMission {
            spy,
            mission,
            target,
            duration,
            subject,
        } => covert::assign(state, civ, spy, mission, target, *duration, subject.as_deref())
            .map(|(d, t)| Applied::new(command, d).against(t)),
        Command::LaunchDisinformation {
            target,
            subject,
            claim,
        } => covert::disinform(state, civ, target, subject, claim.as_deref())
            .map(|(d, t)| Applied::new(command, d).against(t)),
        Command::CreateAgreement {
            partner,
            kind,
            secret,
            terms,
        } => diplomatic::create_agreement(state, civ, partner, kind, *secret, terms.as_deref())
            .map(|(d, t)| Applied::new(command, d).against(t)),
        Command::BreakAgreement { partner, secret } => {
            diplomatic::break_agreement(state, civ, partner, *secret)
                .map(|(d, t)| Applied::new(command, d).against(t))
        }
        Command::Betray { target } => diplomatic::betray(state, civ, target)
            .map(|(d, t)| Applied::new(command, d).against(t)),
        Command::DeclareWar { target } => diplomatic::declare_war(state, civ, target)
            .map(|(d, t)| Applied::new(command, d).against(t)),
    }
}

/// Resolve a civ reference other than `civ` itself.
pub(crate) fn resolve_other(state: &GameState, civ: CivId, raw: &str) -> Result<CivId, CommandError> {
    let other = state
        .resolve_civ(raw)
        .ok_or_else(|| CommandError::UnknownCiv(raw.to_owned()))?;
    if other == civ {
        return Err(AgentError::SelfTarget(civ).into());
    }
    Ok(other)
}

/// Like [`resolve_other`], but the two must have met.
pub(crate) fn resolve_met(state: &GameState, civ: CivId, raw: &str) -> Result<CivId, CommandError> {
    let other = resolve_other(state, civ, raw)?;
    if !state.has_met(civ, other) {
        return Err(CommandError::NotMet(other));
    }
    Ok(other)
}

// ---------------------------------------------------------------------------
// Whole decisions
// ---------------------------------------------------------------------------

/// Apply everything in `decision` for `civ`.
///
/// Thoughts and plans are recorded first so they are on file even when
/// every command fails. The observer sees the messages actually sent and
/// the labels of the commands actually applied.
pub fn apply_decision(
    state: &mut GameState,
    civ: CivId,
    decision: Decision,
    tree: &TechTree,
    parser: &IntentParser,
    observer: &mut BehaviorObserver,
) -> DecisionReport {
    let turn = state.turn;
    let mut report = DecisionReport::default();
    let Decision {
        actions,
        mut commands,
        communications,
        thoughts,
        strategic_plan,
        disinformation_plan,
        reputation_strategy,
    } = decision;

    if !thoughts.trim().is_empty() {
        state.thoughts.entry(civ).or_default().push(Thought {
            turn,
            text: thoughts.clone(),
        });
        state.memory.remember(MemoryEntry::note(
            civ,
            MemoryType::Thinking,
            turn,
            0.4,
            thoughts.clone(),
        ));
    }
    if let Some(plan) = strategic_plan {
        state.memory.remember(MemoryEntry::note(
            civ,
            MemoryType::Plan,
            turn,
            0.6,
            format!("Strategic goal: {}", plan.goal),
        ));
        if let Some(c) = state.civ_mut(civ) {
            c.strategic_plan = Some(plan);
        }
    }
    if let Some(strategy) = reputation_strategy
        && let Some(c) = state.civ_mut(civ)
    {
        c.reputation_strategy = Some(strategy);
    }
    if let Some(plan) = disinformation_plan {
        commands.push(Command::LaunchDisinformation {
            target: plan.target,
            subject: plan.subject,
            claim: Some(plan.claim).filter(|c| !c.trim().is_empty()),
        });
    }

    for line in &actions {
        match parser.parse(line) {
            Some(command) => commands.push(command),
            None => {
                warn!(%civ, line = %line, "Unrecognized action dropped");
                report.dropped = report.dropped.saturating_add(1);
            }
        }
    }

    for command in &commands {
        match apply_command(state, civ, command, tree) {
            Ok(applied) => {
                debug!(%civ, action = applied.label, detail = %applied.description, "Action applied");
                if let Some(c) = state.civ_mut(civ) {
                    c.record_action(turn, applied.description.clone());
                }
                report.applied.push(applied);
            }
            Err(e) => {
                warn!(%civ, action = command.label(), error = %e, "Action rejected");
                report.dropped = report.dropped.saturating_add(1);
            }
        }
    }

    let sent = diplomatic::send_communications(state, civ, &communications);
    report.messages_sent = u32::try_from(sent.len()).unwrap_or(u32::MAX);

    if !report.applied.is_empty() {
        let summary: Vec<String> = report
            .applied
            .iter()
            .map(|a| a.description.clone())
            .collect();
        let targets: Vec<CivId> = report.applied.iter().filter_map(|a| a.target).collect();
        state.memory.remember(MemoryEntry::new(
            civ,
            MemoryType::Decision,
            turn,
            0.5,
            format!("Turn {turn}: {}", summary.join("; ")),
            MemoryPayload::Decision {
                actions: summary,
                targets,
            },
            None,
        ));
    }

    let labels: Vec<&str> = report.applied.iter().map(|a| a.label).collect();
    observer.observe_decision(civ, turn, &sent, &thoughts, &labels);
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use realpolitik_agents::DetectionConfig;
    use realpolitik_types::{Communication, DisinformationPlan, MemoryType, StrategicPlan};

    use super::*;
    use crate::config::GameConfig;
    use crate::setup;

    fn game() -> (GameState, CivId, CivId) {
        let config = GameConfig {
            map_width: 8,
            map_height: 8,
            civilizations: 2,
            ..GameConfig::default()
        };
        let state = setup::build(&config, &TechTree::new(), &mut StdRng::seed_from_u64(5)).unwrap();
        let (a, b) = (state.civs[0].id, state.civs[1].id);
        (state, a, b)
    }

    #[test]
    fn unknown_lines_and_bad_commands_are_dropped() {
        let (mut state, a, _) = game();
        state.turn = 1;
        let decision = Decision {
            actions: vec!["dance a jig".into(), "research mining".into()],
            commands: vec![Command::Research {
                technology: "warp drive".into(),
            }],
            ..Decision::default()
        };
        let mut observer = BehaviorObserver::new(DetectionConfig::default());
        let report = apply_decision(
            &mut state,
            a,
            decision,
            &TechTree::new(),
            &IntentParser::new().unwrap(),
            &mut observer,
        );
        assert_eq!(report.dropped, 2);
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].label, "research");
        let civ = state.civ(a).unwrap();
        assert_eq!(civ.current_research.as_deref(), Some("mining"));
        assert_eq!(civ.action_history.len(), 1);
        assert_eq!(observer.record(a).unwrap().decisions_observed, 1);
    }

    #[test]
    fn thoughts_and_plans_are_recorded() {
        let (mut state, a, b) = game();
        state.turn = 2;
        let name_b = state.civ_name(b);
        let decision = Decision {
            thoughts: "Patience.".into(),
            strategic_plan: Some(StrategicPlan {
                goal: "Grow".into(),
                steps: Vec::new(),
                horizon_turns: 10,
            }),
            disinformation_plan: Some(DisinformationPlan {
                target: name_b,
                subject: "nobody".into(),
                claim: String::new(),
            }),
            ..Decision::default()
        };
        let mut observer = BehaviorObserver::new(DetectionConfig::default());
        let report = apply_decision(
            &mut state,
            a,
            decision,
            &TechTree::new(),
            &IntentParser::new().unwrap(),
            &mut observer,
        );
        // The plan's command fails: unmet target and unknown subject.
        assert_eq!(report.dropped, 1);
        assert_eq!(state.thoughts.get(&a).unwrap().len(), 1);
        assert!(state.civ(a).unwrap().strategic_plan.is_some());
        let store = state.memory.store(a).unwrap();
        assert_eq!(store.of_type(MemoryType::Thinking).len(), 1);
        assert_eq!(store.of_type(MemoryType::Plan).len(), 1);
        assert!(store.of_type(MemoryType::Decision).is_empty());
    }

    #[test]
    fn deceptive_messages_reach_the_observer() {
        let (mut state, a, b) = game();
        state.turn = 1;
        state.ensure_contact(a, b);
        let decision = Decision {
            communications: vec![Communication {
                to: state.civ_name(b),
                message: "We want peace and friendship.".into(),
            }],
            thoughts: "Prepare the attack; war is coming.".into(),
            ..Decision::default()
        };
        let mut observer = BehaviorObserver::new(DetectionConfig::default());
        let report = apply_decision(
            &mut state,
            a,
            decision,
            &TechTree::new(),
            &IntentParser::new().unwrap(),
            &mut observer,
        );
        assert_eq!(report.messages_sent, 1);
        assert!(!observer.record(a).unwrap().deceptions.is_empty());
    }
}
