//! Rule-based decision provider.
//!
//! Lets the engine play a full game without an LLM backend. Each civ gets
//! a [`Temperament`] from its personality traits, and a fixed list of rules
//! turns the [`StateView`] into typed commands. Rules only propose what the
//! view says is affordable and unlocked, so most commands validate; the
//! rest are dropped by the engine like any other bad action.

use futures::future::BoxFuture;
use realpolitik_core::{DecisionError, DecisionProvider};
use realpolitik_types::{
    BuildingKind, CivId, Command, Communication, Decision, DiplomaticStatus, KnownCivSummary,
    NEUTRAL_REPUTATION, OwnCivView, Position, ReputationStrategy, StateView, StrategicPlan, Terrain,
    UnitKind,
};
use realpolitik_world::{building_spec, unit_spec};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Settlements closer than this to any visible settlement are not proposed.
const SETTLEMENT_SPACING: u32 = 2;

/// Warlike civs stop training once they field this many military units.
const MILITARY_CAP: usize = 3;

/// Reputation (0-100) below which a warlike civ declares war.
const GRUDGE_REPUTATION: f64 = 30.0;

/// Reputation at or above which a civ offers an agreement.
const FRIENDLY_REPUTATION: f64 = NEUTRAL_REPUTATION;

/// Turns between broadcast greetings.
const GREETING_INTERVAL: u64 = 5;

/// Turns between disinformation attempts by schemers.
const DISINFORMATION_INTERVAL: u64 = 10;

/// Buildings a settlement wants, in order.
const BUILD_ORDER: [BuildingKind; 3] = [
    BuildingKind::Granary,
    BuildingKind::Library,
    BuildingKind::Market,
];

// ---------------------------------------------------------------------------
// Temperament
// ---------------------------------------------------------------------------

/// Broad play style derived from personality traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperament {
    /// Trains armies and punishes enemies.
    Warlike,
    /// Recruits spies, signs secret pacts, spreads lies.
    Schemer,
    /// Builds, trades, and keeps its word.
    Builder,
}

const WARLIKE_TRAITS: [&str; 3] = ["aggressive", "expansionist", "proud"];
const SCHEMER_TRAITS: [&str; 5] = [
    "cunning",
    "manipulative",
    "secretive",
    "calculating",
    "opportunistic",
];

impl Temperament {
    /// Classify a trait list. Warlike traits win over scheming ones.
    pub fn from_traits(traits: &[String]) -> Self {
        let has = |set: &[&str]| traits.iter().any(|t| set.contains(&t.to_lowercase().as_str()));
        if has(&WARLIKE_TRAITS) {
            Self::Warlike
        } else if has(&SCHEMER_TRAITS) {
            Self::Schemer
        } else {
            Self::Builder
        }
    }

    const fn goal(self) -> &'static str {
        match self {
            Self::Warlike => "Dominate the continent by force",
            Self::Schemer => "Rise quietly while rivals weaken each other",
            Self::Builder => "Grow a prosperous, trusted nation",
        }
    }

    const fn stance(self) -> &'static str {
        match self {
            Self::Warlike => "feared",
            Self::Schemer => "harmless",
            Self::Builder => "trustworthy",
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// A [`DecisionProvider`] that plays by fixed rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedProvider;

impl ScriptedProvider {
    /// Create a new scripted provider.
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionProvider for ScriptedProvider {
    fn decide(
        &self,
        _civ: CivId,
        view: StateView,
        turn: u64,
    ) -> BoxFuture<'static, Result<Decision, DecisionError>> {
        let decision = plan_turn(&view, turn);
        Box::pin(async move { Ok(decision) })
    }
}

/// Run every rule against `view` and collect the result.
pub fn plan_turn(view: &StateView, turn: u64) -> Decision {
    let own = &view.civilization;
    let temperament = Temperament::from_traits(&own.personality);
    let mut commands = Vec::new();
    let mut notes = Vec::new();

    if let Some(command) = research(own, &view.available_technologies) {
        notes.push("Our scholars need direction.");
        commands.push(command);
    }
    if let Some(command) = settle(view) {
        notes.push("There is good land to claim.");
        commands.push(command);
    }
    if let Some(command) = build(own) {
        commands.push(command);
    }
    match temperament {
        Temperament::Warlike => {
            if let Some(command) = train_army(own) {
                notes.push("Strength deters our rivals.");
                commands.push(command);
            }
            if let Some(command) = declare_war(&view.known_civilizations) {
                notes.push("They have wronged us. We will attack.");
                commands.push(command);
            }
        }
        Temperament::Schemer => {
            commands.extend(espionage(own, &view.known_civilizations));
            if let Some(command) = disinformation(&view.known_civilizations, turn) {
                notes.push("Let them believe a lie and turn on each other; we will deceive them.");
                commands.push(command);
            }
            if let Some(command) = pact(own, &view.known_civilizations, true) {
                notes.push("A secret pact costs nothing until we betray it.");
                commands.push(command);
            }
        }
        Temperament::Builder => {
            if let Some(command) = pact(own, &view.known_civilizations, false) {
                notes.push("Trade makes us both richer.");
                commands.push(command);
            }
        }
    }

    let communications = greeting(own, &view.known_civilizations, turn)
        .into_iter()
        .collect();
    let strategic_plan = own.strategic_plan.is_none().then(|| StrategicPlan {
        goal: temperament.goal().to_owned(),
        steps: vec![
            "expand".to_owned(),
            "research".to_owned(),
            "secure neighbours".to_owned(),
        ],
        horizon_turns: 20,
    });
    let thoughts = if notes.is_empty() {
        "Nothing demands action this turn.".to_owned()
    } else {
        notes.join(" ")
    };

    Decision {
        actions: Vec::new(),
        commands,
        communications,
        thoughts,
        strategic_plan,
        disinformation_plan: None,
        reputation_strategy: Some(ReputationStrategy {
            stance: temperament.stance().to_owned(),
            focus: view.known_civilizations.iter().map(|c| c.name.clone()).collect(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn research(own: &OwnCivView, available: &[String]) -> Option<Command> {
    if own.current_research.is_some() {
        return None;
    }
    available.iter().min().map(|tech| Command::Research {
        technology: tech.clone(),
    })
}

/// Walk the first settler toward the nearest free site and found there.
fn settle(view: &StateView) -> Option<Command> {
    let settler = view
        .civilization
        .units
        .iter()
        .find(|u| u.kind == UnitKind::Settler)?;
    let settled: Vec<Position> = view
        .visible_tiles
        .iter()
        .filter(|t| t.settlement.is_some())
        .map(|t| t.position)
        .collect();

    let site = view
        .visible_tiles
        .iter()
        .filter(|t| t.terrain.is_passable() && t.settlement.is_none())
        .filter(|t| t.units.iter().all(|u| u.owner == view.civilization.id))
        .filter(|t| {
            settled
                .iter()
                .all(|&s| s.distance(t.position) >= SETTLEMENT_SPACING)
        })
        .min_by_key(|t| {
            (
                settler.position.distance(t.position),
                terrain_rank(t.terrain),
                t.position.y,
                t.position.x,
            )
        })?
        .position;

    if settler.position.distance(site) <= settler.moves_remaining {
        return Some(Command::Found {
            name: None,
            at: Some(site),
        });
    }
    let step = step_toward(settler.position, site);
    view.visible_tiles
        .iter()
        .any(|t| t.position == step && t.terrain.is_passable())
        .then(|| Command::Move {
            unit: settler.id.to_string(),
            to: step,
        })
}

/// One diagonal-or-straight step from `from` toward `to`.
const fn step_toward(from: Position, to: Position) -> Position {
    const fn axis(a: u32, b: u32) -> u32 {
        if b > a {
            a.saturating_add(1)
        } else if b < a {
            a.saturating_sub(1)
        } else {
            a
        }
    }
    Position::new(axis(from.x, to.x), axis(from.y, to.y))
}

const fn terrain_rank(terrain: Terrain) -> u8 {
    match terrain {
        Terrain::Grassland => 0,
        Terrain::Plains => 1,
        Terrain::Hills => 2,
        Terrain::Forest => 3,
        _ => 4,
    }
}

fn build(own: &OwnCivView) -> Option<Command> {
    let capital = own.settlements.iter().find(|s| s.capital)?;
    let building = BUILD_ORDER
        .iter()
        .copied()
        .filter(|b| !capital.buildings.contains(b))
        .find(|&b| {
            let spec = building_spec(b);
            knows(own, spec.requires) && own.resources.can_afford(&spec.cost())
        })?;
    Some(Command::Build {
        building: building.to_string(),
        settlement: Some(capital.name.clone()),
    })
}

fn knows(own: &OwnCivView, tech: Option<&str>) -> bool {
    tech.is_none_or(|tech| own.technologies.iter().any(|t| t == tech))
}

fn unlocked(own: &OwnCivView, kind: UnitKind) -> bool {
    let spec = unit_spec(kind);
    knows(own, spec.requires) && own.resources.can_afford(&spec.cost())
}

fn train_army(own: &OwnCivView) -> Option<Command> {
    let military = own
        .units
        .iter()
        .filter(|u| !u.covert && u.kind != UnitKind::Settler && u.kind != UnitKind::Scout)
        .count();
    if military >= MILITARY_CAP {
        return None;
    }
    [UnitKind::Horseman, UnitKind::Archer, UnitKind::Warrior]
        .into_iter()
        .find(|&kind| unlocked(own, kind))
        .map(|kind| Command::Train {
            unit: kind.to_string(),
            settlement: None,
        })
}

fn declare_war(known: &[KnownCivSummary]) -> Option<Command> {
    known
        .iter()
        .filter(|c| c.status != DiplomaticStatus::War && c.reputation < GRUDGE_REPUTATION)
        .min_by(|a, b| a.reputation.total_cmp(&b.reputation))
        .map(|c| Command::DeclareWar {
            target: c.name.clone(),
        })
}

/// Recruit a spy when none exists, otherwise send idle spies after intel.
fn espionage(own: &OwnCivView, known: &[KnownCivSummary]) -> Vec<Command> {
    let spies: Vec<_> = own.units.iter().filter(|u| u.kind == UnitKind::Spy).collect();
    if spies.is_empty() {
        return if unlocked(own, UnitKind::Spy) {
            vec![Command::CreateSpy {
                settlement: None,
                disguise: Some("merchant".to_owned()),
            }]
        } else {
            Vec::new()
        };
    }
    let Some(target) = known.first() else {
        return Vec::new();
    };
    spies
        .iter()
        .filter(|s| s.is_idle_spy())
        .map(|s| Command::AssignMission {
            spy: s.id.to_string(),
            mission: "gather_intel".to_owned(),
            target: target.name.clone(),
            duration: None,
            subject: None,
        })
        .collect()
}

fn disinformation(known: &[KnownCivSummary], turn: u64) -> Option<Command> {
    if turn % DISINFORMATION_INTERVAL != 0 {
        return None;
    }
    match known {
        [target, subject, ..] => Some(Command::LaunchDisinformation {
            target: target.name.clone(),
            subject: subject.name.clone(),
            claim: Some(format!("{} is massing troops on your border", subject.name)),
        }),
        _ => None,
    }
}

/// Offer one agreement to the first friendly civ without one.
fn pact(own: &OwnCivView, known: &[KnownCivSummary], secret: bool) -> Option<Command> {
    let table = if secret {
        &own.secret_agreements
    } else {
        &own.public_agreements
    };
    known
        .iter()
        .filter(|c| c.status != DiplomaticStatus::War && c.reputation >= FRIENDLY_REPUTATION)
        .find(|c| !table.iter().any(|a| a.partner == c.id && !a.broken))
        .map(|c| Command::CreateAgreement {
            partner: c.name.clone(),
            kind: (if secret { "non_aggression" } else { "trade" }).to_owned(),
            secret,
            terms: None,
        })
}

fn greeting(own: &OwnCivView, known: &[KnownCivSummary], turn: u64) -> Option<Communication> {
    (!known.is_empty() && turn % GREETING_INTERVAL == 1).then(|| Communication {
        to: "all".to_owned(),
        message: format!("{} sends greetings and hopes for lasting peace.", own.name),
    })
}
