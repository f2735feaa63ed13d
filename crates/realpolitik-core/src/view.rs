//! Per-civilization state views.
//!
//! A view is everything a decision provider may see for one civ: its own
//! state, revealed tiles, met civilizations, recent events it is entitled
//! to know about, messages addressed to it, and the memories selected by
//! the context index. Nothing hidden by fog or secrecy leaks through.

use std::collections::BTreeSet;

use realpolitik_agents::{MemoryConfig, TechTree};
use realpolitik_types::{
    CivId, DiplomaticStatus, EspionageOutcome, GameEvent, GameEventKind, IntelView,
    KnownCivSummary, Message, OwnCivView, StateView, UnitKind, VisibleTile, VisibleUnit,
};
use realpolitik_world::unit_spec;

use crate::state::GameState;

/// How many turns back recent events reach.
pub const RECENT_EVENT_TURNS: u64 = 5;

/// Distance at which hostile units count as a threat to a settlement.
pub const THREAT_RADIUS: u32 = 3;

/// Reputation below which a met civ is flagged as untrustworthy.
const DISTRUST_BELOW: f64 = 30.0;

/// Reputation at or above which a met civ is flagged as a likely partner.
const FRIENDLY_FROM: f64 = 60.0;

/// Build the view `civ` sees this turn. `None` if the civ does not exist.
pub fn build_view(
    state: &GameState,
    civ: CivId,
    tree: &TechTree,
    memory: &MemoryConfig,
) -> Option<StateView> {
    let own = state.civ(civ)?;
    let met = state.met_civs(civ);

    let civilization = OwnCivView {
        id: own.id,
        name: own.name.clone(),
        resources: own.resources.clone(),
        technologies: own.technologies.iter().cloned().collect(),
        current_research: own.current_research.clone(),
        research_progress: own.research_progress,
        settlements: state.settlements_of(civ).into_iter().cloned().collect(),
        units: state.units_of(civ).into_iter().cloned().collect(),
        personality: own.personality.clone(),
        public_agreements: own.public_agreements.values().cloned().collect(),
        secret_agreements: own.secret_agreements.values().cloned().collect(),
        active_disinformation: own.disinformation.clone(),
        strategic_plan: own.strategic_plan.clone(),
    };

    let received_communications = received_messages(state, civ, &met);
    let correspondents: Vec<CivId> = received_communications
        .iter()
        .map(|m| m.from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let known: Vec<CivId> = state
        .civs
        .iter()
        .filter(|c| met.contains(&c.id))
        .map(|c| c.id)
        .collect();

    let (opportunities, threats) = assess(state, civ, tree, &met);

    Some(StateView {
        turn: state.turn,
        civilization,
        visible_tiles: visible_tiles(state, civ),
        known_civilizations: known_civs(state, civ, &met),
        recent_events: recent_events(state, civ, &met),
        received_communications,
        memories: state
            .memory
            .relevant_for(civ, memory, &known, &correspondents),
        opportunities,
        threats,
        available_technologies: tree.available(&own.technologies),
    })
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

fn visible_tiles(state: &GameState, civ: CivId) -> Vec<VisibleTile> {
    state
        .fog
        .visible_positions(civ)
        .into_iter()
        .filter_map(|pos| state.map.tile(pos))
        .map(|tile| VisibleTile {
            position: tile.position,
            terrain: tile.terrain,
            resource: tile.resource,
            improvement: tile.improvement,
            settlement: tile.settlement,
            settlement_owner: state.settlement_at(tile.position).map(|s| s.owner),
            units: state
                .units_at(tile.position)
                .into_iter()
                .filter(|u| !u.covert || u.owner == civ)
                .map(|u| VisibleUnit {
                    owner: u.owner,
                    kind: u.kind,
                    strength: u.strength,
                })
                .collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Other civilizations
// ---------------------------------------------------------------------------

fn known_civs(state: &GameState, civ: CivId, met: &BTreeSet<CivId>) -> Vec<KnownCivSummary> {
    let Some(own) = state.civ(civ) else {
        return Vec::new();
    };
    state
        .civs
        .iter()
        .filter(|other| met.contains(&other.id))
        .map(|other| {
            let visible_settlements = state
                .settlements_of(other.id)
                .iter()
                .filter(|s| state.fog.is_visible(civ, s.position))
                .count();
            let visible_military_units = state
                .units_of(other.id)
                .iter()
                .filter(|u| {
                    !u.covert && u.kind.is_military() && state.fog.is_visible(civ, u.position)
                })
                .count();
            KnownCivSummary {
                id: other.id,
                name: other.name.clone(),
                status: state.status(civ, other.id),
                reputation: own.reputation_of(other.id),
                visible_settlements: u32::try_from(visible_settlements).unwrap_or(u32::MAX),
                visible_military_units: u32::try_from(visible_military_units).unwrap_or(u32::MAX),
                intel: own
                    .intel
                    .get(&other.id)
                    .map(|records| {
                        records
                            .iter()
                            .map(|r| IntelView {
                                turn: r.turn,
                                fact: r.fact.clone(),
                                accuracy: r.accuracy,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Events and messages
// ---------------------------------------------------------------------------

/// Whether `civ` is entitled to see `event`.
///
/// Participants see public events. Covert events are seen by the actor, by
/// both signatories of a secret agreement, and by the target of a captured
/// spy. Public diplomatic events between two met civs are common knowledge;
/// a betrayal of a secret agreement stays between its parties.
pub fn can_see_event(event: &GameEvent, civ: CivId, met: &BTreeSet<CivId>) -> bool {
    match &event.kind {
        GameEventKind::Espionage {
            actor,
            target,
            outcome,
            ..
        } => *actor == civ || (*target == civ && *outcome == EspionageOutcome::Captured),
        GameEventKind::DisinformationLaunched { actor, .. }
        | GameEventKind::DisinformationExpired { actor, .. } => *actor == civ,
        GameEventKind::DeclarationOfWar { .. }
        | GameEventKind::PeaceTreaty { .. }
        | GameEventKind::AllianceFormed { .. }
        | GameEventKind::AllianceBroken { .. }
        | GameEventKind::Betrayal { secret: false, .. } => {
            event.kind.involves(civ) || event.kind.parties().iter().all(|p| met.contains(p))
        }
        kind => kind.involves(civ),
    }
}

fn recent_events(state: &GameState, civ: CivId, met: &BTreeSet<CivId>) -> Vec<GameEvent> {
    let since = state.turn.saturating_sub(RECENT_EVENT_TURNS);
    state
        .events
        .iter()
        .filter(|e| e.turn >= since)
        .filter(|e| can_see_event(e, civ, met))
        .cloned()
        .collect()
}

/// Messages `civ` received this turn or last. Broadcasts only reach civs
/// that have met the sender.
fn received_messages(state: &GameState, civ: CivId, met: &BTreeSet<CivId>) -> Vec<Message> {
    let since = state.turn.saturating_sub(1);
    state
        .messages
        .iter()
        .filter(|m| m.turn >= since && m.delivered_to(civ))
        .filter(|m| m.to.is_some() || met.contains(&m.from))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Opportunity and threat analysis
// ---------------------------------------------------------------------------

fn assess(
    state: &GameState,
    civ: CivId,
    tree: &TechTree,
    met: &BTreeSet<CivId>,
) -> (Vec<String>, Vec<String>) {
    let mut opportunities = Vec::new();
    let mut threats = Vec::new();
    let Some(own) = state.civ(civ) else {
        return (opportunities, threats);
    };

    if own.current_research.is_none() {
        let available = tree.available(&own.technologies);
        if !available.is_empty() {
            opportunities.push(format!(
                "No research underway; available: {}",
                available.join(", ")
            ));
        }
    }

    let units = state.units_of(civ);
    if units.iter().any(|u| u.kind == UnitKind::Settler) {
        opportunities.push("A settler is ready to found a new settlement".to_owned());
    } else if own.resources.can_afford(&unit_spec(UnitKind::Settler).cost()) {
        opportunities.push("Production suffices to train a settler".to_owned());
    }
    let idle_spies = units.iter().filter(|u| u.is_idle_spy()).count();
    if idle_spies > 0 {
        opportunities.push(format!("{idle_spies} spy(ies) awaiting a mission"));
    }

    let settlements = state.settlements_of(civ);
    for other in state.civs.iter().filter(|c| met.contains(&c.id)) {
        let status = state.status(civ, other.id);
        let rating = own.reputation_of(other.id);
        if status == DiplomaticStatus::War {
            threats.push(format!("At war with {}", other.name));
        } else if rating >= FRIENDLY_FROM && status != DiplomaticStatus::Allied {
            opportunities.push(format!(
                "{} regards us well ({rating:.0}); an agreement is within reach",
                other.name
            ));
        }
        if rating < DISTRUST_BELOW {
            threats.push(format!("{} cannot be trusted ({rating:.0})", other.name));
        }

        for settlement in &settlements {
            let near = state
                .units_of(other.id)
                .iter()
                .filter(|u| !u.covert && u.kind.is_military())
                .filter(|u| state.fog.is_visible(civ, u.position))
                .filter(|u| u.position.distance(settlement.position) <= THREAT_RADIUS)
                .count();
            if near > 0 {
                threats.push(format!(
                    "{near} {} unit(s) near {}",
                    other.name, settlement.name
                ));
            }
        }
    }

    (opportunities, threats)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use realpolitik_types::{MissionKind, Position};

    use super::*;
    use crate::config::GameConfig;
    use crate::setup::{self, make_unit};

    fn game() -> (GameState, CivId, CivId) {
        let config = GameConfig {
            map_width: 8,
            map_height: 8,
            civilizations: 2,
            ..GameConfig::default()
        };
        let state = setup::build(&config, &TechTree::new(), &mut StdRng::seed_from_u64(3)).unwrap();
        let (a, b) = (state.civs[0].id, state.civs[1].id);
        (state, a, b)
    }

    fn view(state: &GameState, civ: CivId) -> StateView {
        build_view(state, civ, &TechTree::new(), &MemoryConfig::default()).unwrap()
    }

    #[test]
    fn view_is_limited_by_fog() {
        let (state, a, _) = game();
        let v = view(&state, a);
        assert_eq!(v.visible_tiles.len(), state.fog.visible_count(a));
        assert!(v.known_civilizations.is_empty());
        assert_eq!(v.civilization.units.len(), 2);
        assert!(!v.memories.is_empty());
        assert!(v.available_technologies.contains(&"mining".to_owned()));
    }

    #[test]
    fn known_civs_require_contact() {
        let (mut state, a, b) = game();
        state.ensure_contact(a, b);
        let v = view(&state, a);
        assert_eq!(v.known_civilizations.len(), 1);
        assert_eq!(v.known_civilizations[0].status, DiplomaticStatus::Neutral);
        assert!((v.known_civilizations[0].reputation - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn covert_units_are_hidden_from_others() {
        let (mut state, a, b) = game();
        state.fog.reveal_all(b);
        let spy = make_unit(a, UnitKind::Spy, Position::new(1, 1), 0);
        state.units.insert(spy.id, spy);
        let mine = view(&state, a);
        let theirs = view(&state, b);
        let spies = |v: &StateView| {
            v.visible_tiles
                .iter()
                .flat_map(|t| t.units.iter())
                .filter(|u| u.kind == UnitKind::Spy)
                .count()
        };
        assert_eq!(spies(&mine), 1);
        assert_eq!(spies(&theirs), 0);
    }

    #[test]
    fn espionage_is_seen_by_target_only_on_capture() {
        let (_, a, b) = game();
        let met = BTreeSet::from([a, b]);
        let event = |outcome| {
            GameEvent::new(
                1,
                GameEventKind::Espionage {
                    actor: a,
                    target: b,
                    mission: MissionKind::GatherIntel,
                    outcome,
                    detail: String::new(),
                },
            )
        };
        assert!(can_see_event(&event(EspionageOutcome::Succeeded), a, &met));
        assert!(!can_see_event(&event(EspionageOutcome::Succeeded), b, &met));
        assert!(!can_see_event(&event(EspionageOutcome::Failed), b, &met));
        assert!(can_see_event(&event(EspionageOutcome::Captured), b, &met));
    }

    #[test]
    fn secret_betrayal_stays_between_parties() {
        let (_, a, b) = game();
        let c = CivId::new();
        let met = BTreeSet::from([a, b]);
        let betrayal = |secret| {
            GameEvent::new(
                4,
                GameEventKind::Betrayal {
                    betrayer: a,
                    victim: b,
                    agreement: None,
                    secret,
                },
            )
        };
        assert!(can_see_event(&betrayal(true), a, &met));
        assert!(can_see_event(&betrayal(true), b, &met));
        assert!(!can_see_event(&betrayal(true), c, &met));
        assert!(can_see_event(&betrayal(false), c, &met));
    }

    #[test]
    fn broadcasts_need_contact() {
        let (mut state, a, b) = game();
        state.turn = 2;
        state.messages.push(Message {
            id: realpolitik_types::MessageId::new(),
            turn: 2,
            from: a,
            to: None,
            content: "hello world".into(),
        });
        assert!(view(&state, b).received_communications.is_empty());
        state.ensure_contact(a, b);
        assert_eq!(view(&state, b).received_communications.len(), 1);
        // Senders never receive their own broadcast.
        assert!(view(&state, a).received_communications.is_empty());
    }

    #[test]
    fn war_shows_up_as_threat() {
        let (mut state, a, b) = game();
        state.declare_war(b, a, "border dispute");
        let v = view(&state, a);
        assert!(v.threats.iter().any(|t| t.starts_with("At war with")));
        assert!(v.recent_events.len() >= 2);
    }
}
