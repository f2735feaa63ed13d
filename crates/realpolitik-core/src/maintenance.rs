//! End-of-turn maintenance passes.
//!
//! Passes run in a fixed order after every civilization has acted:
//!
//! 1. Battle resolution
//! 2. Population growth
//! 3. Intelligence aging and espionage progression
//! 4. Disinformation expiry
//! 5. Reputation decay
//! 6. Secret-agreement consistency sweep
//! 7. First-contact detection
//! 8. Reflection memories (every [`REFLECTION_INTERVAL`] turns)
//! 9. Observation memories for this turn's events
//!
//! Analytics snapshots run after these in the turn scheduler, which owns
//! the behavior observer. Random events are rolled at turn start.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use realpolitik_agents::espionage::{self, Resolution};
use realpolitik_agents::reputation::{self, SPY_CAPTURE_PENALTY};
use realpolitik_agents::{TechTree, diplomacy, disinformation};
use realpolitik_types::{
    BuildingKind, CivId, DiplomaticStatus, EspionageOutcome, GameEvent, GameEventKind,
    MemoryEntry, MemoryPayload, MemoryType, Mission, MissionKind, Position,
    RandomEventKind, ResourceKind, SabotageKind, UnitId,
};
use tracing::{debug, info};

use crate::economy;
use crate::state::GameState;
use crate::view::can_see_event;

/// Share of the opposing side's strength dealt as damage to each unit.
pub const BATTLE_DAMAGE_FACTOR: f64 = 0.5;

/// Damage multiplier for defenders on their own walled settlement.
pub const WALLS_DAMAGE_FACTOR: f64 = 0.5;

/// Turns between reflection memories.
pub const REFLECTION_INTERVAL: u64 = 10;

/// Per-civ, per-turn chance of a random event.
pub const RANDOM_EVENT_CHANCE: f64 = 0.05;

/// What one maintenance run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Battles fought.
    pub battles: u32,
    /// Settlements that grew.
    pub grown: u32,
    /// Missions resolved.
    pub missions_resolved: u32,
    /// Campaigns that expired.
    pub campaigns_expired: u32,
    /// Reputation ratings nudged toward neutral.
    pub reputations_decayed: u32,
    /// Secret agreements found broken by the sweep.
    pub secret_divergences: u32,
    /// New first contacts.
    pub contacts: u32,
}

/// Run every maintenance pass for the current turn.
pub fn run<R: Rng + ?Sized>(state: &mut GameState, tree: &TechTree, rng: &mut R) -> MaintenanceReport {
    let turn = state.turn;
    let mut report = MaintenanceReport {
        battles: resolve_battles(state),
        grown: economy::grow_population(state),
        missions_resolved: progress_espionage(state, rng),
        campaigns_expired: expire_disinformation(state),
        ..MaintenanceReport::default()
    };
    report.reputations_decayed =
        u32::try_from(reputation::decay_toward_neutral(&mut state.civs, turn)).unwrap_or(u32::MAX);
    report.secret_divergences = sweep_secret_agreements(state);
    report.contacts = detect_first_contact(state);
    if turn > 0 && turn.checked_rem(REFLECTION_INTERVAL) == Some(0) {
        write_reflections(state, tree);
    }
    record_observations(state);
    debug!(turn, ?report, "Maintenance complete");
    report
}

// ---------------------------------------------------------------------------
// Battles
// ---------------------------------------------------------------------------

/// Resolve every tile holding non-covert units of more than one owner.
///
/// Each unit takes [`BATTLE_DAMAGE_FACTOR`] times the summed pre-battle
/// strength of the other owners' units on the tile (halved again for a
/// defender inside its own walls). Units at zero strength or below are
/// removed; survivors gain one experience. Owners not yet at war are put
/// at war, the last civ to move onto the tile counting as aggressor. A
/// settlement left holding only hostile units loses one population.
pub fn resolve_battles(state: &mut GameState) -> u32 {
    let mut tiles: BTreeMap<Position, Vec<UnitId>> = BTreeMap::new();
    for unit in state.units.values().filter(|u| !u.covert) {
        tiles.entry(unit.position).or_default().push(unit.id);
    }

    let mut battles = 0_u32;
    for (position, ids) in tiles {
        let mut strength_by_owner: BTreeMap<CivId, f64> = BTreeMap::new();
        for unit in ids.iter().filter_map(|id| state.units.get(id)) {
            *strength_by_owner.entry(unit.owner).or_insert(0.0) += unit.strength;
        }
        if strength_by_owner.len() < 2 {
            continue;
        }
        let total: f64 = strength_by_owner.values().sum();
        let settlement = state
            .settlement_at(position)
            .map(|s| (s.id, s.owner, s.buildings.contains(&BuildingKind::Walls)));

        let mut lost = 0_u32;
        for id in &ids {
            let Some(unit) = state.units.get_mut(id) else {
                continue;
            };
            let own = strength_by_owner.get(&unit.owner).copied().unwrap_or(0.0);
            let mut damage = BATTLE_DAMAGE_FACTOR * (total - own);
            if settlement.is_some_and(|(_, owner, walls)| walls && owner == unit.owner) {
                damage *= WALLS_DAMAGE_FACTOR;
            }
            unit.strength -= damage;
            if unit.strength <= 0.0 {
                state.units.remove(id);
                lost = lost.saturating_add(1);
            } else {
                unit.experience = unit.experience.saturating_add(1);
            }
        }

        let mut sides: Vec<CivId> = strength_by_owner.keys().copied().collect();
        sides.sort_by_key(|c| state.civ(*c).map_or(u32::MAX, |civ| civ.order));
        let attacker = state.arrivals.get(&position).copied();
        for (i, &a) in sides.iter().enumerate() {
            for &b in sides.iter().skip(i.saturating_add(1)) {
                let (aggressor, target) = if attacker == Some(b) { (b, a) } else { (a, b) };
                if state.declare_war(aggressor, target, format!("battle at {position}"))
                    && let Some(c) = state.civ_mut(target)
                {
                    c.adjust_reputation(aggressor, -reputation::WAR_DECLARATION_PENALTY);
                }
            }
        }
        state.log(GameEventKind::Battle {
            position,
            attacker,
            sides: sides.clone(),
            units_lost: lost,
        });
        info!(%position, sides = sides.len(), units_lost = lost, "Battle resolved");

        if let Some((sid, owner, _)) = settlement {
            let remaining: Vec<CivId> = state
                .units_at(position)
                .iter()
                .filter(|u| !u.covert)
                .map(|u| u.owner)
                .collect();
            if !remaining.is_empty()
                && remaining.iter().all(|o| *o != owner)
                && let Some(s) = state.settlements.get_mut(&sid)
            {
                s.reduce_population(1);
            }
        }
        battles = battles.saturating_add(1);
    }
    state.refresh_unit_counts();
    battles
}

// ---------------------------------------------------------------------------
// Espionage
// ---------------------------------------------------------------------------

/// Age every intel record, then advance and resolve pending missions.
pub fn progress_espionage<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> u32 {
    for civ in &mut state.civs {
        for records in civ.intel.values_mut() {
            espionage::age_intel(records);
        }
    }

    let due: Vec<UnitId> = state
        .units
        .values_mut()
        .filter_map(|u| {
            let mission = u.mission.as_mut()?;
            espionage::advance(mission).then_some(u.id)
        })
        .collect();

    let mut resolved = 0_u32;
    for id in due {
        let Some((owner, experience, mission)) = state
            .units
            .get(&id)
            .and_then(|u| u.mission.clone().map(|m| (u.owner, u.experience, m)))
        else {
            continue;
        };
        let resolution = espionage::resolve(&mission, experience, rng);
        let (outcome, detail) = match resolution {
            Resolution::Success => {
                let detail = mission_success(state, owner, &mission, rng);
                if let Some(spy) = state.units.get_mut(&id) {
                    spy.experience = spy.experience.saturating_add(1);
                    if let Some(m) = spy.mission.as_mut() {
                        espionage::conclude(m, resolution);
                    }
                }
                (EspionageOutcome::Succeeded, detail)
            }
            Resolution::Failure => {
                if let Some(m) = state.units.get_mut(&id).and_then(|s| s.mission.as_mut()) {
                    espionage::conclude(m, resolution);
                }
                (EspionageOutcome::Failed, "the spy returned empty-handed".to_owned())
            }
            Resolution::Captured => {
                state.units.remove(&id);
                if let Some(target) = state.civ_mut(mission.target) {
                    target.adjust_reputation(owner, -SPY_CAPTURE_PENALTY);
                }
                (EspionageOutcome::Captured, "the spy was captured".to_owned())
            }
        };
        info!(actor = %owner, target = %mission.target, mission = %mission.kind, ?outcome, "Mission resolved");
        state.log(GameEventKind::Espionage {
            actor: owner,
            target: mission.target,
            mission: mission.kind,
            outcome,
            detail,
        });
        if outcome == EspionageOutcome::Captured {
            state.declare_war(mission.target, owner, "captured a spy");
        }
        resolved = resolved.saturating_add(1);
    }
    if resolved > 0 {
        state.refresh_unit_counts();
    }
    resolved
}

/// Apply a successful mission. Returns a short description.
fn mission_success<R: Rng + ?Sized>(
    state: &mut GameState,
    actor: CivId,
    mission: &Mission,
    rng: &mut R,
) -> String {
    let turn = state.turn;
    let target = mission.target;
    match mission.kind {
        MissionKind::GatherIntel => {
            let profile = state.target_profile(target);
            let record = espionage::gather_intel(&profile, turn, rng);
            if let Some(c) = state.civ_mut(actor) {
                c.intel.entry(target).or_default().push(record);
            }
            "gathered intelligence".to_owned()
        }
        MissionKind::StealTechnology => {
            let known = |c: CivId| -> Vec<String> {
                state
                    .civ(c)
                    .map(|civ| civ.technologies.iter().cloned().collect())
                    .unwrap_or_default()
            };
            let (ours, theirs) = (known(actor), known(target));
            let candidates = espionage::stealable(&ours, &theirs);
            if candidates.is_empty() {
                return "found nothing worth stealing".to_owned();
            }
            let pick = rng.random_range(0..candidates.len());
            let Some(technology) = candidates.get(pick).map(|t| (*t).clone()) else {
                return "found nothing worth stealing".to_owned();
            };
            if let Some(c) = state.civ_mut(actor) {
                c.technologies.insert(technology.clone());
                if c.current_research.as_deref() == Some(technology.as_str()) {
                    c.current_research = None;
                    c.research_progress = 0;
                }
            }
            state.log(GameEventKind::TechnologyDiscovered {
                civ: actor,
                technology: technology.clone(),
                stolen: true,
            });
            format!("stole {technology}")
        }
        MissionKind::Sabotage => sabotage(state, target, espionage::choose_sabotage(rng)),
        MissionKind::SpreadDisinformation => {
            let Some(subject) = mission.subject else {
                return "had no subject to slander".to_owned();
            };
            let claim = disinformation::default_claim(&state.civ_name(subject));
            let Some((own, victim)) = state.civ_pair_mut(actor, target) else {
                return "lost contact with the target".to_owned();
            };
            match disinformation::launch(own, target, subject, &claim, turn) {
                Ok(campaign) => {
                    disinformation::plant(victim, &campaign, turn);
                    state.log(GameEventKind::DisinformationLaunched {
                        actor,
                        target,
                        subject,
                        campaign: campaign.id,
                    });
                    format!("planted a rumor: {claim}")
                }
                Err(e) => format!("could not plant a rumor: {e}"),
            }
        }
    }
}

fn sabotage(state: &mut GameState, target: CivId, kind: SabotageKind) -> String {
    match kind {
        SabotageKind::ResearchSetback => {
            if let Some(c) = state.civ_mut(target) {
                c.research_progress /= 2;
            }
            "set back research".to_owned()
        }
        SabotageKind::BuildingDestruction => {
            let hit = state
                .settlements_of(target)
                .iter()
                .find_map(|s| s.buildings.iter().next_back().map(|b| (s.id, *b)));
            match hit {
                Some((sid, building)) => {
                    if let Some(s) = state.settlements.get_mut(&sid) {
                        s.buildings.remove(&building);
                    }
                    format!("destroyed a {building}")
                }
                None => sabotage(state, target, SabotageKind::ResourceDestruction),
            }
        }
        SabotageKind::ResourceDestruction => {
            if let Some(c) = state.civ_mut(target) {
                let production = c.resources.get(ResourceKind::Production);
                c.resources.debit(ResourceKind::Production, production / 2);
            }
            "destroyed stockpiles".to_owned()
        }
    }
}

// ---------------------------------------------------------------------------
// Disinformation, agreements, contact
// ---------------------------------------------------------------------------

/// Count campaigns down; withdraw the planted beliefs of expired ones.
pub fn expire_disinformation(state: &mut GameState) -> u32 {
    let mut expired = Vec::new();
    for civ in &mut state.civs {
        for campaign in disinformation::tick(civ) {
            expired.push((civ.id, campaign));
        }
    }
    let count = u32::try_from(expired.len()).unwrap_or(u32::MAX);
    for (actor, campaign) in expired {
        if let Some(target) = state.civ_mut(campaign.target) {
            disinformation::withdraw(target, campaign.id);
        }
        state.log(GameEventKind::DisinformationExpired {
            actor,
            target: campaign.target,
            campaign: campaign.id,
        });
    }
    count
}

/// Run the secret-agreement sweep and log one betrayal per divergence.
pub fn sweep_secret_agreements(state: &mut GameState) -> u32 {
    let found = diplomacy::sweep_secret_agreements(&mut state.civs);
    let count = u32::try_from(found.len()).unwrap_or(u32::MAX);
    for (divergence, event) in found {
        info!(holder = %divergence.holder, partner = %divergence.partner, "Secret agreement betrayed");
        state.log(event);
    }
    count
}

/// Log first contact for every unmet pair where one side can see a
/// settlement or non-covert unit of the other.
pub fn detect_first_contact(state: &mut GameState) -> u32 {
    let mut presence: BTreeMap<CivId, BTreeSet<Position>> = BTreeMap::new();
    for s in state.settlements.values() {
        presence.entry(s.owner).or_default().insert(s.position);
    }
    for u in state.units.values().filter(|u| !u.covert) {
        presence.entry(u.owner).or_default().insert(u.position);
    }

    let ids = state.civ_ids();
    let mut contacts = 0_u32;
    for (i, &a) in ids.iter().enumerate() {
        for &b in ids.iter().skip(i.saturating_add(1)) {
            if state.has_met(a, b) {
                continue;
            }
            let sees = |viewer: CivId, owner: CivId| {
                presence
                    .get(&owner)
                    .is_some_and(|tiles| tiles.iter().any(|p| state.fog.is_visible(viewer, *p)))
            };
            if (sees(a, b) || sees(b, a)) && state.ensure_contact(a, b) {
                info!(a = %a, b = %b, "First contact");
                contacts = contacts.saturating_add(1);
            }
        }
    }
    contacts
}

// ---------------------------------------------------------------------------
// Memories
// ---------------------------------------------------------------------------

fn write_reflections(state: &mut GameState, tree: &TechTree) {
    let turn = state.turn;
    for civ in state.civ_ids() {
        let Some(c) = state.civ(civ) else {
            continue;
        };
        let mut wars = Vec::new();
        let mut allies = Vec::new();
        for other in state.met_civs(civ) {
            match state.status(civ, other) {
                DiplomaticStatus::War => wars.push(state.civ_name(other)),
                DiplomaticStatus::Allied => allies.push(state.civ_name(other)),
                DiplomaticStatus::Neutral | DiplomaticStatus::Unknown => {}
            }
        }
        let mut text = format!(
            "Turn {turn} reflection: {} settlements, population {}, {} of {} technologies, {} units, {}.",
            state.settlements_of(civ).len(),
            state.population(civ),
            c.technologies.len(),
            tree.names().count(),
            state.units_of(civ).len(),
            c.resources,
        );
        if !wars.is_empty() {
            text.push_str(&format!(" At war with {}.", wars.join(", ")));
        }
        if !allies.is_empty() {
            text.push_str(&format!(" Allied with {}.", allies.join(", ")));
        }
        state
            .memory
            .remember(MemoryEntry::note(civ, MemoryType::Reflection, turn, 0.7, text));
    }
}

const fn observation_importance(kind: &GameEventKind) -> f64 {
    match kind {
        GameEventKind::DeclarationOfWar { .. } | GameEventKind::Betrayal { .. } => 0.9,
        GameEventKind::Battle { .. }
        | GameEventKind::AllianceBroken { .. }
        | GameEventKind::Espionage { .. } => 0.8,
        GameEventKind::FirstContact { .. }
        | GameEventKind::AllianceFormed { .. }
        | GameEventKind::PeaceTreaty { .. }
        | GameEventKind::AgreementBroken { .. } => 0.7,
        _ => 0.5,
    }
}

/// Plain-language description of an event.
pub fn describe(state: &GameState, kind: &GameEventKind) -> String {
    let n = |c: &CivId| state.civ_name(*c);
    match kind {
        GameEventKind::DeclarationOfWar {
            aggressor,
            target,
            reason,
        } => format!("{} declared war on {} ({reason})", n(aggressor), n(target)),
        GameEventKind::PeaceTreaty { a, b } => format!("{} and {} made peace", n(a), n(b)),
        GameEventKind::AllianceFormed { a, b } => format!("{} and {} formed an alliance", n(a), n(b)),
        GameEventKind::AllianceBroken { breaker, other } => {
            format!("{} broke its alliance with {}", n(breaker), n(other))
        }
        GameEventKind::FirstContact { a, b } => format!("{} and {} made contact", n(a), n(b)),
        GameEventKind::Espionage {
            actor,
            target,
            mission,
            outcome,
            detail,
        } => format!(
            "{} ran a {mission} mission against {}: {outcome:?}, {detail}",
            n(actor),
            n(target)
        ),
        GameEventKind::RandomEvent { description, .. } => description.clone(),
        GameEventKind::Betrayal {
            betrayer, victim, ..
        } => format!("{} betrayed {}", n(betrayer), n(victim)),
        GameEventKind::Battle {
            position,
            sides,
            units_lost,
            ..
        } => format!(
            "Battle at {position} between {} ({units_lost} units lost)",
            sides.iter().map(n).collect::<Vec<_>>().join(", ")
        ),
        GameEventKind::SettlementFounded { civ, position, .. } => {
            format!("{} founded a settlement at {position}", n(civ))
        }
        GameEventKind::TechnologyDiscovered {
            civ,
            technology,
            stolen,
        } => {
            let how = if *stolen { "stole" } else { "discovered" };
            format!("{} {how} {technology}", n(civ))
        }
        GameEventKind::UnitCreated { civ, kind, .. } => format!("{} trained a {kind}", n(civ)),
        GameEventKind::AgreementCreated { a, b, kind, .. } => {
            format!("{} and {} signed a {kind} agreement", n(a), n(b))
        }
        GameEventKind::AgreementBroken { breaker, other, .. } => {
            format!("{} broke an agreement with {}", n(breaker), n(other))
        }
        GameEventKind::DisinformationLaunched {
            target, subject, ..
        } => format!("Rumors about {} spread to {}", n(subject), n(target)),
        GameEventKind::DisinformationExpired { target, .. } => {
            format!("A campaign against {} ran its course", n(target))
        }
    }
}

/// Give each participant an observation memory for this turn's events.
fn record_observations(state: &mut GameState) {
    let turn = state.turn;
    let events: Vec<GameEvent> = state
        .events
        .iter()
        .filter(|e| e.turn == turn)
        .cloned()
        .collect();
    for event in events {
        let parties = event.kind.parties();
        let text = describe(state, &event.kind);
        for civ in state.civ_ids() {
            let met = state.met_civs(civ);
            if !event.kind.involves(civ) || !can_see_event(&event, civ, &met) {
                continue;
            }
            state.memory.remember(MemoryEntry::new(
                civ,
                MemoryType::Observation,
                turn,
                observation_importance(&event.kind),
                text.clone(),
                MemoryPayload::Observation {
                    event: event.id,
                    parties: parties.clone(),
                },
                None,
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Random events
// ---------------------------------------------------------------------------

/// Roll a random event for each civ.
pub fn roll_random_events<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> u32 {
    let mut fired = 0_u32;
    for civ in state.civ_ids() {
        if rng.random::<f64>() >= RANDOM_EVENT_CHANCE {
            continue;
        }
        let event = match rng.random_range(0..4_u32) {
            0 => RandomEventKind::Plague,
            1 => RandomEventKind::BountifulHarvest,
            2 => RandomEventKind::GoldDiscovery,
            _ => RandomEventKind::Earthquake,
        };
        let description = apply_random_event(state, civ, event);
        info!(%civ, ?event, "Random event");
        state.log(GameEventKind::RandomEvent {
            civ,
            event,
            description,
        });
        fired = fired.saturating_add(1);
    }
    fired
}

/// Apply one random event to `civ`. Returns its description.
pub fn apply_random_event(state: &mut GameState, civ: CivId, event: RandomEventKind) -> String {
    let name = state.civ_name(civ);
    let capital = state.resolve_settlement(civ, None);
    match event {
        RandomEventKind::Plague => {
            if let Some(s) = capital.and_then(|id| state.settlements.get_mut(&id)) {
                s.reduce_population(1);
            }
            format!("Plague struck {name}")
        }
        RandomEventKind::BountifulHarvest => {
            if let Some(c) = state.civ_mut(civ) {
                c.resources.credit(ResourceKind::Food, 10);
            }
            format!("{name} enjoyed a bountiful harvest")
        }
        RandomEventKind::GoldDiscovery => {
            if let Some(c) = state.civ_mut(civ) {
                c.resources.credit(ResourceKind::Gold, 15);
            }
            format!("{name} discovered a gold vein")
        }
        RandomEventKind::Earthquake => {
            let lost = capital
                .and_then(|id| state.settlements.get_mut(&id))
                .and_then(|s| s.buildings.pop_last());
            if let Some(building) = lost {
                format!("An earthquake destroyed {name}'s {building}")
            } else {
                if let Some(c) = state.civ_mut(civ) {
                    c.resources.debit(ResourceKind::Production, 10);
                }
                format!("An earthquake shook {name}")
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use realpolitik_types::{AgreementKind, MissionStatus, UnitKind};

    use super::*;
    use crate::config::GameConfig;
    use crate::setup::{self, make_unit};

    /// Always returns `self.0`; `u64::MAX` makes every roll succeed.
    struct FixedRng(u64);

    impl rand::RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            u32::try_from(self.0 >> 32).unwrap()
        }
        fn next_u64(&mut self) -> u64 {
            self.0
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn game() -> (GameState, CivId, CivId) {
        let config = GameConfig {
            map_width: 8,
            map_height: 8,
            civilizations: 2,
            ..GameConfig::default()
        };
        let state = setup::build(&config, &TechTree::new(), &mut StdRng::seed_from_u64(4)).unwrap();
        let (a, b) = (state.civs[0].id, state.civs[1].id);
        (state, a, b)
    }

    #[test]
    fn battle_deals_symmetric_damage_and_declares_war() {
        let (mut state, a, b) = game();
        state.turn = 3;
        let field = Position::new(4, 1);
        let mut ids = Vec::new();
        for owner in [a, b] {
            let u = make_unit(owner, UnitKind::Warrior, field, 0);
            ids.push(u.id);
            state.units.insert(u.id, u);
        }
        state.arrivals.insert(field, b);
        assert_eq!(resolve_battles(&mut state), 1);
        // 10 - 0.5 * 10 on both sides.
        for id in &ids {
            let u = state.units.get(id).unwrap();
            assert!((u.strength - 5.0).abs() < f64::EPSILON);
            assert_eq!(u.experience, 1);
        }
        assert_eq!(state.status(a, b), DiplomaticStatus::War);
        let aggressor = state.events.iter().find_map(|e| match e.kind {
            GameEventKind::DeclarationOfWar { aggressor, .. } => Some(aggressor),
            _ => None,
        });
        assert_eq!(aggressor, Some(b));
    }

    #[test]
    fn overwhelmed_units_die_and_settlement_shrinks() {
        let (mut state, a, b) = game();
        let capital = state.resolve_settlement(a, None).unwrap();
        let pos = state.settlements.get(&capital).unwrap().position;
        state.settlements.get_mut(&capital).unwrap().population = 3;
        // a's settler (1) and warrior (10) face three warriors (30).
        for _ in 0..3 {
            let u = make_unit(b, UnitKind::Warrior, pos, 0);
            state.units.insert(u.id, u);
        }
        resolve_battles(&mut state);
        assert!(state.units_of(a).is_empty());
        assert_eq!(state.units_of(b).len(), 3);
        assert_eq!(state.settlements.get(&capital).unwrap().population, 2);
    }

    #[test]
    fn covert_units_never_fight() {
        let (mut state, a, b) = game();
        let pos = state.settlements_of(b)[0].position;
        let spy = make_unit(a, UnitKind::Spy, pos, 0);
        state.units.insert(spy.id, spy);
        assert_eq!(resolve_battles(&mut state), 0);
    }

    #[test]
    fn forced_success_gathers_one_intel_record() {
        let (mut state, a, b) = game();
        state.ensure_contact(a, b);
        let mut spy = make_unit(a, UnitKind::Spy, Position::new(1, 1), 0);
        espionage::assign_mission(&mut spy, MissionKind::GatherIntel, b, None, Some(1), 0).unwrap();
        let id = spy.id;
        state.units.insert(id, spy);
        let resolved = progress_espionage(&mut state, &mut FixedRng(u64::MAX));
        assert_eq!(resolved, 1);
        let intel = state.civ(a).unwrap().intel.get(&b).unwrap();
        assert_eq!(intel.len(), 1);
        assert!((0.7..=0.95).contains(&intel[0].accuracy));
        let spy = state.units.get(&id).unwrap();
        assert_eq!(spy.mission.as_ref().unwrap().status, MissionStatus::Succeeded);
        assert!(spy.is_idle_spy());
        assert_eq!(spy.experience, 1);
    }

    #[test]
    fn captured_spy_triggers_war() {
        let (mut state, a, b) = game();
        state.ensure_contact(a, b);
        let mut spy = make_unit(a, UnitKind::Spy, Position::new(1, 1), 0);
        espionage::assign_mission(&mut spy, MissionKind::Sabotage, b, None, Some(1), 0).unwrap();
        let id = spy.id;
        state.units.insert(id, spy);
        // Roll 0 fails the mission and the capture check.
        progress_espionage(&mut state, &mut FixedRng(0));
        assert!(!state.units.contains_key(&id));
        assert_eq!(state.status(a, b), DiplomaticStatus::War);
        assert!((state.civ(b).unwrap().reputation_of(a) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn expired_campaigns_withdraw_beliefs() {
        let (mut state, a, b) = game();
        let (actor, victim) = state.civ_pair_mut(a, b).unwrap();
        // Subject must differ from target, so use a throwaway id.
        let subject = CivId::new();
        let campaign = disinformation::launch(actor, b, subject, "lies", 0).unwrap();
        disinformation::plant(victim, &campaign, 0);
        for _ in 0..disinformation::DEFAULT_CAMPAIGN_TURNS.saturating_sub(1) {
            assert_eq!(expire_disinformation(&mut state), 0);
        }
        assert_eq!(expire_disinformation(&mut state), 1);
        assert!(!state.civ(b).unwrap().intel.contains_key(&subject));
        assert!(matches!(
            state.events.last().unwrap().kind,
            GameEventKind::DisinformationExpired { .. }
        ));
    }

    #[test]
    fn sweep_logs_a_single_betrayal() {
        let (mut state, a, b) = game();
        let (x, y) = state.civ_pair_mut(a, b).unwrap();
        let (id, _) = diplomacy::sign_agreement(x, y, AgreementKind::Trade, "", true, 0);
        y.secret_agreements.remove(&id);
        assert_eq!(sweep_secret_agreements(&mut state), 1);
        assert_eq!(sweep_secret_agreements(&mut state), 0);
        assert_eq!(state.events.len(), 1);
        assert!(state.civ(a).unwrap().secret_agreements.get(&id).unwrap().broken);
    }

    #[test]
    fn contact_when_a_unit_is_seen() {
        let (mut state, a, b) = game();
        assert_eq!(detect_first_contact(&mut state), 0);
        let scout = make_unit(b, UnitKind::Scout, Position::new(2, 2), 0);
        state.units.insert(scout.id, scout);
        assert_eq!(detect_first_contact(&mut state), 1);
        assert!(state.has_met(a, b));
    }

    #[test]
    fn reflections_every_tenth_turn() {
        let (mut state, a, _) = game();
        state.turn = 10;
        run(&mut state, &TechTree::new(), &mut StdRng::seed_from_u64(1));
        let store = state.memory.store(a).unwrap();
        assert_eq!(store.of_type(MemoryType::Reflection).len(), 1);
    }

    #[test]
    fn random_events_adjust_ledgers() {
        let (mut state, a, _) = game();
        let before = state.civ(a).unwrap().resources.get(ResourceKind::Gold);
        apply_random_event(&mut state, a, RandomEventKind::GoldDiscovery);
        assert_eq!(
            state.civ(a).unwrap().resources.get(ResourceKind::Gold),
            before + 15
        );
        let capital = state.resolve_settlement(a, None).unwrap();
        state
            .settlements
            .get_mut(&capital)
            .unwrap()
            .buildings
            .insert(BuildingKind::Granary);
        apply_random_event(&mut state, a, RandomEventKind::Earthquake);
        assert!(state.settlements.get(&capital).unwrap().buildings.is_empty());
    }
}
