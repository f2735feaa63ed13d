//! Spies, mission assignment, and disinformation campaigns.

use realpolitik_agents::{AgentError, disinformation, espionage};
use realpolitik_types::{CivId, GameEventKind, MissionKind, UnitKind, normalize_label};
use realpolitik_world::unit_spec;

use super::development::{pay, require_tech, settlement_for};
use super::{CommandError, resolve_met, resolve_other};
use crate::setup::make_unit;
use crate::state::GameState;

/// Spy references that mean "whichever spy is free".
const ANY_SPY: &[&str] = &["any", "spy", "a_spy", "my_spy", "idle"];

/// Map the loose mission names agents use onto a mission kind.
pub fn parse_mission(raw: &str) -> Result<MissionKind, CommandError> {
    let label = normalize_label(raw);
    let kind = match label.as_str() {
        "intel" | "gather" | "gather_intelligence" | "reconnaissance" | "scout" => {
            MissionKind::GatherIntel
        }
        "steal" | "steal_tech" | "theft" => MissionKind::StealTechnology,
        "disinformation" | "spread_rumors" | "rumors" => MissionKind::SpreadDisinformation,
        _ => label.parse()?,
    };
    Ok(kind)
}

/// Train a spy in a settlement, optionally under a cover identity.
pub fn create_spy(
    state: &mut GameState,
    civ: CivId,
    settlement: Option<&str>,
    disguise: Option<&str>,
) -> Result<String, CommandError> {
    let sid = settlement_for(state, civ, settlement)?;
    let spec = unit_spec(UnitKind::Spy);
    require_tech(state, civ, UnitKind::Spy, spec.requires)?;
    pay(state, civ, UnitKind::Spy, &spec.cost())?;

    let (position, name) = state
        .settlements
        .get(&sid)
        .map(|s| (s.position, s.name.clone()))
        .ok_or_else(|| CommandError::UnknownSettlement(sid.to_string()))?;
    let mut spy = make_unit(civ, UnitKind::Spy, position, 0);
    spy.disguise = disguise
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_owned);
    let id = spy.id;
    state.units.insert(id, spy);
    state.refresh_unit_counts();
    state.log(GameEventKind::UnitCreated {
        civ,
        unit: id,
        kind: UnitKind::Spy,
    });
    Ok(format!("recruited a spy in {name}"))
}

/// Put a spy on a mission against a met civ.
pub fn assign(
    state: &mut GameState,
    civ: CivId,
    spy_ref: &str,
    mission: &str,
    target: &str,
    duration: Option<u32>,
    subject: Option<&str>,
) -> Result<(String, CivId), CommandError> {
    let kind = parse_mission(mission)?;
    let target = resolve_met(state, civ, target)?;
    let subject = subject.map(|s| resolve_other(state, civ, s)).transpose()?;

    let spy_id = if ANY_SPY.contains(&normalize_label(spy_ref).as_str()) {
        state
            .units_of(civ)
            .into_iter()
            .find(|u| u.is_idle_spy())
            .map(|u| u.id)
            .ok_or(CommandError::NoIdleSpy)?
    } else {
        state
            .resolve_unit(civ, spy_ref)
            .ok_or_else(|| CommandError::UnknownUnit(spy_ref.to_owned()))?
    };
    let turn = state.turn;
    let spy = state
        .units
        .get_mut(&spy_id)
        .ok_or_else(|| CommandError::UnknownUnit(spy_ref.to_owned()))?;
    espionage::assign_mission(spy, kind, target, subject, duration, turn)?;
    let name = state.civ_name(target);
    Ok((format!("sent a spy to {kind} against {name}"), target))
}

/// Launch a disinformation campaign: the target immediately believes the
/// claim about the subject.
pub fn disinform(
    state: &mut GameState,
    civ: CivId,
    target: &str,
    subject: &str,
    claim: Option<&str>,
) -> Result<(String, CivId), CommandError> {
    let target = resolve_met(state, civ, target)?;
    let subject = resolve_other(state, civ, subject)?;
    if subject == target {
        return Err(AgentError::SelfTarget(target).into());
    }
    let claim = claim
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map_or_else(|| disinformation::default_claim(&state.civ_name(subject)), str::to_owned);
    let turn = state.turn;
    let (actor, victim) = state
        .civ_pair_mut(civ, target)
        .ok_or_else(|| CommandError::UnknownCiv(target.to_string()))?;
    let campaign = disinformation::launch(actor, target, subject, &claim, turn)?;
    disinformation::plant(victim, &campaign, turn);
    state.log(GameEventKind::DisinformationLaunched {
        actor: civ,
        target,
        subject,
        campaign: campaign.id,
    });
    let name = state.civ_name(target);
    Ok((format!("spread disinformation to {name}: {claim}"), target))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use realpolitik_agents::TechTree;
    use realpolitik_types::{Civilization, ResourceKind};

    use super::*;
    use crate::config::GameConfig;
    use crate::setup;

    fn three() -> (GameState, CivId, CivId, CivId) {
        let config = GameConfig {
            map_width: 12,
            map_height: 12,
            civilizations: 3,
            ..GameConfig::default()
        };
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(9);
        let mut state = setup::build(&config, &TechTree::new(), &mut rng).unwrap();
        let ids: Vec<CivId> = state.civs.iter().map(|c: &Civilization| c.id).collect();
        for c in &mut state.civs {
            c.technologies.insert("writing".into());
            c.resources.set(ResourceKind::Gold, 100);
            c.resources.set(ResourceKind::Production, 100);
        }
        (state, ids[0], ids[1], ids[2])
    }

    #[test]
    fn mission_aliases() {
        assert_eq!(parse_mission("intel").unwrap(), MissionKind::GatherIntel);
        assert_eq!(parse_mission("Steal Technology").unwrap(), MissionKind::StealTechnology);
        assert!(parse_mission("assassinate").is_err());
    }

    #[test]
    fn spies_need_writing() {
        let (mut state, a, _, _) = three();
        state.civ_mut(a).unwrap().technologies.remove("writing");
        assert!(matches!(
            create_spy(&mut state, a, None, None).unwrap_err(),
            CommandError::MissingTechnology { .. }
        ));
    }

    #[test]
    fn any_spy_picks_an_idle_one() {
        let (mut state, a, b, _) = three();
        create_spy(&mut state, a, None, Some("merchant")).unwrap();
        let name_b = state.civ_name(b);
        // Not met yet.
        assert!(matches!(
            assign(&mut state, a, "any", "intel", &name_b, None, None).unwrap_err(),
            CommandError::NotMet(_)
        ));
        state.ensure_contact(a, b);
        let (_, target) = assign(&mut state, a, "any", "intel", &name_b, Some(1), None).unwrap();
        assert_eq!(target, b);
        let spy = state.units_of(a).into_iter().find(|u| u.covert).unwrap();
        assert_eq!(spy.disguise.as_deref(), Some("merchant"));
        assert_eq!(spy.mission.as_ref().unwrap().duration, 1);
        assert!(matches!(
            assign(&mut state, a, "any", "intel", &name_b, None, None).unwrap_err(),
            CommandError::NoIdleSpy
        ));
    }

    #[test]
    fn disinformation_plants_belief() {
        let (mut state, a, b, c) = three();
        state.ensure_contact(a, b);
        let (name_b, name_c) = (state.civ_name(b), state.civ_name(c));
        disinform(&mut state, a, &name_b, &name_c, None).unwrap();
        let victim = state.civ(b).unwrap();
        assert_eq!(victim.intel.get(&c).unwrap().len(), 1);
        assert!((victim.reputation_of(c) - 45.0).abs() < f64::EPSILON);
        assert_eq!(state.civ(a).unwrap().disinformation.len(), 1);
        assert!(matches!(
            disinform(&mut state, a, &name_b, &name_b, None).unwrap_err(),
            CommandError::Agent(AgentError::SelfTarget(_))
        ));
    }
}
