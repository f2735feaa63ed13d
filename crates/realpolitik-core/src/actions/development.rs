//! Movement, research, construction, settling, and training.

use std::collections::BTreeSet;

use realpolitik_agents::{AgentError, TechTree};
use realpolitik_types::{
    BuildingKind, CivId, GameEventKind, Improvement, Position, Resources, Settlement,
    SettlementId, UnitKind,
};
use realpolitik_world::{WorldError, building_spec, default_improvement, improvement_spec, unit_spec};

use super::{CommandError, covert};
use crate::setup::{SETTLEMENT_REVEAL_RADIUS, make_unit};
use crate::state::GameState;

/// Minimum distance between settlements.
pub const MIN_SETTLEMENT_SPACING: u32 = 2;

/// Experience granted to military units trained in a settlement with barracks.
pub const BARRACKS_EXPERIENCE: u32 = 2;

/// Fail unless `civ` knows `technology` (when one is required).
pub(crate) fn require_tech(
    state: &GameState,
    civ: CivId,
    what: impl core::fmt::Display,
    technology: Option<&str>,
) -> Result<(), CommandError> {
    let Some(technology) = technology else {
        return Ok(());
    };
    if state.civ(civ).is_some_and(|c| c.has_tech(technology)) {
        Ok(())
    } else {
        Err(CommandError::MissingTechnology {
            what: what.to_string(),
            technology: technology.to_owned(),
        })
    }
}

/// Deduct `cost` from the civ's ledger, or fail leaving it untouched.
pub(crate) fn pay(
    state: &mut GameState,
    civ: CivId,
    what: impl core::fmt::Display,
    cost: &Resources,
) -> Result<(), CommandError> {
    let unaffordable = || CommandError::Unaffordable {
        what: what.to_string(),
        cost: cost.clone(),
    };
    let c = state.civ_mut(civ).ok_or_else(unaffordable)?;
    if !c.resources.can_afford(cost) {
        return Err(unaffordable());
    }
    c.resources.deduct(cost);
    Ok(())
}

pub(crate) fn settlement_for(
    state: &GameState,
    civ: CivId,
    raw: Option<&str>,
) -> Result<SettlementId, CommandError> {
    state
        .resolve_settlement(civ, raw)
        .ok_or_else(|| CommandError::UnknownSettlement(raw.unwrap_or("capital").to_owned()))
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// Move a unit up to its remaining moves and reveal around its new tile.
pub fn move_unit(
    state: &mut GameState,
    civ: CivId,
    unit_ref: &str,
    to: Position,
) -> Result<String, CommandError> {
    let id = state
        .resolve_unit(civ, unit_ref)
        .ok_or_else(|| CommandError::UnknownUnit(unit_ref.to_owned()))?;
    state.map.check_passable(to)?;
    let unit = state
        .units
        .get_mut(&id)
        .ok_or_else(|| CommandError::UnknownUnit(unit_ref.to_owned()))?;
    let distance = unit.position.distance(to);
    if distance > unit.moves_remaining {
        return Err(CommandError::OutOfRange {
            unit: id,
            distance,
            remaining: unit.moves_remaining,
        });
    }
    let from = unit.position;
    unit.position = to;
    unit.moves_remaining = unit.moves_remaining.saturating_sub(distance);
    let (kind, vision) = (unit.kind, unit.vision);

    state.fog.reveal(civ, to, vision)?;
    state.arrivals.insert(to, civ);
    state.refresh_unit_counts();
    Ok(format!("moved {kind} from {from} to {to}"))
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

/// Set the civ's research target. Switching discards accumulated progress.
pub fn research(
    state: &mut GameState,
    civ: CivId,
    technology: &str,
    tree: &TechTree,
) -> Result<String, CommandError> {
    let name = tree
        .canonical(technology)
        .ok_or_else(|| AgentError::UnknownTechnology(technology.to_owned()))?
        .to_owned();
    let c = state
        .civ_mut(civ)
        .ok_or_else(|| CommandError::UnknownCiv(civ.to_string()))?;
    tree.check_researchable(&name, &c.technologies)?;
    if c.current_research.as_deref() != Some(name.as_str()) {
        c.current_research = Some(name.clone());
        c.research_progress = 0;
    }
    Ok(format!("began researching {name}"))
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Construct a building in one of the civ's settlements (capital by default).
pub fn build(
    state: &mut GameState,
    civ: CivId,
    building: &str,
    settlement: Option<&str>,
) -> Result<String, CommandError> {
    let kind: BuildingKind = building.parse()?;
    let sid = settlement_for(state, civ, settlement)?;
    let spec = building_spec(kind);
    require_tech(state, civ, kind, spec.requires)?;
    let name = state
        .settlements
        .get(&sid)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    if state
        .settlements
        .get(&sid)
        .is_some_and(|s| s.buildings.contains(&kind))
    {
        return Err(CommandError::AlreadyBuilt {
            building: kind,
            settlement: name,
        });
    }
    pay(state, civ, kind, &spec.cost())?;
    if let Some(s) = state.settlements.get_mut(&sid) {
        s.buildings.insert(kind);
    }
    Ok(format!("built a {kind} in {name}"))
}

// ---------------------------------------------------------------------------
// Found
// ---------------------------------------------------------------------------

/// Found a settlement with a settler at `at` (or where a settler stands).
///
/// The settler must reach the tile this turn. The tile must be passable,
/// unsettled, and at least [`MIN_SETTLEMENT_SPACING`] from every other
/// settlement. The settler is consumed.
pub fn found(
    state: &mut GameState,
    civ: CivId,
    name: Option<&str>,
    at: Option<Position>,
) -> Result<String, CommandError> {
    let mut settlers: Vec<_> = state
        .units_of(civ)
        .into_iter()
        .filter(|u| u.kind == UnitKind::Settler)
        .collect();
    let Some(first) = settlers.first() else {
        return Err(CommandError::NoSettler(at.unwrap_or(Position::new(0, 0))));
    };
    let target = at.unwrap_or(first.position);
    settlers.retain(|u| u.position.distance(target) <= u.moves_remaining);
    settlers.sort_by_key(|u| u.position.distance(target));
    let settler = settlers
        .first()
        .map(|u| u.id)
        .ok_or(CommandError::NoSettler(target))?;

    state.map.check_passable(target)?;
    if state.settlement_at(target).is_some() {
        return Err(WorldError::TileOccupied(target).into());
    }
    if let Some(distance) = state
        .settlements
        .values()
        .map(|s| s.position.distance(target))
        .min()
        .filter(|&d| d < MIN_SETTLEMENT_SPACING)
    {
        return Err(CommandError::TooClose {
            position: target,
            distance,
        });
    }

    let ordinal = state.settlements_of(civ).len().saturating_add(1);
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(|| format!("{} {ordinal}", state.civ_name(civ)), str::to_owned);
    let settlement = Settlement {
        id: SettlementId::new(),
        owner: civ,
        name: name.clone(),
        position: target,
        population: 1,
        buildings: BTreeSet::new(),
        capital: false,
        founded_turn: state.turn,
    };
    let id = settlement.id;
    state.units.remove(&settler);
    if let Some(tile) = state.map.tile_mut(target) {
        tile.settlement = Some(id);
    }
    state.settlements.insert(id, settlement);
    state.fog.reveal(civ, target, SETTLEMENT_REVEAL_RADIUS)?;
    state.refresh_unit_counts();
    state.log(GameEventKind::SettlementFounded {
        civ,
        settlement: id,
        position: target,
    });
    Ok(format!("founded {name} at {target}"))
}

// ---------------------------------------------------------------------------
// Train
// ---------------------------------------------------------------------------

/// Train a unit in a settlement. Spies go through the covert path.
pub fn train(
    state: &mut GameState,
    civ: CivId,
    unit: &str,
    settlement: Option<&str>,
) -> Result<String, CommandError> {
    let kind: UnitKind = unit.parse()?;
    if kind == UnitKind::Spy {
        return covert::create_spy(state, civ, settlement, None);
    }
    let sid = settlement_for(state, civ, settlement)?;
    let spec = unit_spec(kind);
    require_tech(state, civ, kind, spec.requires)?;
    pay(state, civ, kind, &spec.cost())?;

    let (position, name, barracks) = state
        .settlements
        .get(&sid)
        .map(|s| {
            (
                s.position,
                s.name.clone(),
                s.buildings.contains(&BuildingKind::Barracks),
            )
        })
        .ok_or_else(|| CommandError::UnknownSettlement(sid.to_string()))?;
    let experience = if barracks && kind.is_military() {
        BARRACKS_EXPERIENCE
    } else {
        0
    };
    let new = make_unit(civ, kind, position, experience);
    let unit_id = new.id;
    state.fog.reveal(civ, position, new.vision)?;
    state.units.insert(unit_id, new);
    state.refresh_unit_counts();
    state.log(GameEventKind::UnitCreated {
        civ,
        unit: unit_id,
        kind,
    });
    Ok(format!("trained a {kind} in {name}"))
}

// ---------------------------------------------------------------------------
// Improve
// ---------------------------------------------------------------------------

/// Build a tile improvement within one tile of an owned settlement or unit.
pub fn improve(
    state: &mut GameState,
    civ: CivId,
    at: Position,
    improvement: Option<&str>,
) -> Result<String, CommandError> {
    let terrain = state.map.require(at)?.terrain;
    let kind: Improvement = match improvement {
        Some(raw) => raw.parse()?,
        None => default_improvement(terrain).ok_or(CommandError::NoImprovement(terrain))?,
    };
    let spec = improvement_spec(kind);
    if !spec.terrains.contains(&terrain) {
        return Err(CommandError::WrongTerrain {
            improvement: kind,
            terrain,
        });
    }
    let in_reach = state
        .settlements_of(civ)
        .iter()
        .any(|s| s.position.distance(at) <= 1)
        || state.units_of(civ).iter().any(|u| u.position.distance(at) <= 1);
    if !in_reach {
        return Err(CommandError::OutOfReach(at));
    }
    require_tech(state, civ, kind, spec.requires)?;
    pay(state, civ, kind, &spec.cost())?;
    state.map.improve(at, kind)?;
    Ok(format!("built a {kind} at {at}"))
}
