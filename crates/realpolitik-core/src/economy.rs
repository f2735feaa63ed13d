//! Resource generation, research, and population growth.
//!
//! A settlement works its own tile plus its `population` best neighbouring
//! tiles (by total yield, skipping tiles that hold another settlement),
//! adds its building bonuses, and produces one science per population.
//! Everything flows into the owner's ledger; each citizen then eats
//! [`FOOD_UPKEEP_PER_POP`] food, clamped at zero.

use std::cmp::Reverse;

use realpolitik_agents::{ResearchProgress, TechTree};
use realpolitik_types::{CivId, GameEventKind, ResourceKind, Resources, Settlement};
use realpolitik_world::building_spec;
use tracing::{debug, info};

use crate::state::GameState;

/// Food eaten per population per turn.
pub const FOOD_UPKEEP_PER_POP: u32 = 2;

/// Food needed to grow a settlement of `population`.
pub const fn growth_threshold(population: u32) -> u32 {
    10_u32.saturating_add(population.saturating_mul(5))
}

/// Per-turn output of one settlement.
pub fn settlement_output(state: &GameState, settlement: &Settlement) -> Resources {
    let mut out = state
        .map
        .tile(settlement.position)
        .map(|t| t.yields.clone())
        .unwrap_or_default();

    let mut worked: Vec<_> = state
        .map
        .neighbors(settlement.position)
        .into_iter()
        .filter_map(|p| state.map.tile(p))
        .filter(|t| t.settlement.is_none())
        .collect();
    worked.sort_by_key(|t| (Reverse(t.yields.total()), t.position.y, t.position.x));
    let take = usize::try_from(settlement.population).unwrap_or(usize::MAX);
    for tile in worked.into_iter().take(take) {
        out.add(&tile.yields);
    }

    for building in &settlement.buildings {
        if let Some((kind, amount)) = building_spec(*building).bonus {
            out.credit(kind, amount);
        }
    }
    out.credit(ResourceKind::Science, settlement.population);
    out
}

/// Run one resource-generation pass for `civ`. Returns the gross output.
pub fn generate_resources(state: &mut GameState, civ: CivId) -> Resources {
    let mut total = Resources::new();
    let mut population = 0_u32;
    for settlement in state.settlements_of(civ) {
        total.add(&settlement_output(state, settlement));
        population = population.saturating_add(settlement.population);
    }
    if let Some(c) = state.civ_mut(civ) {
        c.resources.add(&total);
        c.resources
            .debit(ResourceKind::Food, population.saturating_mul(FOOD_UPKEEP_PER_POP));
    }
    let passes = state.resource_passes.entry(civ).or_insert(0);
    *passes = passes.saturating_add(1);
    debug!(%civ, output = %total, "Resources generated");
    total
}

/// Feed the civ's science into its current research.
///
/// Returns the technology completed this turn, if any, after logging the
/// discovery.
pub fn advance_research(state: &mut GameState, civ: CivId, tree: &TechTree) -> Option<String> {
    let c = state.civ_mut(civ)?;
    let current = c.current_research.clone()?;
    let science = c.resources.debit(ResourceKind::Science, u32::MAX);
    match tree.advance(Some(&current), c.research_progress, science) {
        ResearchProgress::Completed { technology } => {
            c.technologies.insert(technology.clone());
            c.current_research = None;
            c.research_progress = 0;
            info!(%civ, technology = %technology, "Technology discovered");
            state.log(GameEventKind::TechnologyDiscovered {
                civ,
                technology: technology.clone(),
                stolen: false,
            });
            Some(technology)
        }
        ResearchProgress::InProgress { progress, .. } => {
            c.research_progress = progress;
            None
        }
        ResearchProgress::Idle => {
            c.current_research = None;
            c.research_progress = 0;
            None
        }
    }
}

/// Grow every settlement whose owner can pay the growth threshold.
///
/// Settlements are visited in civ creation order, capital first. Returns
/// how many grew.
pub fn grow_population(state: &mut GameState) -> u32 {
    let mut grown = 0_u32;
    for civ in state.civ_ids() {
        let ids: Vec<_> = state.settlements_of(civ).iter().map(|s| s.id).collect();
        for id in ids {
            let Some(population) = state.settlements.get(&id).map(|s| s.population) else {
                continue;
            };
            let threshold = growth_threshold(population);
            let paid = state.civ_mut(civ).is_some_and(|c| {
                if c.resources.get(ResourceKind::Food) >= threshold {
                    c.resources.debit(ResourceKind::Food, threshold);
                    true
                } else {
                    false
                }
            });
            if paid && let Some(s) = state.settlements.get_mut(&id) {
                s.population = s.population.saturating_add(1);
                grown = grown.saturating_add(1);
                debug!(settlement = %s.name, population = s.population, "Settlement grew");
            }
        }
    }
    grown
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use realpolitik_types::{BuildingKind, Civilization, Position, SettlementId, Terrain};
    use realpolitik_world::{FogOfWar, WorldMap};

    use super::*;

    fn plain_state() -> (GameState, CivId, SettlementId) {
        let mut state = GameState::empty();
        state.map = WorldMap::filled(5, 5, Terrain::Grassland);
        state.fog = FogOfWar::for_map(&state.map);
        let civ = Civilization::new("Rome", 0, Vec::new());
        let id = civ.id;
        state.civs.push(civ);
        let settlement = Settlement {
            id: SettlementId::new(),
            owner: id,
            name: "Roma".into(),
            position: Position::new(2, 2),
            population: 1,
            buildings: BTreeSet::new(),
            capital: true,
            founded_turn: 0,
        };
        let sid = settlement.id;
        state.map.tile_mut(Position::new(2, 2)).unwrap().settlement = Some(sid);
        state.settlements.insert(sid, settlement);
        (state, id, sid)
    }

    #[test]
    fn output_counts_tile_plus_population_neighbours() {
        let (state, _, sid) = plain_state();
        let out = settlement_output(&state, state.settlements.get(&sid).unwrap());
        // Two grassland tiles (2F 1P each) plus one science per pop.
        assert_eq!(out.get(ResourceKind::Food), 4);
        assert_eq!(out.get(ResourceKind::Production), 2);
        assert_eq!(out.get(ResourceKind::Science), 1);
    }

    #[test]
    fn buildings_add_bonuses() {
        let (mut state, _, sid) = plain_state();
        state
            .settlements
            .get_mut(&sid)
            .unwrap()
            .buildings
            .insert(BuildingKind::Library);
        let out = settlement_output(&state, state.settlements.get(&sid).unwrap());
        assert_eq!(out.get(ResourceKind::Science), 4);
    }

    #[test]
    fn generation_pays_upkeep_and_counts_passes() {
        let (mut state, civ, _) = plain_state();
        generate_resources(&mut state, civ);
        generate_resources(&mut state, civ);
        let c = state.civ(civ).unwrap();
        // (4 food - 2 upkeep) per pass.
        assert_eq!(c.resources.get(ResourceKind::Food), 4);
        assert_eq!(state.resource_passes.get(&civ), Some(&2));
    }

    #[test]
    fn research_completes_and_logs() {
        let (mut state, civ, _) = plain_state();
        let tree = TechTree::new();
        {
            let c = state.civ_mut(civ).unwrap();
            c.current_research = Some("mining".into());
            c.resources.set(ResourceKind::Science, 15);
        }
        assert_eq!(advance_research(&mut state, civ, &tree), None);
        assert_eq!(state.civ(civ).unwrap().research_progress, 15);
        state
            .civ_mut(civ)
            .unwrap()
            .resources
            .set(ResourceKind::Science, 5);
        assert_eq!(advance_research(&mut state, civ, &tree), Some("mining".into()));
        let c = state.civ(civ).unwrap();
        assert!(c.has_tech("mining"));
        assert!(c.current_research.is_none());
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn growth_needs_threshold_food() {
        let (mut state, civ, sid) = plain_state();
        state
            .civ_mut(civ)
            .unwrap()
            .resources
            .set(ResourceKind::Food, growth_threshold(1).saturating_sub(1));
        assert_eq!(grow_population(&mut state), 0);
        state
            .civ_mut(civ)
            .unwrap()
            .resources
            .set(ResourceKind::Food, growth_threshold(1));
        assert_eq!(grow_population(&mut state), 1);
        assert_eq!(state.settlements.get(&sid).unwrap().population, 2);
        assert_eq!(state.civ(civ).unwrap().resources.get(ResourceKind::Food), 0);
    }
}
