//! Initial game construction.
//!
//! Builds the map, one civilization per configured slot with a capital,
//! a settler and a warrior, starting resources and technologies, the
//! initial reveal around each capital, and identity and personality
//! memories.

use std::collections::BTreeSet;

use rand::Rng;
use realpolitik_agents::TechTree;
use realpolitik_types::{
    CivId, Civilization, MemoryEntry, MemoryType, Position, ResourceKind, Resources, Settlement,
    SettlementId, Unit, UnitId, UnitKind,
};
use realpolitik_world::{FogOfWar, WorldError, generate, unit_spec};
use tracing::info;

use crate::config::GameConfig;
use crate::state::GameState;

/// Radius revealed around a capital or a newly founded settlement.
pub const SETTLEMENT_REVEAL_RADIUS: u32 = 2;

/// Name, capital name, and traits for each civilization slot.
const PRESETS: &[(&str, &str, &[&str])] = &[
    ("Aurelia", "Aurum", &["ambitious", "diplomatic", "patient"]),
    ("Borealis", "Frosthold", &["cautious", "honest", "defensive"]),
    ("Carthis", "Port Carthis", &["cunning", "mercantile", "opportunistic"]),
    ("Drakmoor", "Ironkeep", &["aggressive", "proud", "expansionist"]),
    ("Elysia", "Lumen", &["scholarly", "peaceful", "curious"]),
    ("Fenmark", "Mirewatch", &["calculating", "secretive", "pragmatic"]),
    ("Galdor", "Stonegate", &["stubborn", "loyal", "industrious"]),
    ("Halcyra", "Seabright", &["charismatic", "manipulative", "generous"]),
];

/// Errors that can occur while building the initial state.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Map generation or reveal failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// Map generation returned fewer capitals than civilizations.
    #[error("map generation placed {placed} capitals for {wanted} civilizations")]
    MissingCapital {
        /// Capitals placed.
        placed: usize,
        /// Civilizations requested.
        wanted: u32,
    },
}

/// Starting ledger for every civilization.
pub fn starting_resources() -> Resources {
    Resources::from_pairs(&[
        (ResourceKind::Food, 20),
        (ResourceKind::Production, 30),
        (ResourceKind::Gold, 20),
        (ResourceKind::Science, 0),
    ])
}

/// A fresh unit of `kind` built from its catalog profile.
pub fn make_unit(owner: CivId, kind: UnitKind, position: Position, experience: u32) -> Unit {
    let spec = unit_spec(kind);
    Unit {
        id: UnitId::new(),
        owner,
        kind,
        position,
        strength: spec.strength,
        movement: spec.movement,
        vision: spec.vision,
        attack_range: spec.attack_range,
        moves_remaining: spec.movement,
        experience,
        covert: spec.covert,
        mission: None,
        disguise: None,
    }
}

fn preset(slot: u32) -> (String, String, Vec<String>) {
    let len = u32::try_from(PRESETS.len()).unwrap_or(u32::MAX).max(1);
    let round = slot / len;
    let index = usize::try_from(slot % len).unwrap_or(0);
    let (name, capital, traits) = PRESETS
        .get(index)
        .copied()
        .unwrap_or(("Civilization", "Capital", &[]));
    let suffix = if round == 0 {
        String::new()
    } else {
        format!(" {}", round.saturating_add(1))
    };
    (
        format!("{name}{suffix}"),
        format!("{capital}{suffix}"),
        traits.iter().map(|t| (*t).to_owned()).collect(),
    )
}

/// Build the initial state for `config`.
pub fn build<R: Rng + ?Sized>(
    config: &GameConfig,
    tree: &TechTree,
    rng: &mut R,
) -> Result<GameState, SetupError> {
    let generated = generate(
        config.map_width,
        config.map_height,
        config.civilizations,
        config.resource_distribution,
        rng,
    )?;
    if generated.capitals.len() < usize::try_from(config.civilizations).unwrap_or(usize::MAX) {
        return Err(SetupError::MissingCapital {
            placed: generated.capitals.len(),
            wanted: config.civilizations,
        });
    }

    let mut state = GameState::empty();
    state.fog = FogOfWar::for_map(&generated.map);
    state.map = generated.map;

    let technologies: BTreeSet<String> = config
        .starting_technologies
        .iter()
        .filter_map(|t| tree.canonical(t).map(str::to_owned))
        .collect();

    for (slot, &capital_pos) in (0_u32..).zip(generated.capitals.iter()) {
        let (name, capital_name, traits) = preset(slot);
        let mut civ = Civilization::new(name, slot, traits);
        civ.resources = starting_resources();
        civ.technologies.clone_from(&technologies);
        let id = civ.id;

        let capital = Settlement {
            id: SettlementId::new(),
            owner: id,
            name: capital_name,
            position: capital_pos,
            population: 1,
            buildings: BTreeSet::new(),
            capital: true,
            founded_turn: 0,
        };
        if let Some(tile) = state.map.tile_mut(capital_pos) {
            tile.settlement = Some(capital.id);
        }
        state.settlements.insert(capital.id, capital);

        for kind in [UnitKind::Settler, UnitKind::Warrior] {
            let unit = make_unit(id, kind, capital_pos, 0);
            state.units.insert(unit.id, unit);
        }

        state.fog.register(id);
        if config.fog_of_war {
            state.fog.reveal(id, capital_pos, SETTLEMENT_REVEAL_RADIUS)?;
        } else {
            state.fog.reveal_all(id);
        }

        state.memory.remember(MemoryEntry::note(
            id,
            MemoryType::Identity,
            0,
            1.0,
            format!("I lead {}, whose capital stands at {capital_pos}.", civ.name),
        ));
        state.memory.remember(MemoryEntry::note(
            id,
            MemoryType::Personality,
            0,
            0.9,
            format!("My temperament is {}.", civ.personality.join(", ")),
        ));
        state.resource_passes.insert(id, 0);
        info!(civ = %civ.name, %id, capital = %capital_pos, "Civilization created");
        state.civs.push(civ);
    }

    state.refresh_unit_counts();
    Ok(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn small_config() -> GameConfig {
        GameConfig {
            map_width: 8,
            map_height: 8,
            civilizations: 2,
            ..GameConfig::default()
        }
    }

    #[test]
    fn builds_two_civs_with_capitals_and_units() {
        let config = small_config();
        let state = build(&config, &TechTree::new(), &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(state.civs.len(), 2);
        assert_eq!(state.settlements.len(), 2);
        assert_eq!(state.units.len(), 4);
        let first = &state.civs[0];
        assert!(first.has_tech("agriculture"));
        let capital = state.settlements_of(first.id)[0];
        assert!(capital.capital);
        assert_eq!(capital.position, Position::new(1, 1));
        assert_eq!(
            state.map.tile(capital.position).unwrap().settlement,
            Some(capital.id)
        );
        assert_eq!(state.map.tile(capital.position).unwrap().unit_count, 2);
        assert!(state.fog.is_visible(first.id, Position::new(3, 3)));
        assert!(!state.fog.is_visible(first.id, Position::new(4, 4)));
        assert_eq!(state.memory.total(), 4);
    }

    #[test]
    fn fog_disabled_reveals_everything() {
        let config = GameConfig {
            fog_of_war: false,
            ..small_config()
        };
        let state = build(&config, &TechTree::new(), &mut StdRng::seed_from_u64(1)).unwrap();
        let civ = state.civs[0].id;
        assert_eq!(state.fog.visible_count(civ), 64);
    }

    #[test]
    fn presets_cycle_with_suffix() {
        let (name, capital, traits) = preset(8);
        assert_eq!(name, "Aurelia 2");
        assert_eq!(capital, "Aurum 2");
        assert_eq!(traits.len(), 3);
    }
}
