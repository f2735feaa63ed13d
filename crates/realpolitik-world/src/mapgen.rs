//! Seeded map generation.
//!
//! Terrain is drawn per tile from fixed weights. Capitals are placed on
//! spread-out anchor points (greedy farthest-point selection) and forced
//! to grassland with passable neighbours so every civ can found and move
//! on turn one.

use rand::Rng;
use realpolitik_types::{Position, ResourceDistribution, Terrain, TileResource};
use tracing::debug;

use crate::error::WorldError;
use crate::world_map::{WorldMap, resource_fits};

/// Minimum Chebyshev distance between two capitals.
pub const MIN_CAPITAL_SPACING: u32 = 3;

const TERRAIN_WEIGHTS: &[(Terrain, u32)] = &[
    (Terrain::Grassland, 30),
    (Terrain::Plains, 25),
    (Terrain::Forest, 15),
    (Terrain::Hills, 12),
    (Terrain::Desert, 8),
    (Terrain::Mountains, 5),
    (Terrain::Water, 5),
];

/// A generated map plus one capital anchor per civilization.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    /// The terrain grid.
    pub map: WorldMap,
    /// Capital positions in civilization creation order.
    pub capitals: Vec<Position>,
}

/// Chance of a deposit on a fitting tile.
fn deposit_chance<R: Rng + ?Sized>(distribution: ResourceDistribution, rng: &mut R) -> f64 {
    match distribution {
        ResourceDistribution::Balanced => 0.12,
        ResourceDistribution::Abundant => 0.25,
        ResourceDistribution::Scarce => 0.05,
        ResourceDistribution::Random => rng.random::<f64>().mul_add(0.2, 0.05),
    }
}

fn pick_terrain<R: Rng + ?Sized>(rng: &mut R) -> Terrain {
    let total: u32 = TERRAIN_WEIGHTS.iter().map(|(_, w)| *w).sum();
    let mut roll = rng.random_range(0..total.max(1));
    for &(terrain, weight) in TERRAIN_WEIGHTS {
        if roll < weight {
            return terrain;
        }
        roll = roll.saturating_sub(weight);
    }
    Terrain::Grassland
}

fn candidate_deposits(terrain: Terrain) -> Vec<TileResource> {
    TileResource::ALL
        .iter()
        .copied()
        .filter(|&r| resource_fits(terrain, Some(r)))
        .collect()
}

/// Spread `count` anchors across the map, at least
/// [`MIN_CAPITAL_SPACING`] apart.
pub fn spread_anchors(width: u32, height: u32, count: u32) -> Result<Vec<Position>, WorldError> {
    let too_small = WorldError::MapTooSmall {
        width,
        height,
        civs: count,
    };
    if width == 0 || height == 0 {
        return Err(too_small);
    }
    let margin = u32::from(width >= 4 && height >= 4);
    let max_x = width.saturating_sub(1).saturating_sub(margin);
    let max_y = height.saturating_sub(1).saturating_sub(margin);

    let mut anchors: Vec<Position> = Vec::new();
    for _ in 0..count {
        let mut best: Option<(Position, u32, u32)> = None;
        for y in margin..=max_y {
            for x in margin..=max_x {
                let pos = Position::new(x, y);
                let nearest = anchors
                    .iter()
                    .map(|a| a.distance(pos))
                    .min()
                    .unwrap_or(u32::MAX);
                let spread: u32 = anchors
                    .iter()
                    .map(|a| a.x.abs_diff(pos.x).saturating_add(a.y.abs_diff(pos.y)))
                    .fold(0, u32::saturating_add);
                let better = best.is_none_or(|(_, n, s)| nearest > n || (nearest == n && spread > s));
                if better {
                    best = Some((pos, nearest, spread));
                }
            }
        }
        match best {
            Some((pos, nearest, _)) if nearest >= MIN_CAPITAL_SPACING => anchors.push(pos),
            _ => return Err(too_small),
        }
    }
    Ok(anchors)
}

/// Generate a map for `civs` civilizations.
pub fn generate<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    civs: u32,
    distribution: ResourceDistribution,
    rng: &mut R,
) -> Result<GeneratedMap, WorldError> {
    let capitals = spread_anchors(width, height, civs)?;
    let mut map = WorldMap::filled(width, height, Terrain::Grassland);
    let chance = deposit_chance(distribution, rng);

    for y in 0..height {
        for x in 0..width {
            let pos = Position::new(x, y);
            let terrain = pick_terrain(rng);
            map.set_terrain(pos, terrain)?;
            let options = candidate_deposits(terrain);
            if !options.is_empty() && rng.random::<f64>() < chance {
                let idx = rng.random_range(0..options.len());
                map.set_resource(pos, options.get(idx).copied())?;
            }
        }
    }

    for &capital in &capitals {
        for pos in map.positions_within(capital, 1) {
            let passable = map.tile(pos).is_some_and(|t| t.terrain.is_passable());
            if !passable {
                map.set_terrain(pos, Terrain::Plains)?;
            }
        }
        map.set_terrain(capital, Terrain::Grassland)?;
    }

    debug!(width, height, civs, ?distribution, "map generated");
    Ok(GeneratedMap { map, capitals })
}
