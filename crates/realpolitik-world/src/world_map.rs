//! Rectangular tile grid.
//!
//! Tiles are stored row-major in a flat `Vec`; [`WorldMap::index`] is the
//! only place that turns a [`Position`] into a slot, and it returns `None`
//! for anything off the map.

use realpolitik_types::{Improvement, Position, ResourceKind, Resources, Terrain, Tile, TileResource};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// The world grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl WorldMap {
    /// A map filled with one terrain.
    pub fn filled(width: u32, height: u32, terrain: Terrain) -> Self {
        let mut tiles = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let position = Position::new(x, y);
                tiles.push(Tile {
                    position,
                    terrain,
                    yields: tile_yields(terrain, None, None),
                    resource: None,
                    improvement: None,
                    settlement: None,
                    unit_count: 0,
                });
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    /// Map width in tiles.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the map has no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Flat slot for a position, if it is on the map.
    pub fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < self.width && pos.y < self.height {
            let row = usize::try_from(pos.y).ok()?;
            let col = usize::try_from(pos.x).ok()?;
            let width = usize::try_from(self.width).ok()?;
            row.checked_mul(width)?.checked_add(col)
        } else {
            None
        }
    }

    /// Whether a position is on the map.
    pub const fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Tile at a position.
    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index(pos).and_then(|i| self.tiles.get(i))
    }

    /// Mutable tile at a position.
    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index(pos).and_then(|i| self.tiles.get_mut(i))
    }

    /// Tile at a position, or [`WorldError::OutOfBounds`].
    pub fn require(&self, pos: Position) -> Result<&Tile, WorldError> {
        self.tile(pos).ok_or(WorldError::OutOfBounds(pos))
    }

    /// Every tile, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Positions within Chebyshev `radius` of `center`, clipped to the map.
    pub fn positions_within(&self, center: Position, radius: u32) -> Vec<Position> {
        let min_x = center.x.saturating_sub(radius);
        let min_y = center.y.saturating_sub(radius);
        let max_x = center
            .x
            .saturating_add(radius)
            .min(self.width.saturating_sub(1));
        let max_y = center
            .y
            .saturating_add(radius)
            .min(self.height.saturating_sub(1));
        let mut out = Vec::new();
        if self.is_empty() {
            return out;
        }
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                out.push(Position::new(x, y));
            }
        }
        out
    }

    /// The eight (or fewer, at edges) tiles around `center`.
    pub fn neighbors(&self, center: Position) -> Vec<Position> {
        self.positions_within(center, 1)
            .into_iter()
            .filter(|&p| p != center)
            .collect()
    }

    /// Replace a tile's terrain and recompute its yields.
    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> Result<(), WorldError> {
        let tile = self.tile_mut(pos).ok_or(WorldError::OutOfBounds(pos))?;
        tile.terrain = terrain;
        if !resource_fits(terrain, tile.resource) {
            tile.resource = None;
        }
        tile.yields = tile_yields(terrain, tile.resource, tile.improvement);
        Ok(())
    }

    /// Place a deposit and recompute yields.
    pub fn set_resource(
        &mut self,
        pos: Position,
        resource: Option<TileResource>,
    ) -> Result<(), WorldError> {
        let tile = self.tile_mut(pos).ok_or(WorldError::OutOfBounds(pos))?;
        tile.resource = resource;
        tile.yields = tile_yields(tile.terrain, resource, tile.improvement);
        Ok(())
    }

    /// Build an improvement and recompute yields.
    pub fn improve(&mut self, pos: Position, improvement: Improvement) -> Result<(), WorldError> {
        let tile = self.tile_mut(pos).ok_or(WorldError::OutOfBounds(pos))?;
        if !tile.terrain.is_passable() {
            return Err(WorldError::Impassable {
                position: pos,
                terrain: tile.terrain,
            });
        }
        tile.improvement = Some(improvement);
        tile.yields = tile_yields(tile.terrain, tile.resource, Some(improvement));
        Ok(())
    }

    /// Check that a position is on the map and passable.
    pub fn check_passable(&self, pos: Position) -> Result<(), WorldError> {
        let tile = self.require(pos)?;
        if tile.terrain.is_passable() {
            Ok(())
        } else {
            Err(WorldError::Impassable {
                position: pos,
                terrain: tile.terrain,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Yields
// ---------------------------------------------------------------------------

/// Base `(food, production, gold)` for a terrain.
pub const fn terrain_yields(terrain: Terrain) -> (u32, u32, u32) {
    match terrain {
        Terrain::Grassland => (2, 1, 0),
        Terrain::Plains => (1, 1, 1),
        Terrain::Hills => (0, 2, 0),
        Terrain::Forest => (1, 2, 0),
        Terrain::Desert => (0, 1, 1),
        Terrain::Mountains => (0, 1, 0),
        Terrain::Water => (1, 0, 1),
    }
}

/// Extra `(food, production, gold)` from a deposit.
const fn resource_bonus(resource: TileResource) -> (u32, u32, u32) {
    match resource {
        TileResource::Wheat => (2, 0, 0),
        TileResource::Cattle => (1, 1, 0),
        TileResource::Iron => (0, 2, 0),
        TileResource::Horses => (0, 1, 1),
        TileResource::GoldOre => (0, 0, 3),
        TileResource::Stone => (0, 1, 0),
    }
}

/// Extra `(food, production, gold)` from an improvement.
const fn improvement_bonus(improvement: Improvement) -> (u32, u32, u32) {
    match improvement {
        Improvement::Farm => (1, 0, 0),
        Improvement::Mine => (0, 2, 0),
        Improvement::TradingPost => (0, 0, 1),
    }
}

/// Whether a deposit can appear on a terrain.
pub const fn resource_fits(terrain: Terrain, resource: Option<TileResource>) -> bool {
    match resource {
        None => true,
        Some(r) => matches!(
            (terrain, r),
            (Terrain::Grassland, TileResource::Wheat | TileResource::Cattle)
                | (Terrain::Plains, TileResource::Wheat | TileResource::Horses)
                | (Terrain::Hills, TileResource::Iron | TileResource::Stone)
                | (Terrain::Desert, TileResource::GoldOre)
                | (Terrain::Forest, TileResource::Cattle)
        ),
    }
}

/// Total yields for a tile.
pub fn tile_yields(
    terrain: Terrain,
    resource: Option<TileResource>,
    improvement: Option<Improvement>,
) -> Resources {
    let (mut food, mut production, mut gold) = terrain_yields(terrain);
    for (f, p, g) in resource
        .map(resource_bonus)
        .into_iter()
        .chain(improvement.map(improvement_bonus))
    {
        food = food.saturating_add(f);
        production = production.saturating_add(p);
        gold = gold.saturating_add(g);
    }
    Resources::from_pairs(&[
        (ResourceKind::Food, food),
        (ResourceKind::Production, production),
        (ResourceKind::Gold, gold),
    ])
}
