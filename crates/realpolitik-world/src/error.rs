//! Error types for the `realpolitik-world` crate.

use realpolitik_types::{CivId, Position, Terrain};

/// Errors that can occur during map operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The position lies outside the map.
    #[error("position {0} is outside the map")]
    OutOfBounds(Position),

    /// Units cannot enter or settle this terrain.
    #[error("tile {position} is impassable ({terrain})")]
    Impassable {
        /// The tile.
        position: Position,
        /// Its terrain.
        terrain: Terrain,
    },

    /// A settlement already occupies the tile.
    #[error("tile {0} already holds a settlement")]
    TileOccupied(Position),

    /// The civilization has no visibility grid.
    #[error("civilization {0} is not registered with the fog of war")]
    UnknownCiv(CivId),

    /// The map cannot host the requested number of civilizations.
    #[error("a {width}x{height} map cannot host {civs} civilizations")]
    MapTooSmall {
        /// Map width.
        width: u32,
        /// Map height.
        height: u32,
        /// Requested civilizations.
        civs: u32,
    },
}
