//! Tile map, terrain yields, fog of war, and the unit/building catalog for
//! the Realpolitik simulation.
//!
//! # Modules
//!
//! - [`world_map`] -- Rectangular tile grid and terrain yields
//! - [`visibility`] -- Per-civilization monotonic fog of war
//! - [`mapgen`] -- Seeded terrain generation and capital placement
//! - [`catalog`] -- Unit, building, and improvement definitions
//! - [`error`] -- Error types for map operations

pub mod catalog;
pub mod error;
pub mod mapgen;
pub mod visibility;
pub mod world_map;

pub use catalog::{
    BuildingSpec, ImprovementSpec, UnitSpec, building_spec, default_improvement, improvement_spec,
    unit_spec,
};
pub use error::WorldError;
pub use mapgen::{GeneratedMap, MIN_CAPITAL_SPACING, generate, spread_anchors};
pub use visibility::FogOfWar;
pub use world_map::{WorldMap, terrain_yields, tile_yields};
