//! Static catalog of units, buildings, and improvements.
//!
//! Costs are production and gold. Each entry may name the technology that
//! unlocks it; `None` means available from the start.

use realpolitik_types::{
    BuildingKind, Improvement, ResourceKind, Resources, Terrain, UnitKind,
};

/// Combat and movement profile of a unit kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSpec {
    /// Kind.
    pub kind: UnitKind,
    /// Production cost.
    pub production: u32,
    /// Gold cost.
    pub gold: u32,
    /// Starting strength.
    pub strength: f64,
    /// Tiles per turn.
    pub movement: u32,
    /// Reveal radius.
    pub vision: u32,
    /// Engagement range.
    pub attack_range: u32,
    /// Whether the unit is covert.
    pub covert: bool,
    /// Unlocking technology.
    pub requires: Option<&'static str>,
}

impl UnitSpec {
    /// Cost as a resource ledger.
    pub fn cost(&self) -> Resources {
        cost(self.production, self.gold)
    }
}

/// Cost and effect of a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildingSpec {
    /// Kind.
    pub kind: BuildingKind,
    /// Production cost.
    pub production: u32,
    /// Gold cost.
    pub gold: u32,
    /// Per-turn bonus added to the settlement's output.
    pub bonus: Option<(ResourceKind, u32)>,
    /// Unlocking technology.
    pub requires: Option<&'static str>,
}

impl BuildingSpec {
    /// Cost as a resource ledger.
    pub fn cost(&self) -> Resources {
        cost(self.production, self.gold)
    }
}

/// Cost and placement rule of an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImprovementSpec {
    /// Kind.
    pub kind: Improvement,
    /// Production cost.
    pub production: u32,
    /// Terrains it can be built on.
    pub terrains: &'static [Terrain],
    /// Unlocking technology.
    pub requires: Option<&'static str>,
}

impl ImprovementSpec {
    /// Cost as a resource ledger.
    pub fn cost(&self) -> Resources {
        cost(self.production, 0)
    }
}

fn cost(production: u32, gold: u32) -> Resources {
    let mut out = Resources::from_pairs(&[(ResourceKind::Production, production)]);
    if gold > 0 {
        out.credit(ResourceKind::Gold, gold);
    }
    out
}

/// Profile of a unit kind.
pub const fn unit_spec(kind: UnitKind) -> UnitSpec {
    match kind {
        UnitKind::Settler => UnitSpec {
            kind,
            production: 30,
            gold: 0,
            strength: 1.0,
            movement: 1,
            vision: 1,
            attack_range: 0,
            covert: false,
            requires: None,
        },
        UnitKind::Warrior => UnitSpec {
            kind,
            production: 15,
            gold: 0,
            strength: 10.0,
            movement: 1,
            vision: 2,
            attack_range: 1,
            covert: false,
            requires: None,
        },
        UnitKind::Archer => UnitSpec {
            kind,
            production: 25,
            gold: 0,
            strength: 8.0,
            movement: 1,
            vision: 2,
            attack_range: 2,
            covert: false,
            requires: Some("archery"),
        },
        UnitKind::Horseman => UnitSpec {
            kind,
            production: 30,
            gold: 5,
            strength: 12.0,
            movement: 2,
            vision: 2,
            attack_range: 1,
            covert: false,
            requires: Some("horseback_riding"),
        },
        UnitKind::Scout => UnitSpec {
            kind,
            production: 10,
            gold: 0,
            strength: 2.0,
            movement: 3,
            vision: 3,
            attack_range: 0,
            covert: false,
            requires: None,
        },
        UnitKind::Spy => UnitSpec {
            kind,
            production: 20,
            gold: 20,
            strength: 1.0,
            movement: 2,
            vision: 2,
            attack_range: 0,
            covert: true,
            requires: Some("writing"),
        },
    }
}

/// Cost and bonus of a building.
pub const fn building_spec(kind: BuildingKind) -> BuildingSpec {
    let (production, gold, bonus, requires) = match kind {
        BuildingKind::Granary => (40, 0, Some((ResourceKind::Food, 2)), Some("agriculture")),
        BuildingKind::Library => (50, 0, Some((ResourceKind::Science, 3)), Some("writing")),
        BuildingKind::Market => (60, 10, Some((ResourceKind::Gold, 3)), Some("currency")),
        BuildingKind::Workshop => (60, 0, Some((ResourceKind::Production, 3)), Some("mathematics")),
        // Barracks grant experience to trained units; walls halve damage to
        // defenders on the settlement tile.
        BuildingKind::Barracks => (40, 0, None, Some("bronze_working")),
        BuildingKind::Walls => (50, 0, None, Some("masonry")),
        BuildingKind::Temple => (40, 5, Some((ResourceKind::Gold, 1)), Some("mysticism")),
    };
    BuildingSpec {
        kind,
        production,
        gold,
        bonus,
        requires,
    }
}

/// Cost and placement of an improvement.
pub const fn improvement_spec(kind: Improvement) -> ImprovementSpec {
    match kind {
        Improvement::Farm => ImprovementSpec {
            kind,
            production: 10,
            terrains: &[Terrain::Grassland, Terrain::Plains],
            requires: Some("agriculture"),
        },
        Improvement::Mine => ImprovementSpec {
            kind,
            production: 15,
            terrains: &[Terrain::Hills, Terrain::Desert],
            requires: Some("mining"),
        },
        Improvement::TradingPost => ImprovementSpec {
            kind,
            production: 15,
            terrains: &[Terrain::Grassland, Terrain::Plains, Terrain::Forest, Terrain::Desert],
            requires: Some("currency"),
        },
    }
}

/// The improvement an agent most likely means on a terrain.
pub const fn default_improvement(terrain: Terrain) -> Option<Improvement> {
    match terrain {
        Terrain::Grassland | Terrain::Plains => Some(Improvement::Farm),
        Terrain::Hills | Terrain::Desert => Some(Improvement::Mine),
        Terrain::Forest => Some(Improvement::TradingPost),
        Terrain::Mountains | Terrain::Water => None,
    }
}
