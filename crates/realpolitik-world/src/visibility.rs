//! Fog of war.
//!
//! Each civilization owns a boolean grid the size of the map. A tile
//! becomes visible when a reveal operation covers it and never becomes
//! hidden again within a run.

use std::collections::BTreeMap;

use realpolitik_types::{CivId, Position};
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::world_map::WorldMap;

/// Per-civilization visibility grids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FogOfWar {
    width: u32,
    height: u32,
    grids: BTreeMap<CivId, Vec<bool>>,
}

impl FogOfWar {
    /// Empty fog sized to `map`.
    pub fn for_map(map: &WorldMap) -> Self {
        Self {
            width: map.width(),
            height: map.height(),
            grids: BTreeMap::new(),
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < self.width && pos.y < self.height {
            let width = usize::try_from(self.width).ok()?;
            let row = usize::try_from(pos.y).ok()?;
            let col = usize::try_from(pos.x).ok()?;
            row.checked_mul(width)?.checked_add(col)
        } else {
            None
        }
    }

    fn cell_count(&self) -> usize {
        let w = usize::try_from(self.width).unwrap_or(0);
        let h = usize::try_from(self.height).unwrap_or(0);
        w.saturating_mul(h)
    }

    /// Give a civilization an all-hidden grid. Idempotent.
    pub fn register(&mut self, civ: CivId) {
        let cells = self.cell_count();
        self.grids.entry(civ).or_insert_with(|| vec![false; cells]);
    }

    /// Reveal every tile within `radius` of `center` for `civ`.
    ///
    /// Returns the positions that were hidden before this call.
    pub fn reveal(
        &mut self,
        civ: CivId,
        center: Position,
        radius: u32,
    ) -> Result<Vec<Position>, WorldError> {
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

        let mut slots = Vec::new();
        if self.width > 0 && self.height > 0 {
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let pos = Position::new(x, y);
                    if let Some(i) = self.index(pos) {
                        slots.push((pos, i));
                    }
                }
            }
        }

        let grid = self.grids.get_mut(&civ).ok_or(WorldError::UnknownCiv(civ))?;
        let mut newly = Vec::new();
        for (pos, i) in slots {
            if let Some(cell) = grid.get_mut(i) {
                if !*cell {
                    *cell = true;
                    newly.push(pos);
                }
            }
        }
        Ok(newly)
    }

    /// Reveal the whole map for `civ` (fog of war disabled).
    pub fn reveal_all(&mut self, civ: CivId) {
        let cells = self.cell_count();
        self.grids.insert(civ, vec![true; cells]);
    }

    /// Whether `civ` has seen `pos`.
    pub fn is_visible(&self, civ: CivId, pos: Position) -> bool {
        self.index(pos)
            .and_then(|i| self.grids.get(&civ).and_then(|g| g.get(i)))
            .copied()
            .unwrap_or(false)
    }

    /// Every position `civ` has seen, row-major.
    pub fn visible_positions(&self, civ: CivId) -> Vec<Position> {
        let Some(grid) = self.grids.get(&civ) else {
            return Vec::new();
        };
        let width = self.width.max(1);
        grid.iter()
            .enumerate()
            .filter(|(_, seen)| **seen)
            .filter_map(|(i, _)| {
                let i = u32::try_from(i).ok()?;
                Some(Position::new(i % width, i / width))
            })
            .collect()
    }

    /// Number of tiles `civ` has seen.
    pub fn visible_count(&self, civ: CivId) -> usize {
        self.grids
            .get(&civ)
            .map_or(0, |g| g.iter().filter(|seen| **seen).count())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use realpolitik_types::Terrain;

    use super::*;

    fn fog() -> (FogOfWar, CivId) {
        let map = WorldMap::filled(8, 8, Terrain::Plains);
        let mut fog = FogOfWar::for_map(&map);
        let civ = CivId::new();
        fog.register(civ);
        (fog, civ)
    }

    #[test]
    fn reveal_reports_only_new_tiles() {
        let (mut fog, civ) = fog();
        let first = fog.reveal(civ, Position::new(1, 1), 1).unwrap();
        assert_eq!(first.len(), 9);
        let second = fog.reveal(civ, Position::new(2, 1), 1).unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(fog.visible_count(civ), 12);
    }

    #[test]
    fn visibility_is_monotonic() {
        let (mut fog, civ) = fog();
        fog.reveal(civ, Position::new(0, 0), 2).unwrap();
        let before = fog.visible_positions(civ);
        fog.reveal(civ, Position::new(7, 7), 1).unwrap();
        for pos in before {
            assert!(fog.is_visible(civ, pos));
        }
    }

    #[test]
    fn unregistered_civ_is_an_error() {
        let (mut fog, _) = fog();
        assert!(matches!(
            fog.reveal(CivId::new(), Position::new(0, 0), 1),
            Err(WorldError::UnknownCiv(_))
        ));
    }

    #[test]
    fn reveal_all_shows_every_tile() {
        let (mut fog, civ) = fog();
        fog.reveal_all(civ);
        assert_eq!(fog.visible_count(civ), 64);
        assert!(fog.is_visible(civ, Position::new(7, 0)));
    }
}
