//! # Region Grid
//!
//! Pure mapping from world positions to grid region ids. The grid
//! partitions the XZ plane into square columns of a configured side length;
//! height is ignored. Region ids are deterministic, so every client in a
//! room computes the same id for the same position without coordination.

use crate::types::{RegionId, Vec3};

/// Grid cells per axis the world may span. Cell coordinates are offset by
/// half of this so ids stay non-negative for any position within the
/// supported world bound.
pub const MAX_ZONES: i64 = 1_000_000;

/// A world-space visibility grid with a fixed cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionGrid {
    cell_size: f64,
}

impl RegionGrid {
    /// Creates a grid with the given cell side length in world units.
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        Self { cell_size }
    }

    /// The cell side length.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Maps a position to its region id.
    ///
    /// Two positions map to the same id iff they fall into the same floor
    /// cell on both the X and Z axes. Total and deterministic; no side
    /// effects.
    pub fn tag(&self, position: Vec3) -> RegionId {
        let xp = (position.x / self.cell_size).floor() as i64 + MAX_ZONES / 2;
        let zp = (position.z / self.cell_size).floor() as i64 + MAX_ZONES / 2;
        RegionId(MAX_ZONES * xp + zp)
    }

    /// World-space bounds of a region's cell, as `(min, max)` corners in
    /// the XZ plane. The Y components are zero.
    pub fn cell_bounds(&self, region: RegionId) -> (Vec3, Vec3) {
        let xp = region.0.div_euclid(MAX_ZONES) - MAX_ZONES / 2;
        let zp = region.0.rem_euclid(MAX_ZONES) - MAX_ZONES / 2;
        let min = Vec3::new(xp as f64 * self.cell_size, 0.0, zp as f64 * self.cell_size);
        let max = Vec3::new(min.x + self.cell_size, 0.0, min.z + self.cell_size);
        (min, max)
    }

    /// Whether a position lies within a region's cell expanded by `fuzz` on
    /// every side.
    ///
    /// Consumers that must avoid flicker at cell boundaries check the
    /// current region with a fuzz margin before recomputing; a position
    /// inside the expanded cell keeps its current region.
    pub fn contains_with_fuzz(&self, region: RegionId, position: Vec3, fuzz: f64) -> bool {
        let (min, max) = self.cell_bounds(region);
        position.x >= min.x - fuzz
            && position.x < max.x + fuzz
            && position.z >= min.z - fuzz
            && position.z < max.z + fuzz
    }
}
