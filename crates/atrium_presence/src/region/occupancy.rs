//! # Region Occupancy
//!
//! Reference-counted occupancy per grid region. Avatars entering and
//! leaving regions drive the counts; only the 0↔1 transitions matter to
//! consumers, which show or hide region content on exactly those edges.

use crate::types::RegionId;
use std::collections::HashMap;

/// Result of an occupancy count change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The region went from vacant to occupied (count 0 → 1).
    Occupied,
    /// The region went from occupied to vacant (count 1 → 0).
    Vacated,
    /// The count changed without crossing the occupancy threshold.
    Unchanged,
}

/// Occupant counts for every currently-occupied region.
///
/// A region id is present iff its count is at least one; entries are
/// removed as soon as their count reaches zero, so the map stays bounded by
/// the number of simultaneously occupied regions.
#[derive(Debug, Default)]
pub struct OccupancyMap {
    counts: HashMap<RegionId, usize>,
    stats: OccupancyStats,
}

impl OccupancyMap {
    /// Creates an empty occupancy map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one avatar entering `region`.
    ///
    /// Returns [`Transition::Occupied`] when this entry made the region
    /// occupied.
    pub fn enter(&mut self, region: RegionId) -> Transition {
        let count = self.counts.entry(region).or_insert(0);
        *count += 1;
        self.stats.enters += 1;
        if *count == 1 {
            self.stats.peak_occupied = self.stats.peak_occupied.max(self.counts.len());
            Transition::Occupied
        } else {
            Transition::Unchanged
        }
    }

    /// Records one avatar leaving `region`.
    ///
    /// Returns [`Transition::Vacated`] when this departure emptied the
    /// region. Leaving a region that was never entered is a no-op; the
    /// counts never go below zero.
    pub fn leave(&mut self, region: RegionId) -> Transition {
        self.stats.leaves += 1;
        match self.counts.get_mut(&region) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Transition::Unchanged
            }
            Some(_) => {
                self.counts.remove(&region);
                Transition::Vacated
            }
            None => {
                self.stats.unmatched_leaves += 1;
                tracing::debug!("leave for {} without a matching enter", region);
                Transition::Unchanged
            }
        }
    }

    /// Current occupant count for `region`.
    pub fn count(&self, region: RegionId) -> usize {
        self.counts.get(&region).copied().unwrap_or(0)
    }

    /// Whether `region` currently has at least one occupant.
    pub fn is_occupied(&self, region: RegionId) -> bool {
        self.counts.contains_key(&region)
    }

    /// Number of currently-occupied regions.
    pub fn occupied_regions(&self) -> usize {
        self.counts.len()
    }

    /// Accumulated counters.
    pub fn stats(&self) -> &OccupancyStats {
        &self.stats
    }
}

/// Counters for occupancy bookkeeping.
#[derive(Debug, Default, Clone)]
pub struct OccupancyStats {
    /// Total enter operations.
    pub enters: u64,
    /// Total leave operations.
    pub leaves: u64,
    /// Leaves that had no matching enter.
    pub unmatched_leaves: u64,
    /// Most regions simultaneously occupied.
    pub peak_occupied: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: i64) -> RegionId {
        RegionId(id)
    }

    #[test]
    fn test_enter_leave_returns_to_empty() {
        let mut map = OccupancyMap::new();
        assert_eq!(map.enter(r(7)), Transition::Occupied);
        assert_eq!(map.leave(r(7)), Transition::Vacated);
        assert_eq!(map.count(r(7)), 0);
        assert_eq!(map.occupied_regions(), 0);
    }

    #[test]
    fn test_threshold_fires_once_per_direction() {
        let mut map = OccupancyMap::new();
        let mut shows = 0;
        let mut hides = 0;
        for _ in 0..5 {
            if map.enter(r(3)) == Transition::Occupied {
                shows += 1;
            }
        }
        for _ in 0..5 {
            if map.leave(r(3)) == Transition::Vacated {
                hides += 1;
            }
        }
        assert_eq!(shows, 1);
        assert_eq!(hides, 1);
        assert_eq!(map.count(r(3)), 0);
    }

    #[test]
    fn test_two_occupants_overlap() {
        let mut map = OccupancyMap::new();
        assert_eq!(map.enter(r(9)), Transition::Occupied);
        assert_eq!(map.enter(r(9)), Transition::Unchanged);
        assert_eq!(map.count(r(9)), 2);

        assert_eq!(map.leave(r(9)), Transition::Unchanged);
        assert_eq!(map.count(r(9)), 1);
        assert!(map.is_occupied(r(9)));

        assert_eq!(map.leave(r(9)), Transition::Vacated);
        assert!(!map.is_occupied(r(9)));
    }

    #[test]
    fn test_unmatched_leave_is_noop() {
        let mut map = OccupancyMap::new();
        assert_eq!(map.leave(r(1)), Transition::Unchanged);
        assert_eq!(map.count(r(1)), 0);
        assert_eq!(map.stats().unmatched_leaves, 1);

        // A later enter still behaves as the first occupant.
        assert_eq!(map.enter(r(1)), Transition::Occupied);
    }

    #[test]
    fn test_independent_regions() {
        let mut map = OccupancyMap::new();
        map.enter(r(1));
        map.enter(r(2));
        assert_eq!(map.occupied_regions(), 2);
        assert_eq!(map.leave(r(1)), Transition::Vacated);
        assert!(map.is_occupied(r(2)));
    }
}
