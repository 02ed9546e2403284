//! # Region Service
//!
//! The single owner of the region-visibility state: the grid, the
//! occupancy counts, and the follower registry. Avatar followers feed
//! occupancy through this service, and 0↔1 transitions broadcast show/hide
//! to every object follower tagged with the affected region.
//!
//! All mutation happens synchronously inside a caller's tick, so the
//! occupancy lock is never held across a broadcast and increments and
//! decrements commute regardless of per-frame entity ordering.

use crate::events::RegionVisibilityEvent;
use crate::region::follower::{AvatarFollower, ObjectFollower};
use crate::region::grid::RegionGrid;
use crate::region::occupancy::{OccupancyMap, OccupancyStats, Transition};
use crate::region::registry::{FollowerKind, FollowerRegistry};
use crate::scene::Entity;
use crate::types::{EntityId, RegionId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Region-visibility state for one scene.
#[derive(Debug)]
pub struct RegionService {
    grid: RegionGrid,
    occupancy: Mutex<OccupancyMap>,
    registry: FollowerRegistry,
    shows: AtomicU64,
    hides: AtomicU64,
    // Visibility transitions waiting to be published on the event bus by
    // whichever async driver owns this service.
    pending_events: Mutex<Vec<RegionVisibilityEvent>>,
}

impl RegionService {
    /// Creates a service over a grid with the given cell size.
    pub fn new(cell_size: f64) -> Arc<Self> {
        Arc::new(Self {
            grid: RegionGrid::new(cell_size),
            occupancy: Mutex::new(OccupancyMap::new()),
            registry: FollowerRegistry::new(),
            shows: AtomicU64::new(0),
            hides: AtomicU64::new(0),
            pending_events: Mutex::new(Vec::new()),
        })
    }

    pub fn grid(&self) -> RegionGrid {
        self.grid
    }

    pub fn registry(&self) -> &FollowerRegistry {
        &self.registry
    }

    /// Attaches an avatar follower: computes the current region, counts the
    /// avatar into it, and registers the follower.
    pub fn attach_avatar(&self, entity: Arc<Entity>) -> Arc<AvatarFollower> {
        let follower = Arc::new(AvatarFollower::new(entity, self.grid));
        self.apply_enter(follower.region());
        self.registry.register_avatar(follower.clone());
        tracing::debug!(
            "avatar {} attached in {}",
            follower.entity_id(),
            follower.region()
        );
        follower
    }

    /// Detaches an avatar follower, releasing its last region.
    pub fn detach_avatar(&self, entity: EntityId) {
        if let Some(follower) = self.registry.deregister_avatar(entity) {
            self.apply_leave(follower.region());
        }
    }

    /// Attaches an object follower. Objects never contribute to occupancy;
    /// they only receive visibility broadcasts.
    pub fn attach_object(&self, entity: Arc<Entity>, dynamic: bool) -> Arc<ObjectFollower> {
        let follower = Arc::new(ObjectFollower::new(entity, self.grid, dynamic));
        self.registry.register_object(follower.clone());
        follower
    }

    /// Detaches an object follower.
    pub fn detach_object(&self, entity: EntityId) {
        self.registry.deregister_object(entity);
    }

    /// Per-frame update: recompute avatar regions (moving occupancy on
    /// boundary crossings) and reconcile dynamic objects that crossed into
    /// a differently-occupied region.
    pub fn tick(&self) {
        for avatar in self.registry.avatars() {
            if let Some((old, new)) = avatar.retag() {
                self.apply_leave(old);
                self.apply_enter(new);
            }
        }
        for object in self.registry.objects() {
            if let Some((_, new)) = object.retag() {
                object.show_hide(self.is_occupied(new));
            }
        }
    }

    /// Reconciles every object follower's visibility against current
    /// occupancy. Run once after the environment scene loads, to pick up
    /// occupancy established before the static objects existed.
    pub fn refresh_all(&self) {
        let objects = self.registry.objects();
        for object in objects {
            let visible = self.is_occupied(object.region());
            object.show_hide(visible);
        }
    }

    /// Current occupant count for a region.
    pub fn count(&self, region: RegionId) -> usize {
        self.occupancy.lock().count(region)
    }

    /// Whether a region currently has any occupants.
    pub fn is_occupied(&self, region: RegionId) -> bool {
        self.occupancy.lock().is_occupied(region)
    }

    /// Snapshot of the occupancy counters.
    pub fn occupancy_stats(&self) -> OccupancyStats {
        self.occupancy.lock().stats().clone()
    }

    /// Snapshot of service-level counters.
    pub fn stats(&self) -> RegionServiceStats {
        RegionServiceStats {
            shows: self.shows.load(Ordering::SeqCst),
            hides: self.hides.load(Ordering::SeqCst),
            avatar_followers: self.registry.len(FollowerKind::Avatar),
            object_followers: self.registry.len(FollowerKind::Object),
            occupied_regions: self.occupancy.lock().occupied_regions(),
        }
    }

    /// Drains visibility transitions accumulated since the last drain, for
    /// publication on an event bus.
    pub fn drain_visibility_events(&self) -> Vec<RegionVisibilityEvent> {
        std::mem::take(&mut *self.pending_events.lock())
    }

    fn apply_enter(&self, region: RegionId) {
        let transition = self.occupancy.lock().enter(region);
        if transition == Transition::Occupied {
            self.broadcast(region, true);
        }
    }

    fn apply_leave(&self, region: RegionId) {
        let transition = self.occupancy.lock().leave(region);
        if transition == Transition::Vacated {
            self.broadcast(region, false);
        }
    }

    fn broadcast(&self, region: RegionId, visible: bool) {
        if visible {
            self.shows.fetch_add(1, Ordering::SeqCst);
        } else {
            self.hides.fetch_add(1, Ordering::SeqCst);
        }
        for object in self.registry.objects() {
            if object.region() == region {
                object.show_hide(visible);
            }
        }
        self.pending_events
            .lock()
            .push(RegionVisibilityEvent { region, visible });
        tracing::debug!(
            "{} {} ({} objects considered)",
            region,
            if visible { "shown" } else { "hidden" },
            self.registry.len(FollowerKind::Object)
        );
    }
}

/// Service-level counters.
#[derive(Debug, Clone)]
pub struct RegionServiceStats {
    /// Show broadcasts fired (0→1 transitions).
    pub shows: u64,
    /// Hide broadcasts fired (1→0 transitions).
    pub hides: u64,
    /// Live avatar followers.
    pub avatar_followers: usize,
    /// Live object followers.
    pub object_followers: usize,
    /// Currently occupied regions.
    pub occupied_regions: usize,
}
