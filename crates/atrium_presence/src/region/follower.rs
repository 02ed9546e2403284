//! # Region Followers
//!
//! Per-entity components that keep an entity's grid region current.
//! Avatar followers drive occupancy counts; object followers are the
//! targets of show/hide broadcasts and additionally pause and resume any
//! attached video media so hidden content stops consuming playback.

use crate::region::grid::RegionGrid;
use crate::scene::Entity;
use crate::types::{EntityId, RegionId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Tracks the region an avatar currently stands in.
#[derive(Debug)]
pub struct AvatarFollower {
    entity: Arc<Entity>,
    grid: RegionGrid,
    region: Mutex<RegionId>,
}

impl AvatarFollower {
    /// Creates a follower, computing the initial region from the avatar's
    /// live position.
    pub fn new(entity: Arc<Entity>, grid: RegionGrid) -> Self {
        let region = grid.tag(entity.position());
        Self {
            entity,
            grid,
            region: Mutex::new(region),
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    /// The region the avatar was last observed in.
    pub fn region(&self) -> RegionId {
        *self.region.lock()
    }

    /// Recomputes the region from the live position.
    ///
    /// Returns `Some((old, new))` when the avatar crossed a cell boundary
    /// since the last observation, so the caller can move its occupancy.
    pub(crate) fn retag(&self) -> Option<(RegionId, RegionId)> {
        let next = self.grid.tag(self.entity.position());
        let mut current = self.region.lock();
        if next == *current {
            return None;
        }
        let previous = *current;
        *current = next;
        Some((previous, next))
    }
}

/// Tracks the region an object sits in and applies visibility broadcasts.
#[derive(Debug)]
pub struct ObjectFollower {
    entity: Arc<Entity>,
    grid: RegionGrid,
    dynamic: bool,
    region: Mutex<RegionId>,
    // Playback state captured at hide time, restored exactly on show.
    was_paused: Mutex<Option<bool>>,
}

impl ObjectFollower {
    /// Creates a follower for an object.
    ///
    /// Static objects (`dynamic = false`) compute their region once here
    /// and never again; fixed environment geometry does not move.
    pub fn new(entity: Arc<Entity>, grid: RegionGrid, dynamic: bool) -> Self {
        let region = grid.tag(entity.position());
        Self {
            entity,
            grid,
            dynamic,
            region: Mutex::new(region),
            was_paused: Mutex::new(None),
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }

    /// The region the object was last tagged with.
    pub fn region(&self) -> RegionId {
        *self.region.lock()
    }

    /// Whether the object is expected to move.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Recomputes the region from the live position; static objects skip
    /// this entirely.
    pub(crate) fn retag(&self) -> Option<(RegionId, RegionId)> {
        if !self.dynamic {
            return None;
        }
        let next = self.grid.tag(self.entity.position());
        let mut current = self.region.lock();
        if next == *current {
            return None;
        }
        let previous = *current;
        *current = next;
        Some((previous, next))
    }

    /// Applies a visibility broadcast to the owning entity.
    ///
    /// Hiding pauses attached video after recording whether it was already
    /// paused; showing restores that exact state rather than blindly
    /// resuming.
    pub fn show_hide(&self, visible: bool) {
        if self.entity.is_visible() == visible {
            return;
        }
        self.entity.set_visible(visible);

        let Some(video) = self.entity.video() else {
            return;
        };
        if visible {
            if let Some(was_paused) = self.was_paused.lock().take() {
                if !was_paused {
                    video.play();
                }
            }
        } else {
            *self.was_paused.lock() = Some(video.is_paused());
            video.pause();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EntityKind, VideoPlayable, VideoState};
    use crate::types::Vec3;

    fn grid() -> RegionGrid {
        RegionGrid::new(10.0)
    }

    #[test]
    fn test_avatar_retag_on_cell_crossing() {
        let entity = Entity::builder("avatar", EntityKind::Avatar)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build();
        let follower = AvatarFollower::new(entity.clone(), grid());
        let start = follower.region();

        // Still inside the same cell.
        entity.set_position(Vec3::new(9.0, 1.5, 5.0));
        assert!(follower.retag().is_none());

        entity.set_position(Vec3::new(15.0, 0.0, 5.0));
        let (old, new) = follower.retag().expect("crossed a boundary");
        assert_eq!(old, start);
        assert_eq!(new, follower.region());
        assert_ne!(old, new);

        // Stationary afterwards.
        assert!(follower.retag().is_none());
    }

    #[test]
    fn test_static_object_never_retags() {
        let entity = Entity::builder("bench", EntityKind::Environment)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build();
        let follower = ObjectFollower::new(entity.clone(), grid(), false);
        let region = follower.region();

        entity.set_position(Vec3::new(500.0, 0.0, 500.0));
        assert!(follower.retag().is_none());
        assert_eq!(follower.region(), region);
    }

    #[test]
    fn test_dynamic_object_retags() {
        let entity = Entity::builder("drone", EntityKind::PinnedMedia)
            .position(Vec3::new(5.0, 0.0, 5.0))
            .build();
        let follower = ObjectFollower::new(entity.clone(), grid(), true);
        entity.set_position(Vec3::new(25.0, 0.0, 5.0));
        assert!(follower.retag().is_some());
    }

    #[test]
    fn test_show_hide_restores_playing_video() {
        let video = VideoState::new(false);
        let entity = Entity::builder("screen", EntityKind::PinnedMedia)
            .video(video.clone())
            .build();
        let follower = ObjectFollower::new(entity.clone(), grid(), false);

        follower.show_hide(false);
        assert!(!entity.is_visible());
        assert!(video.is_paused());

        follower.show_hide(true);
        assert!(entity.is_visible());
        assert!(!video.is_paused());
    }

    #[test]
    fn test_show_hide_keeps_paused_video_paused() {
        let video = VideoState::new(true);
        let entity = Entity::builder("screen", EntityKind::PinnedMedia)
            .video(video.clone())
            .build();
        let follower = ObjectFollower::new(entity.clone(), grid(), false);

        follower.show_hide(false);
        follower.show_hide(true);
        assert!(entity.is_visible());
        assert!(video.is_paused(), "pre-hide paused state must be restored");
    }

    #[test]
    fn test_show_hide_is_idempotent() {
        let video = VideoState::new(false);
        let entity = Entity::builder("screen", EntityKind::PinnedMedia)
            .video(video.clone())
            .build();
        let follower = ObjectFollower::new(entity.clone(), grid(), false);

        follower.show_hide(false);
        follower.show_hide(false);
        follower.show_hide(true);
        assert!(!video.is_paused(), "double hide must not clobber the recorded state");
    }
}
