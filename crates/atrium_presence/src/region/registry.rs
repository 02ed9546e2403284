//! # Follower Registry
//!
//! Tracks every live region follower so occupancy transitions can be
//! broadcast to all objects tagged with a region. Followers register on
//! attach and deregister by entity identity on detach; consumers only ever
//! iterate the full list.

use crate::region::follower::{AvatarFollower, ObjectFollower};
use crate::types::EntityId;
use parking_lot::RwLock;
use std::sync::Arc;

/// The two follower roles a registry distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowerKind {
    /// Avatar followers drive occupancy counts.
    Avatar,
    /// Object followers receive visibility broadcasts.
    Object,
}

/// Ordered lists of live followers, one per role.
#[derive(Debug, Default)]
pub struct FollowerRegistry {
    avatars: RwLock<Vec<Arc<AvatarFollower>>>,
    objects: RwLock<Vec<Arc<ObjectFollower>>>,
}

impl FollowerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_avatar(&self, follower: Arc<AvatarFollower>) {
        self.avatars.write().push(follower);
    }

    /// Removes the avatar follower owned by `entity`, returning it so the
    /// caller can release its occupancy.
    pub fn deregister_avatar(&self, entity: EntityId) -> Option<Arc<AvatarFollower>> {
        let mut avatars = self.avatars.write();
        let index = avatars.iter().position(|f| f.entity_id() == entity)?;
        Some(avatars.remove(index))
    }

    pub fn register_object(&self, follower: Arc<ObjectFollower>) {
        self.objects.write().push(follower);
    }

    /// Removes the object follower owned by `entity`.
    pub fn deregister_object(&self, entity: EntityId) -> Option<Arc<ObjectFollower>> {
        let mut objects = self.objects.write();
        let index = objects.iter().position(|f| f.entity_id() == entity)?;
        Some(objects.remove(index))
    }

    /// Snapshot of every live avatar follower, in registration order.
    pub fn avatars(&self) -> Vec<Arc<AvatarFollower>> {
        self.avatars.read().clone()
    }

    /// Snapshot of every live object follower, in registration order.
    pub fn objects(&self) -> Vec<Arc<ObjectFollower>> {
        self.objects.read().clone()
    }

    /// Whether `entity` already carries a follower of either role.
    pub fn is_registered(&self, entity: EntityId) -> bool {
        self.avatars.read().iter().any(|f| f.entity_id() == entity)
            || self.objects.read().iter().any(|f| f.entity_id() == entity)
    }

    /// Number of live followers of one role.
    pub fn len(&self, kind: FollowerKind) -> usize {
        match kind {
            FollowerKind::Avatar => self.avatars.read().len(),
            FollowerKind::Object => self.objects.read().len(),
        }
    }
}
