//! # Proximity Triggers
//!
//! Per-entity distance triggers with hysteresis, used for portals, video
//! pads, and similar walk-up interactions. Independent of the region grid:
//! a watcher owns a radius around its entity and emits enter/leave events
//! as avatars cross it.
//!
//! Hysteresis keeps the trigger stable at the boundary: an avatar already
//! inside stays inside until it moves past `radius + fuzz`, while an
//! outside avatar must come within `radius` to enter.

use crate::config::ProximityConfig;
use crate::events::{topics, EventBus, ProximityEnterEvent, ProximityLeaveEvent};
use crate::scene::Entity;
use crate::types::EntityId;
use dashmap::DashSet;
use std::sync::Arc;

/// Watches the space around one entity for approaching avatars.
#[derive(Debug)]
pub struct ProximityWatcher {
    entity: Arc<Entity>,
    radius: f64,
    fuzz: f64,
    inside: DashSet<EntityId>,
    events: Arc<EventBus>,
}

impl ProximityWatcher {
    /// Creates a watcher around `entity`.
    pub fn new(entity: Arc<Entity>, config: &ProximityConfig, events: Arc<EventBus>) -> Self {
        Self {
            entity,
            radius: config.radius,
            fuzz: config.fuzz,
            inside: DashSet::new(),
            events,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }

    /// Whether an avatar is currently inside the trigger.
    pub fn is_inside(&self, avatar: EntityId) -> bool {
        self.inside.contains(&avatar)
    }

    /// Per-frame update against the current avatar set.
    ///
    /// Avatars absent from `avatars` (left the room) are dropped without a
    /// leave event; transitions are only meaningful for live entities.
    pub async fn tick(&self, avatars: &[Arc<Entity>]) {
        self.inside
            .retain(|id| avatars.iter().any(|a| a.id() == *id));

        let center = self.entity.position();
        for avatar in avatars {
            let distance = center.distance(avatar.position());
            let was_inside = self.inside.contains(&avatar.id());
            let threshold = if was_inside {
                self.radius + self.fuzz
            } else {
                self.radius
            };
            let is_inside = distance < threshold;

            if is_inside && !was_inside {
                self.inside.insert(avatar.id());
                let event = ProximityEnterEvent {
                    watcher: self.entity.id(),
                    avatar: avatar.id(),
                    distance,
                };
                if let Err(e) = self.events.emit(topics::PROXIMITY_ENTER, &event).await {
                    tracing::warn!("failed to publish proximity enter: {}", e);
                }
            } else if !is_inside && was_inside {
                self.inside.remove(&avatar.id());
                let event = ProximityLeaveEvent {
                    watcher: self.entity.id(),
                    avatar: avatar.id(),
                    distance,
                };
                if let Err(e) = self.events.emit(topics::PROXIMITY_LEAVE, &event).await {
                    tracing::warn!("failed to publish proximity leave: {}", e);
                }
            }
        }
    }
}
