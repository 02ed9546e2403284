//! # Region Hider
//!
//! Scene-level orchestrator for region-based visibility. Discovers avatars
//! and media objects, tags them with follower roles, walks the static
//! environment once it loads, and keeps scanning for newly appeared
//! entities every tick.
//!
//! The hider only operates in scenes that carry a navigation mesh; without
//! one there is nowhere to walk, so far-away content can never be out of
//! reach and hiding it would only cause pop-in.

use crate::config::{parse_size_suffix, PresenceConfig, DEFAULT_CELL_SIZE, INACTIVE_CELL_SIZE};
use crate::events::{topics, EnvironmentLoadedEvent};
use crate::region::service::RegionService;
use crate::scene::{EntityKind, Scene};
use crate::types::EntityId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Orchestrates region-based visibility for one scene.
#[derive(Debug)]
pub struct RegionHider {
    scene: Arc<Scene>,
    service: Option<Arc<RegionService>>,
    cell_size: f64,
    env_pending: AtomicBool,
}

impl RegionHider {
    /// Creates a hider for `scene` and performs the initial entity scan.
    ///
    /// `node_name` is the name of the owning scene node; when the typed
    /// configuration does not pin a cell size, a trailing `_<integer>`
    /// suffix on that name supplies one, falling back to
    /// [`DEFAULT_CELL_SIZE`] with a warning on a malformed suffix.
    pub fn new(
        scene: Arc<Scene>,
        config: &PresenceConfig,
        node_name: Option<&str>,
    ) -> Arc<Self> {
        let (service, cell_size) = if scene.has_nav_mesh() {
            let cell_size = Self::resolve_cell_size(config, node_name);
            (Some(RegionService::new(cell_size)), cell_size)
        } else {
            tracing::warn!("scene has no navigation mesh; region hiding disabled");
            (None, INACTIVE_CELL_SIZE)
        };

        let hider = Arc::new(Self {
            scene: scene.clone(),
            service,
            cell_size,
            // The environment may already be in place by the time the hider
            // attaches.
            env_pending: AtomicBool::new(scene.environment_root().is_some()),
        });

        let weak = Arc::downgrade(&hider);
        scene
            .events()
            .on::<EnvironmentLoadedEvent, _>(topics::ENVIRONMENT_LOADED, move |_| {
                if let Some(hider) = weak.upgrade() {
                    hider.env_pending.store(true, Ordering::SeqCst);
                }
                Ok(())
            });

        hider.scan();
        hider
    }

    fn resolve_cell_size(config: &PresenceConfig, node_name: Option<&str>) -> f64 {
        if let Some(size) = config.region.cell_size {
            return size;
        }
        match node_name {
            Some(name) => match parse_size_suffix(name) {
                Ok(size) => size,
                Err(e) => {
                    tracing::warn!(
                        "falling back to cell size {}: {}",
                        DEFAULT_CELL_SIZE,
                        e
                    );
                    DEFAULT_CELL_SIZE
                }
            },
            None => DEFAULT_CELL_SIZE,
        }
    }

    /// Whether the hider passed its preconditions and is operating.
    pub fn is_active(&self) -> bool {
        self.service.is_some()
    }

    /// The resolved grid cell size; [`INACTIVE_CELL_SIZE`] when disabled.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// The underlying region service, when active.
    pub fn service(&self) -> Option<&Arc<RegionService>> {
        self.service.as_ref()
    }

    /// Scans the live scene for entities that need follower roles.
    ///
    /// Avatars get avatar followers; pinned media and camera tools get
    /// dynamic object followers. Already-tagged entities are skipped, so
    /// calling this every tick is cheap and idempotent.
    pub fn scan(&self) {
        let Some(service) = &self.service else {
            return;
        };
        for entity in self.scene.all_entities() {
            if service.registry().is_registered(entity.id()) {
                continue;
            }
            match entity.kind() {
                EntityKind::Avatar => {
                    service.attach_avatar(entity);
                }
                EntityKind::PinnedMedia | EntityKind::CameraTool => {
                    service.attach_object(entity, true);
                }
                _ => {}
            }
        }
    }

    fn scan_environment(&self) {
        let Some(service) = &self.service else {
            return;
        };
        let Some(root) = self.scene.environment_root() else {
            return;
        };
        let mut attached = 0;
        for child in root.children() {
            if child.kind().excluded_from_region_hiding() {
                continue;
            }
            if child.has_descendant_of_kind(EntityKind::NavMesh) {
                continue;
            }
            if service.registry().is_registered(child.id()) {
                continue;
            }
            service.attach_object(child, false);
            attached += 1;
        }
        service.refresh_all();
        tracing::info!(
            "environment scan attached {} static followers (cell size {})",
            attached,
            self.cell_size
        );
    }

    /// Detaches whatever follower role `entity` carried. Call when an
    /// entity is removed from the scene, or its registration and occupancy
    /// will leak.
    pub fn entity_removed(&self, entity: EntityId) {
        if let Some(service) = &self.service {
            service.detach_avatar(entity);
            service.detach_object(entity);
        }
    }

    /// Per-frame update: process a pending environment load, rescan for new
    /// entities, advance the region service, and publish any visibility
    /// transitions on the scene's event bus.
    pub async fn tick(&self) {
        let Some(service) = &self.service else {
            return;
        };
        if self.env_pending.swap(false, Ordering::SeqCst) {
            self.scan_environment();
        }
        self.scan();
        service.tick();

        for event in service.drain_visibility_events() {
            if let Err(e) = self
                .scene
                .events()
                .emit(topics::REGION_VISIBILITY, &event)
                .await
            {
                tracing::warn!("failed to publish region visibility: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::scene::Entity;
    use crate::types::Vec3;

    fn scene_with_navmesh() -> Arc<Scene> {
        let scene = Scene::new(EventBus::new());
        scene.spawn(Entity::builder("navmesh", EntityKind::NavMesh).build());
        scene
    }

    #[test]
    fn test_disabled_without_navmesh() {
        let scene = Scene::new(EventBus::new());
        let hider = RegionHider::new(scene, &PresenceConfig::default(), None);
        assert!(!hider.is_active());
        assert_eq!(hider.cell_size(), INACTIVE_CELL_SIZE);
    }

    #[test]
    fn test_cell_size_resolution() {
        let config = PresenceConfig::default();

        let hider = RegionHider::new(scene_with_navmesh(), &config, Some("lobby_25"));
        assert_eq!(hider.cell_size(), 25.0);

        // Malformed suffix warns and falls back.
        let hider = RegionHider::new(scene_with_navmesh(), &config, Some("lobby_big"));
        assert_eq!(hider.cell_size(), DEFAULT_CELL_SIZE);

        // Explicit configuration wins over the suffix.
        let mut config = PresenceConfig::default();
        config.region.cell_size = Some(40.0);
        let hider = RegionHider::new(scene_with_navmesh(), &config, Some("lobby_25"));
        assert_eq!(hider.cell_size(), 40.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_scan_tags_avatars_and_media() {
        let scene = scene_with_navmesh();
        let avatar = scene.spawn(Entity::builder("avatar", EntityKind::Avatar).build());
        scene.spawn(Entity::builder("poster", EntityKind::PinnedMedia).build());

        let hider = RegionHider::new(scene.clone(), &PresenceConfig::default(), None);
        let service = hider.service().expect("active");
        assert!(service.registry().is_registered(avatar.id()));
        assert_eq!(service.stats().avatar_followers, 1);
        assert_eq!(service.stats().object_followers, 1);

        // A late joiner is picked up by the per-tick rescan.
        let late = scene.spawn(Entity::builder("late", EntityKind::Avatar).build());
        hider.tick().await;
        assert!(service.registry().is_registered(late.id()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_environment_scan_applies_exclusions() {
        let scene = scene_with_navmesh();
        let hider = RegionHider::new(scene.clone(), &PresenceConfig::default(), None);

        let root = Entity::builder("environment", EntityKind::Environment).build();
        let mesh = Entity::builder("seating", EntityKind::Environment)
            .position(Vec3::new(50.0, 0.0, 50.0))
            .build();
        let skybox = Entity::builder("sky", EntityKind::Skybox).build();
        let walkable = Entity::builder("walkable", EntityKind::Environment).build();
        walkable.add_child(Entity::builder("navmesh", EntityKind::NavMesh).build());
        root.add_child(mesh.clone());
        root.add_child(skybox.clone());
        root.add_child(walkable.clone());

        scene.load_environment(root).await;
        hider.tick().await;

        let service = hider.service().expect("active");
        assert!(service.registry().is_registered(mesh.id()));
        assert!(!service.registry().is_registered(skybox.id()));
        assert!(
            !service.registry().is_registered(walkable.id()),
            "children holding the navmesh stay visible"
        );
        // No avatar near the seating mesh: refresh_all hides it.
        assert!(!mesh.is_visible());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_entity_removed_releases_occupancy() {
        let scene = scene_with_navmesh();
        let avatar = scene.spawn(
            Entity::builder("avatar", EntityKind::Avatar)
                .position(Vec3::new(5.0, 0.0, 5.0))
                .build(),
        );
        let hider = RegionHider::new(scene.clone(), &PresenceConfig::default(), None);
        let service = hider.service().expect("active").clone();
        let region = service.grid().tag(avatar.position());
        assert_eq!(service.count(region), 1);

        scene.remove(avatar.id());
        hider.entity_removed(avatar.id());
        assert_eq!(service.count(region), 0);
        assert_eq!(service.stats().avatar_followers, 0);
    }
}
