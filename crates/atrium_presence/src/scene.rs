//! # Scene Model
//!
//! An in-process stand-in for the host scene runtime: typed entities with
//! positions, visibility, optional video capability, and a parent/child
//! environment graph. The presence services attach to these entities the
//! way their production counterparts attach to host scene-graph nodes.
//!
//! Lifecycle one-shots (`environment_loaded`, `model_loaded`,
//! `network_connected`) are delivered over the [`EventBus`] so consumers
//! can defer initialization until the scene is ready.

use crate::events::{topics, EnvironmentLoadedEvent, EventBus, ModelLoadedEvent};
use crate::types::{EntityId, Vec3};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Classification of scene entities.
///
/// Mirrors the kinds of nodes a virtual-room scene graph carries: live
/// participants, user-placed media, camera tools, and the fixed environment
/// kinds that region hiding must skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A connected participant's avatar.
    Avatar,
    /// User-pinned or dropped media (images, video panes).
    PinnedMedia,
    /// A camera tool placed into the room.
    CameraTool,
    /// An interactive scripted object.
    Interactive,
    /// A static environment mesh.
    Environment,
    /// A navigation waypoint marker.
    Waypoint,
    /// The sky dome.
    Skybox,
    /// A light source.
    Light,
    /// A navigation-mesh marker.
    NavMesh,
    /// The combined static environment mesh.
    CombinedMesh,
    /// A scene-preview camera.
    PreviewCamera,
}

impl EntityKind {
    /// Whether region hiding must never manage this kind of entity.
    ///
    /// Hiding any of these would break navigation, lighting, or the sky for
    /// every participant regardless of where they stand.
    pub fn excluded_from_region_hiding(&self) -> bool {
        matches!(
            self,
            EntityKind::Waypoint
                | EntityKind::Skybox
                | EntityKind::Light
                | EntityKind::NavMesh
                | EntityKind::CombinedMesh
                | EntityKind::PreviewCamera
        )
    }
}

/// Capability trait for entities that carry playable video media.
///
/// Region hiding pauses video on hide and restores the exact pre-hide
/// playback state on show, so the capability exposes the paused flag rather
/// than a bare toggle.
pub trait VideoPlayable: Send + Sync + Debug {
    /// Whether playback is currently paused.
    fn is_paused(&self) -> bool;
    /// Resumes playback.
    fn play(&self);
    /// Pauses playback.
    fn pause(&self);
}

/// Default in-memory video capability implementation.
#[derive(Debug)]
pub struct VideoState {
    paused: AtomicBool,
}

impl VideoState {
    /// Creates a video state, initially playing or paused.
    pub fn new(paused: bool) -> Arc<Self> {
        Arc::new(Self {
            paused: AtomicBool::new(paused),
        })
    }
}

impl VideoPlayable for VideoState {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn play(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }
}

/// A node in the scene.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    kind: EntityKind,
    position: RwLock<Vec3>,
    visible: AtomicBool,
    model_loaded: AtomicBool,
    media_loaded: AtomicBool,
    footprint: Option<f64>,
    video: Option<Arc<dyn VideoPlayable>>,
    children: RwLock<Vec<Arc<Entity>>>,
}

/// Builder for [`Entity`].
pub struct EntityBuilder {
    name: String,
    kind: EntityKind,
    position: Vec3,
    footprint: Option<f64>,
    video: Option<Arc<dyn VideoPlayable>>,
    model_loaded: bool,
}

impl EntityBuilder {
    /// Sets the world position.
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the world-space footprint (side length) the entity occupies.
    pub fn footprint(mut self, footprint: f64) -> Self {
        self.footprint = Some(footprint);
        self
    }

    /// Attaches a video capability.
    pub fn video(mut self, video: Arc<dyn VideoPlayable>) -> Self {
        self.video = Some(video);
        self
    }

    /// Marks the entity's model as already loaded at spawn time.
    pub fn model_ready(mut self) -> Self {
        self.model_loaded = true;
        self
    }

    /// Finalizes the entity.
    pub fn build(self) -> Arc<Entity> {
        // Media is considered loaded up front unless a media capability is
        // actually attached.
        let media_loaded = self.video.is_none();
        Arc::new(Entity {
            id: EntityId::new(),
            name: self.name,
            kind: self.kind,
            position: RwLock::new(self.position),
            visible: AtomicBool::new(true),
            model_loaded: AtomicBool::new(self.model_loaded),
            media_loaded: AtomicBool::new(media_loaded),
            footprint: self.footprint,
            video: self.video,
            children: RwLock::new(Vec::new()),
        })
    }
}

impl Entity {
    /// Starts building an entity of the given kind.
    pub fn builder(name: impl Into<String>, kind: EntityKind) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            kind,
            position: Vec3::zero(),
            footprint: None,
            video: None,
            model_loaded: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn position(&self) -> Vec3 {
        *self.position.read()
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.write() = position;
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    /// The entity's video capability, if it carries one.
    pub fn video(&self) -> Option<&Arc<dyn VideoPlayable>> {
        self.video.as_ref()
    }

    /// World-space footprint (side length), when known.
    pub fn footprint(&self) -> Option<f64> {
        self.footprint
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model_loaded.load(Ordering::SeqCst)
    }

    pub fn is_media_loaded(&self) -> bool {
        self.media_loaded.load(Ordering::SeqCst)
    }

    /// Adds a child node to this entity's subtree.
    pub fn add_child(&self, child: Arc<Entity>) {
        self.children.write().push(child);
    }

    /// Snapshot of the direct children.
    pub fn children(&self) -> Vec<Arc<Entity>> {
        self.children.read().clone()
    }

    /// Whether any descendant (at any depth) is of the given kind.
    pub fn has_descendant_of_kind(&self, kind: EntityKind) -> bool {
        self.children
            .read()
            .iter()
            .any(|c| c.kind == kind || c.has_descendant_of_kind(kind))
    }
}

/// The live scene: entity storage, the environment graph, and lifecycle
/// event emission.
#[derive(Debug)]
pub struct Scene {
    entities: DashMap<EntityId, Arc<Entity>>,
    environment_root: RwLock<Option<Arc<Entity>>>,
    events: Arc<EventBus>,
}

impl Scene {
    /// Creates an empty scene wired to an event bus.
    pub fn new(events: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            entities: DashMap::new(),
            environment_root: RwLock::new(None),
            events,
        })
    }

    /// The scene's event bus.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Inserts an entity into the scene.
    pub fn spawn(&self, entity: Arc<Entity>) -> Arc<Entity> {
        self.entities.insert(entity.id(), entity.clone());
        entity
    }

    /// Removes an entity from the scene.
    pub fn remove(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.remove(&id).map(|(_, e)| e)
    }

    pub fn get(&self, id: EntityId) -> Option<Arc<Entity>> {
        self.entities.get(&id).map(|e| e.value().clone())
    }

    /// Snapshot of every live entity.
    pub fn all_entities(&self) -> Vec<Arc<Entity>> {
        self.entities.iter().map(|e| e.value().clone()).collect()
    }

    /// Snapshot of live entities of one kind.
    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<Arc<Entity>> {
        self.entities
            .iter()
            .filter(|e| e.kind() == kind)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Whether the scene carries a navigation mesh, either as a live entity
    /// or inside the environment graph.
    pub fn has_nav_mesh(&self) -> bool {
        if self
            .entities
            .iter()
            .any(|e| e.kind() == EntityKind::NavMesh)
        {
            return true;
        }
        self.environment_root
            .read()
            .as_ref()
            .map(|root| {
                root.kind() == EntityKind::NavMesh
                    || root.has_descendant_of_kind(EntityKind::NavMesh)
            })
            .unwrap_or(false)
    }

    /// Installs the static environment graph and announces it.
    pub async fn load_environment(&self, root: Arc<Entity>) {
        let root_id = root.id();
        *self.environment_root.write() = Some(root);
        if let Err(e) = self
            .events
            .emit(
                topics::ENVIRONMENT_LOADED,
                &EnvironmentLoadedEvent { root: root_id },
            )
            .await
        {
            tracing::warn!("Failed to announce environment load: {}", e);
        }
    }

    /// The environment graph root, once loaded.
    pub fn environment_root(&self) -> Option<Arc<Entity>> {
        self.environment_root.read().clone()
    }

    /// Flags an entity's model as loaded and announces it.
    pub async fn mark_model_loaded(&self, id: EntityId) {
        if let Some(entity) = self.get(id) {
            entity.model_loaded.store(true, Ordering::SeqCst);
            if let Err(e) = self
                .events
                .emit(topics::MODEL_LOADED, &ModelLoadedEvent { entity: id })
                .await
            {
                tracing::warn!("Failed to announce model load for {}: {}", id, e);
            }
        }
    }

    /// Flags an entity's media as loaded.
    pub fn mark_media_loaded(&self, id: EntityId) {
        if let Some(entity) = self.get(id) {
            entity.media_loaded.store(true, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_kinds() {
        assert!(EntityKind::Skybox.excluded_from_region_hiding());
        assert!(EntityKind::NavMesh.excluded_from_region_hiding());
        assert!(!EntityKind::PinnedMedia.excluded_from_region_hiding());
        assert!(!EntityKind::Environment.excluded_from_region_hiding());
    }

    #[test]
    fn test_descendant_search() {
        let root = Entity::builder("environment", EntityKind::Environment).build();
        let mid = Entity::builder("walkable", EntityKind::Environment).build();
        mid.add_child(
            Entity::builder("navmesh", EntityKind::NavMesh).build(),
        );
        root.add_child(mid);
        assert!(root.has_descendant_of_kind(EntityKind::NavMesh));
        assert!(!root.has_descendant_of_kind(EntityKind::Skybox));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_environment_load_announcement() {
        let bus = EventBus::new();
        let scene = Scene::new(bus.clone());
        let seen = Arc::new(AtomicBool::new(false));
        {
            let seen = seen.clone();
            bus.on::<EnvironmentLoadedEvent, _>(topics::ENVIRONMENT_LOADED, move |_| {
                seen.store(true, Ordering::SeqCst);
                Ok(())
            });
        }
        scene
            .load_environment(Entity::builder("env", EntityKind::Environment).build())
            .await;
        assert!(seen.load(Ordering::SeqCst));
        assert!(scene.environment_root().is_some());
    }

    #[test]
    fn test_media_loaded_defaults() {
        let plain = Entity::builder("image", EntityKind::PinnedMedia).build();
        assert!(plain.is_media_loaded());

        let video = Entity::builder("video", EntityKind::PinnedMedia)
            .video(VideoState::new(false))
            .build();
        assert!(!video.is_media_loaded());
    }
}
