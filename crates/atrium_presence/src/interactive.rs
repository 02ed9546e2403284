//! # Interactive Component Scaffold
//!
//! A parameterized builder for networked-interactive 3D objects. Wires the
//! shared-state protocol plus click/drag input handling into a reusable
//! scaffold: configure the flags, attach to an entity, and drive the
//! component's tick from the scene loop.
//!
//! Initialization is an explicit state machine rather than nested
//! callbacks:
//!
//! ```text
//! Unloaded → ModelReady → MediaReady → NetworkBound → Active
//! ```
//!
//! Each step waits for the host condition it needs (model loaded, media
//! loaded, network connected) and no step is fatal; flags skip the steps
//! they disable, and removal cancels the machine wherever it stands.

use crate::scene::Entity;
use crate::sync::{NetworkAdapter, SharedDoc};
use crate::types::Vec3;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// Configuration flags for an interactive component.
#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    /// Suffix appended to the derived companion-entity key, so different
    /// component kinds on the same host entity never collide.
    pub kind: String,
    /// Replicate state through a companion networked entity.
    pub is_networked: bool,
    /// Expose a click handler.
    pub is_interactive: bool,
    /// Expose a drag handler.
    pub is_draggable: bool,
    /// Native side length of the component's content, used to scale it to
    /// the host entity's footprint.
    pub content_size: f64,
}

impl InteractiveConfig {
    fn new(kind: String) -> Self {
        Self {
            kind,
            is_networked: false,
            is_interactive: false,
            is_draggable: false,
            content_size: 1.0,
        }
    }
}

/// Initialization progress of an interactive component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateState {
    /// Waiting for the host model to load.
    Unloaded,
    /// Model loaded; waiting for attached media.
    ModelReady,
    /// Media ready; waiting for the network (when networked).
    MediaReady,
    /// Companion networked entity resolved.
    NetworkBound,
    /// Fully initialized and processing updates.
    Active,
    /// Entity was removed before or after initialization finished.
    Cancelled,
}

type ClickHandler = Box<dyn Fn() + Send + Sync>;
type DragHandler = Box<dyn Fn(Vec3) + Send + Sync>;
type RemoteUpdateHandler<T> = Box<dyn Fn(&T) + Send + Sync>;
type StateAccessor<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Builder for [`InteractiveComponent`].
pub struct InteractiveTemplate<T> {
    config: InteractiveConfig,
    net: Option<Arc<dyn NetworkAdapter>>,
    on_click: Option<ClickHandler>,
    on_drag: Option<DragHandler>,
    on_remote_update: Option<RemoteUpdateHandler<T>>,
}

impl<T> InteractiveTemplate<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Debug + Send + 'static,
{
    /// Starts a template for a component kind (e.g. `"shared-box"`).
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            config: InteractiveConfig::new(kind.into()),
            net: None,
            on_click: None,
            on_drag: None,
            on_remote_update: None,
        }
    }

    /// Sets the native content size used for footprint scaling.
    pub fn content_size(mut self, size: f64) -> Self {
        self.config.content_size = size;
        self
    }

    /// Replicates state through the given network adapter.
    pub fn networked(mut self, net: Arc<dyn NetworkAdapter>) -> Self {
        self.config.is_networked = true;
        self.net = Some(net);
        self
    }

    /// Exposes a click handler.
    pub fn interactive(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.config.is_interactive = true;
        self.on_click = Some(Box::new(handler));
        self
    }

    /// Exposes a drag handler.
    pub fn draggable(mut self, handler: impl Fn(Vec3) + Send + Sync + 'static) -> Self {
        self.config.is_draggable = true;
        self.on_drag = Some(Box::new(handler));
        self
    }

    /// Called with each adopted remote state update.
    pub fn on_remote_update(mut self, handler: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_remote_update = Some(Box::new(handler));
        self
    }

    /// Attaches the component to `entity`. `shared_state` supplies the
    /// component's current local state; it seeds the companion networked
    /// entity when this client creates it.
    pub fn attach(
        self,
        entity: Arc<Entity>,
        shared_state: impl Fn() -> T + Send + Sync + 'static,
    ) -> Arc<InteractiveComponent<T>> {
        Arc::new(InteractiveComponent {
            entity,
            config: self.config,
            net: self.net,
            state: Mutex::new(TemplateState::Unloaded),
            doc: Mutex::new(None),
            scale: Mutex::new(1.0),
            accessor: Box::new(shared_state),
            on_click: self.on_click,
            on_drag: self.on_drag,
            on_remote_update: self.on_remote_update,
        })
    }
}

/// A networked-interactive component attached to one entity.
pub struct InteractiveComponent<T> {
    entity: Arc<Entity>,
    config: InteractiveConfig,
    net: Option<Arc<dyn NetworkAdapter>>,
    state: Mutex<TemplateState>,
    doc: Mutex<Option<Arc<SharedDoc<T>>>>,
    scale: Mutex<f64>,
    accessor: StateAccessor<T>,
    on_click: Option<ClickHandler>,
    on_drag: Option<DragHandler>,
    on_remote_update: Option<RemoteUpdateHandler<T>>,
}

impl<T> InteractiveComponent<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Debug + Send + 'static,
{
    /// Current state-machine position.
    pub fn state(&self) -> TemplateState {
        *self.state.lock()
    }

    /// Uniform scale applied to the content after model load.
    pub fn scale(&self) -> f64 {
        *self.scale.lock()
    }

    /// The bound shared document, once networked initialization finished.
    pub fn doc(&self) -> Option<Arc<SharedDoc<T>>> {
        self.doc.lock().clone()
    }

    /// Advances the initialization machine and, once active, consumes
    /// pending remote updates.
    pub async fn tick(&self) {
        let state = self.state();
        match state {
            TemplateState::Unloaded => {
                if self.entity.is_model_loaded() {
                    self.internal_init();
                    self.advance(TemplateState::ModelReady);
                }
            }
            TemplateState::ModelReady => {
                if self.entity.is_media_loaded() {
                    self.advance(TemplateState::MediaReady);
                }
            }
            TemplateState::MediaReady => {
                if !self.config.is_networked {
                    self.advance(TemplateState::Active);
                    return;
                }
                // Wait for the connection rather than failing; the network
                // may come up frames after the model does.
                let Some(net) = &self.net else {
                    self.advance(TemplateState::Active);
                    return;
                };
                if !net.is_connected().await {
                    return;
                }
                let key = self.derive_key(net).await;
                match SharedDoc::init(net.clone(), key, &(self.accessor)()).await {
                    Ok(doc) => {
                        *self.doc.lock() = Some(doc);
                        self.advance(TemplateState::NetworkBound);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "network binding for '{}' not ready: {}",
                            self.entity.name(),
                            e
                        );
                    }
                }
            }
            TemplateState::NetworkBound => {
                self.advance(TemplateState::Active);
            }
            TemplateState::Active => {
                let doc = self.doc();
                if let Some(doc) = doc {
                    doc.poll().await;
                    if let Some(value) = doc.consume_changed() {
                        if let Some(handler) = &self.on_remote_update {
                            handler(&value);
                        }
                    }
                }
            }
            TemplateState::Cancelled => {}
        }
    }

    /// Publishes a local mutation. Purely local components report success
    /// without touching the network.
    pub async fn publish(&self, value: &T) -> bool {
        match self.doc() {
            Some(doc) => doc.set_shared(value).await,
            None => !self.config.is_networked,
        }
    }

    /// Delivers a click. Returns whether the component handled it; inactive
    /// or non-interactive components ignore input.
    pub fn click(&self) -> bool {
        if self.state() != TemplateState::Active || !self.config.is_interactive {
            return false;
        }
        match &self.on_click {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    /// Delivers a drag delta. Same gating as [`InteractiveComponent::click`].
    pub fn drag(&self, delta: Vec3) -> bool {
        if self.state() != TemplateState::Active || !self.config.is_draggable {
            return false;
        }
        match &self.on_drag {
            Some(handler) => {
                handler(delta);
                true
            }
            None => false,
        }
    }

    /// Cancels initialization and update processing. Call when the host
    /// entity is removed from the scene.
    pub fn cancel(&self) {
        *self.state.lock() = TemplateState::Cancelled;
    }

    fn advance(&self, next: TemplateState) {
        let mut state = self.state.lock();
        // A cancellation that raced the tick wins.
        if *state != TemplateState::Cancelled {
            tracing::debug!(
                "component '{}' on '{}': {:?} → {:?}",
                self.config.kind,
                self.entity.name(),
                *state,
                next
            );
            *state = next;
        }
    }

    fn internal_init(&self) {
        let footprint = self.entity.footprint().unwrap_or(self.config.content_size);
        *self.scale.lock() = footprint / self.config.content_size;
    }

    /// Derives the companion networked entity's key: the host's network id
    /// when it has one, else a name-derived fallback, plus the component
    /// kind so kinds sharing a host never collide.
    async fn derive_key(&self, net: &Arc<dyn NetworkAdapter>) -> String {
        let base = match net.network_id(self.entity.id()).await {
            Some(id) => id,
            None => self
                .entity
                .name()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-")
                .to_lowercase(),
        };
        format!("{}-{}", base, self.config.kind)
    }
}

impl<T> Debug for InteractiveComponent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveComponent")
            .field("entity", &self.entity.id())
            .field("kind", &self.config.kind)
            .field("state", &*self.state.lock())
            .finish()
    }
}
