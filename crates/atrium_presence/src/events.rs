//! # Event Bus and Core Events
//!
//! A small string-keyed event bus in the style of a game-server event
//! system, plus the built-in event types the presence core emits and
//! consumes: scene lifecycle one-shots (`environment_loaded`,
//! `model_loaded`, `network_connected`) and proximity transitions.
//!
//! All events are strongly typed and serialized through JSON; the blanket
//! [`Event`] implementation means any `Serialize + DeserializeOwned` struct
//! is an event. Handler failures are logged and never propagated back to
//! emitters, so a misbehaving subscriber cannot take the scene down.

use crate::types::{ClientId, EntityId, RegionId};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Well-known event keys used across the presence core.
pub mod topics {
    /// Fired once when the static environment scene finishes loading.
    pub const ENVIRONMENT_LOADED: &str = "scene:environment_loaded";
    /// Fired when an entity's 3D model finishes loading.
    pub const MODEL_LOADED: &str = "scene:model_loaded";
    /// Fired when the networking layer becomes ready.
    pub const NETWORK_CONNECTED: &str = "net:connected";
    /// Fired when an avatar crosses into a proximity watcher's radius.
    pub const PROXIMITY_ENTER: &str = "proximity:enter";
    /// Fired when an avatar crosses out of a proximity watcher's radius.
    pub const PROXIMITY_LEAVE: &str = "proximity:leave";
    /// Fired when a grid region transitions between occupied and vacant.
    pub const REGION_VISIBILITY: &str = "region:visibility";
}

/// Core trait that all events must implement.
///
/// Provides serialization for dispatch and type identification for
/// debugging. Most types get this through the blanket implementation.
pub trait Event: Send + Sync + Any + Debug {
    /// Stable, unique identifier for the event type.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Serializes the event for dispatch.
    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    /// Deserializes an event from dispatch bytes.
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(|e| {
            tracing::error!(
                "Event serialization failed for type '{}': {}",
                Self::type_name(),
                e
            );
            EventError::Serialization(e)
        })
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(|e| {
            tracing::error!(
                "Event deserialization failed for type '{}': {} ({} bytes)",
                Self::type_name(),
                e,
                data.len()
            );
            EventError::Deserialization(e)
        })
    }
}

/// Handler trait for processing events.
///
/// Abstracts over type-specific handling logic so the bus can store
/// heterogeneous subscribers. Users normally go through
/// [`EventBus::on`] rather than implementing this directly.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handles an event from serialized data.
    async fn handle(&self, data: &[u8]) -> Result<(), EventError>;

    /// Human-readable name for this handler, for logging.
    fn handler_name(&self) -> &str;
}

/// Type-safe wrapper bridging a plain closure to the [`EventHandler`] trait.
pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    name: String,
    handler: F,
    _phantom: std::marker::PhantomData<fn(T)>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    /// Creates a new typed event handler with a name used in logs.
    pub fn new(name: String, handler: F) -> Self {
        Self {
            name,
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event + 'static,
    F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
{
    async fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// String-keyed event bus.
///
/// Registration is synchronous; emission is async so handlers can be
/// dispatched from service tick loops. Handler errors are logged, counted,
/// and swallowed.
#[derive(Default)]
pub struct EventBus {
    handlers: DashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a typed handler for `key`.
    pub fn on<T, F>(&self, key: &str, handler: F)
    where
        T: Event + 'static,
        F: Fn(T) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let wrapped = Arc::new(TypedEventHandler::new(
            format!("{}::{}", key, T::type_name()),
            handler,
        ));
        self.handlers
            .entry(key.to_string())
            .or_default()
            .push(wrapped);
    }

    /// Emits `event` to every handler registered for `key`.
    ///
    /// Returns the number of handlers that ran. Serialization failure is the
    /// only error surfaced to the emitter; handler failures are logged and
    /// swallowed.
    pub async fn emit<T: Event>(&self, key: &str, event: &T) -> Result<usize, EventError> {
        let data = event.serialize()?;
        let targets: Vec<Arc<dyn EventHandler>> = match self.handlers.get(key) {
            Some(list) => list.value().clone(),
            None => return Ok(0),
        };

        let mut delivered = 0;
        for handler in targets {
            match handler.handle(&data).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        "Handler '{}' failed for event '{}': {}",
                        handler.handler_name(),
                        key,
                        e
                    );
                }
            }
        }
        Ok(delivered)
    }

    /// Number of handlers registered for `key`.
    pub fn handler_count(&self, key: &str) -> usize {
        self.handlers.get(key).map(|l| l.len()).unwrap_or(0)
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.handlers.len())
            .finish()
    }
}

/// Errors raised by event serialization and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Serialization failed when converting an event to bytes
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Deserialization failed when converting bytes to an event
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// Handler execution failed during event processing
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}

// ============================================================================
// Built-in events
// ============================================================================

/// Fired once when the static environment scene has finished loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentLoadedEvent {
    /// Root entity of the environment scene graph.
    pub root: EntityId,
}

/// Fired when an entity's 3D model finishes loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLoadedEvent {
    /// The entity whose model is ready.
    pub entity: EntityId,
}

/// Fired when a client's networking layer becomes ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConnectedEvent {
    /// The client that connected.
    pub client: ClientId,
}

/// An avatar crossed into a proximity watcher's trigger radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityEnterEvent {
    /// The watching entity (portal, video pad, ...).
    pub watcher: EntityId,
    /// The avatar that entered.
    pub avatar: EntityId,
    /// Distance at the moment the transition was observed.
    pub distance: f64,
}

/// An avatar crossed out of a proximity watcher's trigger radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityLeaveEvent {
    /// The watching entity.
    pub watcher: EntityId,
    /// The avatar that left.
    pub avatar: EntityId,
    /// Distance at the moment the transition was observed.
    pub distance: f64,
}

/// A grid region transitioned between occupied and vacant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionVisibilityEvent {
    /// The region that changed.
    pub region: RegionId,
    /// True when the region became occupied (objects shown).
    pub visible: bool,
}
