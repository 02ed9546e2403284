//! # Networked Entity Boundary
//!
//! The ownership-gated replication primitive the sync protocol builds on,
//! expressed as an async trait so production transports and the in-process
//! room simulation plug in interchangeably.
//!
//! Ownership is optimistic: `take_ownership` always moves the entity to the
//! caller in the in-process implementation, and the last writer across the
//! room wins. A client that loses the race is not told; its next poll of
//! the replicated value simply overwrites its local state.

use crate::types::{ClientId, EntityId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Errors raised by shared-state synchronization.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The networking layer is not connected yet
    #[error("network not connected")]
    NotConnected,
    /// The networked entity is owned by another client
    #[error("networked entity '{0}' is owned by another client")]
    NotOwner(String),
    /// No networked entity exists under the given key
    #[error("unknown networked entity '{0}'")]
    UnknownEntity(String),
    /// Encoding local state for publication failed
    #[error("failed to encode shared state: {0}")]
    Encode(serde_json::Error),
    /// Decoding a replicated value failed
    #[error("failed to decode shared state: {0}")]
    Decode(serde_json::Error),
}

/// Client-side view of the networked-entity layer.
#[async_trait]
pub trait NetworkAdapter: Send + Sync + Debug {
    /// This client's identity in the room.
    fn client_id(&self) -> ClientId;

    /// Whether the connection is established.
    async fn is_connected(&self) -> bool;

    /// Whether a networked entity exists under `key`.
    async fn has_entity(&self, key: &str) -> bool;

    /// Looks up the entity under `key`, creating it seeded with `initial`
    /// if no client has created it yet. First writer creates; later
    /// callers leave the existing value untouched.
    async fn ensure_entity(&self, key: &str, initial: &str) -> Result<(), SyncError>;

    /// Whether this client currently owns the entity under `key`.
    async fn is_mine(&self, key: &str) -> bool;

    /// Attempts to move ownership of `key` to this client. Returns whether
    /// this client holds ownership afterwards.
    async fn take_ownership(&self, key: &str) -> bool;

    /// The stable network id previously assigned to a scene entity, if any.
    async fn network_id(&self, entity: EntityId) -> Option<String>;

    /// Reads the replicated value under `key`.
    async fn read_property(&self, key: &str) -> Option<String>;

    /// Publishes a replicated value under `key`. Requires ownership.
    async fn write_property(&self, key: &str, value: &str) -> Result<(), SyncError>;
}

#[derive(Debug)]
struct NetworkedEntry {
    value: String,
    owner: ClientId,
}

/// Shared state of one room, visible to every [`LocalNetwork`] client
/// attached to it.
#[derive(Debug, Default)]
pub struct RoomStore {
    entities: DashMap<String, NetworkedEntry>,
    network_ids: DashMap<EntityId, String>,
}

impl RoomStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of networked entities in the room.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// In-process [`NetworkAdapter`]: one instance per simulated client, all
/// sharing a [`RoomStore`].
#[derive(Debug)]
pub struct LocalNetwork {
    client: ClientId,
    room: Arc<RoomStore>,
    connected: AtomicBool,
}

impl LocalNetwork {
    /// Creates a client view of `room`, initially disconnected.
    pub fn new(room: Arc<RoomStore>) -> Arc<Self> {
        Arc::new(Self {
            client: ClientId::new(),
            room,
            connected: AtomicBool::new(false),
        })
    }

    /// Marks the connection established.
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Drops the connection.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Assigns (or returns the already-assigned) network id for a scene
    /// entity, making it addressable room-wide.
    pub fn assign_network_id(&self, entity: EntityId) -> String {
        self.room
            .network_ids
            .entry(entity)
            .or_insert_with(|| format!("net-{}", &entity.0.simple().to_string()[..12]))
            .value()
            .clone()
    }
}

#[async_trait]
impl NetworkAdapter for LocalNetwork {
    fn client_id(&self) -> ClientId {
        self.client
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn has_entity(&self, key: &str) -> bool {
        self.room.entities.contains_key(key)
    }

    async fn ensure_entity(&self, key: &str, initial: &str) -> Result<(), SyncError> {
        if !self.is_connected().await {
            return Err(SyncError::NotConnected);
        }
        self.room
            .entities
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!("client {} created networked entity '{}'", self.client, key);
                NetworkedEntry {
                    value: initial.to_string(),
                    owner: self.client,
                }
            });
        Ok(())
    }

    async fn is_mine(&self, key: &str) -> bool {
        self.room
            .entities
            .get(key)
            .map(|e| e.owner == self.client)
            .unwrap_or(false)
    }

    async fn take_ownership(&self, key: &str) -> bool {
        if !self.is_connected().await {
            return false;
        }
        match self.room.entities.get_mut(key) {
            Some(mut entry) => {
                entry.owner = self.client;
                true
            }
            None => false,
        }
    }

    async fn network_id(&self, entity: EntityId) -> Option<String> {
        self.room.network_ids.get(&entity).map(|id| id.value().clone())
    }

    async fn read_property(&self, key: &str) -> Option<String> {
        self.room.entities.get(key).map(|e| e.value.clone())
    }

    async fn write_property(&self, key: &str, value: &str) -> Result<(), SyncError> {
        if !self.is_connected().await {
            return Err(SyncError::NotConnected);
        }
        let mut entry = self
            .room
            .entities
            .get_mut(key)
            .ok_or_else(|| SyncError::UnknownEntity(key.to_string()))?;
        if entry.owner != self.client {
            return Err(SyncError::NotOwner(key.to_string()));
        }
        entry.value = value.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_pair() -> (Arc<LocalNetwork>, Arc<LocalNetwork>) {
        let room = RoomStore::new();
        let a = LocalNetwork::new(room.clone());
        let b = LocalNetwork::new(room);
        a.connect();
        b.connect();
        (a, b)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_first_writer_creates() {
        let (a, b) = connected_pair();
        a.ensure_entity("box-state", r#"{"n":1}"#).await.expect("create");
        // The second client finds the existing value authoritative.
        b.ensure_entity("box-state", r#"{"n":2}"#).await.expect("lookup");
        assert_eq!(
            b.read_property("box-state").await.as_deref(),
            Some(r#"{"n":1}"#)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_write_requires_ownership() {
        let (a, b) = connected_pair();
        a.ensure_entity("pad", "{}").await.expect("create");
        assert!(a.is_mine("pad").await);
        assert!(!b.is_mine("pad").await);

        let err = b.write_property("pad", r#"{"x":1}"#).await.unwrap_err();
        assert!(matches!(err, SyncError::NotOwner(_)));
        assert_eq!(a.read_property("pad").await.as_deref(), Some("{}"));

        assert!(b.take_ownership("pad").await);
        b.write_property("pad", r#"{"x":1}"#).await.expect("owned write");
        assert_eq!(a.read_property("pad").await.as_deref(), Some(r#"{"x":1}"#));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_last_writer_wins_ownership() {
        let (a, b) = connected_pair();
        a.ensure_entity("pad", "{}").await.expect("create");
        assert!(b.take_ownership("pad").await);
        assert!(a.take_ownership("pad").await);
        assert!(a.is_mine("pad").await);
        assert!(!b.is_mine("pad").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disconnected_operations_fail() {
        let room = RoomStore::new();
        let net = LocalNetwork::new(room);
        assert!(matches!(
            net.ensure_entity("pad", "{}").await,
            Err(SyncError::NotConnected)
        ));
        assert!(!net.take_ownership("pad").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_network_id_assignment() {
        let room = RoomStore::new();
        let net = LocalNetwork::new(room);
        let entity = EntityId::new();
        assert!(net.network_id(entity).await.is_none());
        let id = net.assign_network_id(entity);
        assert_eq!(net.network_id(entity).await.as_deref(), Some(id.as_str()));
        // Stable across repeat assignment.
        assert_eq!(net.assign_network_id(entity), id);
    }
}
