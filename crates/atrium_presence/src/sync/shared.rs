//! # Shared-State Documents
//!
//! The data-holder half of the shared-state protocol: an ownership-gated
//! JSON blob replicated as a single string property on a companion
//! networked entity. Each client keeps a decoded cache and the last
//! serialized form it saw; a poll that observes a different string decodes
//! and adopts it, raising a `changed` flag for the owning component to
//! consume on its next tick.
//!
//! Serialization failures never propagate: a blob that fails to encode is
//! published as `{}`, and a replicated value that fails to decode resets
//! the cache to the type's default. Both paths log.

use crate::sync::net::{NetworkAdapter, SyncError};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct DocInner<T> {
    data: T,
    last_seen: String,
}

/// One client's replica of a shared JSON document.
#[derive(Debug)]
pub struct SharedDoc<T> {
    key: String,
    net: Arc<dyn NetworkAdapter>,
    inner: Mutex<DocInner<T>>,
    changed: AtomicBool,
}

impl<T> SharedDoc<T>
where
    T: Serialize + DeserializeOwned + Default + Clone + Debug + Send + 'static,
{
    /// Binds a document to the networked entity under `key`, creating the
    /// entity seeded with `initial` if this client is first.
    ///
    /// Later clients adopt the existing network value as authoritative; the
    /// adopted value is surfaced through [`SharedDoc::consume_changed`].
    pub async fn init(
        net: Arc<dyn NetworkAdapter>,
        key: impl Into<String>,
        initial: &T,
    ) -> Result<Arc<Self>, SyncError> {
        let key = key.into();
        let encoded = match serde_json::to_string(initial) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to encode initial state for '{}': {}", key, e);
                "{}".to_string()
            }
        };
        net.ensure_entity(&key, &encoded).await?;

        let doc = Arc::new(Self {
            key,
            net,
            inner: Mutex::new(DocInner {
                data: initial.clone(),
                last_seen: encoded,
            }),
            changed: AtomicBool::new(false),
        });
        doc.poll().await;
        Ok(doc)
    }

    /// The networked entity key this document is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the replicated value and applies it if it changed.
    pub async fn poll(&self) {
        if let Some(raw) = self.net.read_property(&self.key).await {
            self.apply_network_update(&raw);
        }
    }

    /// Applies a replicated string observed on the network.
    ///
    /// A string equal to the last one seen is ignored. A decode failure
    /// resets the cache to `T::default()` and still raises `changed` so the
    /// owner reconciles against the reset.
    pub fn apply_network_update(&self, raw: &str) {
        let mut inner = self.inner.lock();
        if inner.last_seen == raw {
            return;
        }
        inner.last_seen = raw.to_string();
        match serde_json::from_str::<T>(raw) {
            Ok(value) => {
                inner.data = value;
            }
            Err(e) => {
                tracing::error!("failed to decode shared state for '{}': {}", self.key, e);
                inner.data = T::default();
            }
        }
        self.changed.store(true, Ordering::SeqCst);
    }

    /// Acquires write capability: succeeds if this client already owns the
    /// companion entity or the transfer succeeds.
    pub async fn take_ownership(&self) -> bool {
        self.net.is_mine(&self.key).await || self.net.take_ownership(&self.key).await
    }

    /// Publishes a new value, acquiring ownership first if needed.
    ///
    /// Returns whether the publish happened. A failed ownership transfer or
    /// a failed encode leaves the published value untouched.
    pub async fn set_shared(&self, value: &T) -> bool {
        if !self.take_ownership().await {
            tracing::warn!("cannot publish '{}': ownership unavailable", self.key);
            return false;
        }
        let encoded = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to encode shared state for '{}': {}", self.key, e);
                return false;
            }
        };
        match self.net.write_property(&self.key, &encoded).await {
            Ok(()) => {
                let mut inner = self.inner.lock();
                inner.data = value.clone();
                inner.last_seen = encoded;
                true
            }
            Err(e) => {
                tracing::warn!("failed to publish '{}': {}", self.key, e);
                false
            }
        }
    }

    /// Takes the pending remote update, if one arrived since the last call.
    pub fn consume_changed(&self) -> Option<T> {
        if self.changed.swap(false, Ordering::SeqCst) {
            Some(self.inner.lock().data.clone())
        } else {
            None
        }
    }

    /// Whether a remote update is waiting to be consumed.
    pub fn has_pending_change(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Copy of the current cached value.
    pub fn snapshot(&self) -> T {
        self.inner.lock().data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::net::{LocalNetwork, RoomStore};
    use crate::types::{ClientId, EntityId};
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct BoxState {
        color: String,
        rotation: [f64; 3],
        position: [f64; 3],
    }

    fn sample() -> BoxState {
        BoxState {
            color: "#7070ff".into(),
            rotation: [0.0, 45.0, 0.0],
            position: [1.0, 0.5, -2.0],
        }
    }

    async fn connected(room: &Arc<RoomStore>) -> Arc<LocalNetwork> {
        let net = LocalNetwork::new(room.clone());
        net.connect();
        net
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_round_trip_same_client() {
        let room = RoomStore::new();
        let net = connected(&room).await;
        let doc = SharedDoc::init(net as Arc<dyn NetworkAdapter>, "box-data", &BoxState::default())
            .await
            .expect("init");

        let state = sample();
        assert!(doc.set_shared(&state).await);
        assert_eq!(doc.snapshot(), state);
        // Local publishes do not raise the remote-change flag.
        assert!(doc.consume_changed().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_late_joiner_adopts_existing_value() {
        let room = RoomStore::new();
        let net_a = connected(&room).await;
        let doc_a = SharedDoc::init(
            net_a.clone() as Arc<dyn NetworkAdapter>,
            "box-data",
            &sample(),
        )
        .await
        .expect("init a");
        assert!(doc_a.consume_changed().is_none(), "creator state is its own");

        let net_b = connected(&room).await;
        let doc_b = SharedDoc::init(
            net_b as Arc<dyn NetworkAdapter>,
            "box-data",
            &BoxState::default(),
        )
        .await
        .expect("init b");
        assert_eq!(
            doc_b.consume_changed().expect("adopted network value"),
            sample()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_update_flows_through_poll() {
        let room = RoomStore::new();
        let net_a = connected(&room).await;
        let net_b = connected(&room).await;
        let doc_a = SharedDoc::init(
            net_a as Arc<dyn NetworkAdapter>,
            "box-data",
            &BoxState::default(),
        )
        .await
        .expect("init a");
        let doc_b = SharedDoc::init(
            net_b as Arc<dyn NetworkAdapter>,
            "box-data",
            &BoxState::default(),
        )
        .await
        .expect("init b");
        assert!(doc_b.consume_changed().is_none(), "identical seed, no change");

        let state = sample();
        assert!(doc_a.set_shared(&state).await);

        doc_b.poll().await;
        assert_eq!(doc_b.consume_changed().expect("remote update"), state);

        // Re-polling the same string is a no-op.
        doc_b.poll().await;
        assert!(doc_b.consume_changed().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_decode_failure_resets_to_default() {
        let room = RoomStore::new();
        let net_a = connected(&room).await;
        let net_b = connected(&room).await;
        let doc_b = SharedDoc::init(
            net_b as Arc<dyn NetworkAdapter>,
            "box-data",
            &sample(),
        )
        .await
        .expect("init b");

        // Another client publishes something unparseable.
        assert!(net_a.take_ownership("box-data").await);
        net_a
            .write_property("box-data", "definitely not json")
            .await
            .expect("owned write");

        doc_b.poll().await;
        assert_eq!(doc_b.consume_changed().expect("reset"), BoxState::default());
    }

    /// Adapter that refuses ownership, for exercising the publish gate.
    #[derive(Debug)]
    struct DeniedNetwork {
        client: ClientId,
        inner: Arc<LocalNetwork>,
    }

    #[async_trait]
    impl NetworkAdapter for DeniedNetwork {
        fn client_id(&self) -> ClientId {
            self.client
        }
        async fn is_connected(&self) -> bool {
            self.inner.is_connected().await
        }
        async fn has_entity(&self, key: &str) -> bool {
            self.inner.has_entity(key).await
        }
        async fn ensure_entity(&self, key: &str, initial: &str) -> Result<(), SyncError> {
            self.inner.ensure_entity(key, initial).await
        }
        async fn is_mine(&self, _key: &str) -> bool {
            false
        }
        async fn take_ownership(&self, _key: &str) -> bool {
            false
        }
        async fn network_id(&self, entity: EntityId) -> Option<String> {
            self.inner.network_id(entity).await
        }
        async fn read_property(&self, key: &str) -> Option<String> {
            self.inner.read_property(key).await
        }
        async fn write_property(&self, key: &str, value: &str) -> Result<(), SyncError> {
            self.inner.write_property(key, value).await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ownership_gate_blocks_publish() {
        let room = RoomStore::new();
        let creator = connected(&room).await;
        let _doc_a = SharedDoc::init(
            creator.clone() as Arc<dyn NetworkAdapter>,
            "box-data",
            &sample(),
        )
        .await
        .expect("init");

        let denied = Arc::new(DeniedNetwork {
            client: ClientId::new(),
            inner: connected(&room).await,
        });
        let doc = SharedDoc::init(
            denied as Arc<dyn NetworkAdapter>,
            "box-data",
            &BoxState::default(),
        )
        .await
        .expect("init denied");

        let before = room.entity_count();
        assert!(!doc.set_shared(&BoxState::default()).await);
        assert_eq!(room.entity_count(), before);
        // Published value is untouched.
        assert_eq!(
            serde_json::from_str::<BoxState>(
                &creator.read_property("box-data").await.expect("value")
            )
            .expect("valid"),
            sample()
        );
    }
}
