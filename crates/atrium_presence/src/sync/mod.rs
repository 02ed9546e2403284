//! # Shared-State Synchronization
//!
//! Replication of small interactive-object state between room clients.
//! The protocol has two halves: a [`net::NetworkAdapter`] boundary over the
//! room's networked-entity layer (ownership transfer, a replicated string
//! property per entity), and the [`shared::SharedDoc`] document that
//! encodes application state as JSON on top of it.
//!
//! Contention is resolved optimistically: ownership transfers always move
//! to the requester, the last writer wins, and losers converge on the next
//! replicated update instead of erroring.

pub mod net;
pub mod shared;

pub use net::{LocalNetwork, NetworkAdapter, RoomStore, SyncError};
pub use shared::SharedDoc;
