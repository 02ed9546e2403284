//! # Atrium Presence System
//!
//! The presence core for multi-user virtual rooms: spatial visibility
//! culling, proximity triggers, and networked shared-state synchronization
//! for small interactive objects.
//!
//! ## Core Features
//!
//! - **Region Hiding**: the ground plane is partitioned into grid cells;
//!   content is shown only while an avatar occupies its cell, and attached
//!   video pauses while hidden
//! - **Occupancy Tracking**: reference-counted region occupancy with
//!   broadcasts on exactly the 0↔1 transitions
//! - **Proximity Triggers**: per-entity radius triggers with hysteresis for
//!   portals and walk-up interactions
//! - **Shared-State Sync**: ownership-gated JSON documents replicated over
//!   a pluggable networked-entity layer, last-writer-wins
//! - **Interactive Scaffold**: a builder that wires deferred
//!   initialization, footprint scaling, input handling, and network binding
//!   into one reusable component
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use atrium_presence::{
//!     config::PresenceConfig,
//!     events::EventBus,
//!     region::RegionHider,
//!     scene::{Entity, EntityKind, Scene},
//!     types::Vec3,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let events = EventBus::new();
//!     let scene = Scene::new(events);
//!     scene.spawn(Entity::builder("navmesh", EntityKind::NavMesh).build());
//!     let avatar = scene.spawn(
//!         Entity::builder("avatar", EntityKind::Avatar)
//!             .position(Vec3::new(5.0, 0.0, 5.0))
//!             .build(),
//!     );
//!
//!     let hider = RegionHider::new(scene, &PresenceConfig::default(), Some("lobby_10"));
//!     loop {
//!         avatar.set_position(Vec3::new(15.0, 0.0, 5.0));
//!         hider.tick().await;
//!         tokio::time::sleep(tokio::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```

pub mod config;
pub mod events;
pub mod interactive;
pub mod proximity;
pub mod region;
pub mod scene;
pub mod sync;
pub mod types;

pub use config::{ConfigError, PresenceConfig, ProximityConfig, RegionConfig};
pub use events::{
    EnvironmentLoadedEvent, Event, EventBus, EventError, EventHandler, ModelLoadedEvent,
    NetworkConnectedEvent, ProximityEnterEvent, ProximityLeaveEvent, RegionVisibilityEvent,
    TypedEventHandler,
};
pub use interactive::{InteractiveComponent, InteractiveConfig, InteractiveTemplate, TemplateState};
pub use proximity::ProximityWatcher;
pub use region::{
    AvatarFollower, FollowerKind, FollowerRegistry, ObjectFollower, OccupancyMap, OccupancyStats,
    RegionGrid, RegionHider, RegionService, RegionServiceStats, Transition, MAX_ZONES,
};
pub use scene::{Entity, EntityBuilder, EntityKind, Scene, VideoPlayable, VideoState};
pub use sync::{LocalNetwork, NetworkAdapter, RoomStore, SharedDoc, SyncError};
pub use types::{ClientId, EntityId, RegionId, Vec3};

// External dependencies consumers commonly need alongside the components.
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
