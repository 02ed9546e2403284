//! # Region-Based Visibility
//!
//! Spatial visibility culling for multi-user rooms. The world's ground
//! plane is partitioned into a grid of square cells ("regions"); avatars
//! are counted into the region they stand in, and the content tagged with a
//! region is shown only while at least one avatar occupies it.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       RegionHider                         │
//! │   scene scans · environment walk · per-tick discovery     │
//! │  ┌──────────────┐  ┌───────────────┐  ┌────────────────┐  │
//! │  │  RegionGrid  │  │ OccupancyMap  │  │FollowerRegistry│  │
//! │  │  pos → id    │  │ 0↔1 edges     │  │ live followers │  │
//! │  └──────────────┘  └───────────────┘  └────────────────┘  │
//! │              owned together by RegionService              │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Avatar followers move occupancy as their entity crosses cell
//! boundaries; object followers apply the resulting show/hide broadcasts,
//! pausing attached video while hidden.

pub mod follower;
pub mod grid;
pub mod hider;
pub mod occupancy;
pub mod registry;
pub mod service;

#[cfg(test)]
mod tests;

pub use follower::{AvatarFollower, ObjectFollower};
pub use grid::{RegionGrid, MAX_ZONES};
pub use hider::RegionHider;
pub use occupancy::{OccupancyMap, OccupancyStats, Transition};
pub use registry::{FollowerKind, FollowerRegistry};
pub use service::{RegionService, RegionServiceStats};
