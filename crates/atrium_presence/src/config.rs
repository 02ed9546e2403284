//! # Configuration
//!
//! Typed configuration for the presence services, loadable from TOML, plus
//! the legacy naming-convention parser that derives a region cell size from
//! a trailing `_<integer>` suffix on a scene node's name.
//!
//! The explicit typed path always wins; suffix parsing exists for content
//! authored before the typed path existed, and malformed suffixes warn and
//! fall back rather than fail.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cell size used when neither configuration nor naming convention
/// supplies one.
pub const DEFAULT_CELL_SIZE: f64 = 10.0;

/// Sentinel cell size meaning "region hiding is inactive".
pub const INACTIVE_CELL_SIZE: f64 = 0.0;

/// Top-level configuration for the presence services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Region-hiding configuration.
    #[serde(default)]
    pub region: RegionConfig,
    /// Proximity-trigger configuration.
    #[serde(default)]
    pub proximity: ProximityConfig,
}

/// Region-hiding configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Grid cell side length in world units. When absent, the cell size is
    /// derived from the owning node's name suffix, falling back to
    /// [`DEFAULT_CELL_SIZE`].
    #[serde(default)]
    pub cell_size: Option<f64>,
}

/// Proximity-trigger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    /// Trigger radius in world units.
    #[serde(default = "default_proximity_radius")]
    pub radius: f64,
    /// Hysteresis margin added to the radius while an avatar is inside.
    #[serde(default = "default_proximity_fuzz")]
    pub fuzz: f64,
}

fn default_proximity_radius() -> f64 {
    2.0
}

fn default_proximity_fuzz() -> f64 {
    0.5
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius: default_proximity_radius(),
            fuzz: default_proximity_fuzz(),
        }
    }
}

impl PresenceConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The node name carries no `_<integer>` suffix
    #[error("no size suffix in node name '{0}'")]
    MissingSuffix(String),
    /// The suffix is present but not a positive integer
    #[error("invalid size suffix in node name '{name}': {source}")]
    InvalidSuffix {
        /// The offending node name.
        name: String,
        /// The underlying parse failure.
        source: std::num::ParseIntError,
    },
    /// Reading the configuration file failed
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid TOML
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parses a region cell size from a trailing `_<integer>` name suffix.
///
/// `"lobby_25"` yields `25.0`. The integer must be positive; anything else
/// is an error so the caller can warn and fall back.
pub fn parse_size_suffix(name: &str) -> Result<f64, ConfigError> {
    let (_, suffix) = name
        .rsplit_once('_')
        .ok_or_else(|| ConfigError::MissingSuffix(name.to_string()))?;
    let size: u32 = suffix.parse().map_err(|source| ConfigError::InvalidSuffix {
        name: name.to_string(),
        source,
    })?;
    if size == 0 {
        // A zero suffix would collide with the inactive sentinel.
        return Err(ConfigError::MissingSuffix(name.to_string()));
    }
    Ok(size as f64)
}
