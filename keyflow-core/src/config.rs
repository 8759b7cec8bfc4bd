//! Process-wide settings.
//!
//! Settings are read when a computed value is constructed (default change
//! rate) and on every delivery (depth cap). Install a custom configuration
//! before building owners to affect their defaults.

use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Tunables for the observation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserveConfig {
    /// Default minimum interval between two emissions of a [`Computed`](crate::computed::Computed).
    pub change_rate_ms: u64,

    /// Maximum nesting of change deliveries on one thread.
    ///
    /// Deeper deliveries are dropped and logged; a chain this deep almost
    /// always means two computed values depend on each other.
    pub max_delivery_depth: usize,
}

impl ObserveConfig {
    pub const DEFAULT_CHANGE_RATE_MS: u64 = 100;
    pub const DEFAULT_MAX_DELIVERY_DEPTH: usize = 64;

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The default change rate as a [`Duration`].
    pub fn change_rate(&self) -> Duration {
        Duration::from_millis(self.change_rate_ms)
    }
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            change_rate_ms: Self::DEFAULT_CHANGE_RATE_MS,
            max_delivery_depth: Self::DEFAULT_MAX_DELIVERY_DEPTH,
        }
    }
}

static CONFIG: OnceLock<RwLock<ObserveConfig>> = OnceLock::new();

fn slot() -> &'static RwLock<ObserveConfig> {
    CONFIG.get_or_init(|| RwLock::new(ObserveConfig::default()))
}

/// Replace the process-wide configuration.
pub fn install(config: ObserveConfig) {
    tracing::debug!(?config, "installing observe config");
    *slot().write() = config;
}

/// A copy of the current process-wide configuration.
pub fn current() -> ObserveConfig {
    slot().read().clone()
}
