//! Dashboard configuration.
//!
//! # Invariants
//! - `validate()` must pass before a store or sync engine is built from it.
//! - Environment overrides only touch fields they name.

use crate::model::rank::RankConfig;
use crate::model::top::DEFAULT_TOP_CAPACITY;
use crate::sync::document::DocumentPath;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "clientwatch";
pub const DEFAULT_DEBOUNCE_MS: u64 = 650;

const ENV_NAMESPACE: &str = "CLIENTWATCH_NAMESPACE";
const ENV_DEBOUNCE_MS: &str = "CLIENTWATCH_DEBOUNCE_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNamespace(String),
    InvalidRank(RankConfig),
    InvalidDebounce(String),
    InvalidTopCapacity,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNamespace(value) => {
                write!(f, "namespace must be non-empty and contain no `:`, got `{value}`")
            }
            Self::InvalidRank(rank) => write!(
                f,
                "rank dimensions must be positive, got tiers={} subranks={} xp_per_subrank={}",
                rank.tier_count, rank.subranks_per_tier, rank.xp_per_subrank
            ),
            Self::InvalidDebounce(value) => {
                write!(f, "debounce must be a positive millisecond count, got `{value}`")
            }
            Self::InvalidTopCapacity => write!(f, "top capacity must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

/// Every tunable of one dashboard instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Prefix for local storage keys.
    pub namespace: String,
    pub rank: RankConfig,
    /// Quiet period before local changes are written remotely.
    pub debounce: Duration,
    /// The single shared remote document.
    pub document: DocumentPath,
    pub top_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            rank: RankConfig::default(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            document: DocumentPath::shared_default(),
            top_capacity: DEFAULT_TOP_CAPACITY,
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `CLIENTWATCH_NAMESPACE` / `CLIENTWATCH_DEBOUNCE_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            config.namespace = namespace.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidDebounce(raw.clone()))?;
            config.debounce = Duration::from_millis(millis);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(ConfigError::InvalidNamespace(self.namespace.clone()));
        }
        let rank = self.rank;
        if rank.tier_count == 0 || rank.subranks_per_tier == 0 || rank.xp_per_subrank == 0 {
            return Err(ConfigError::InvalidRank(rank));
        }
        if self.debounce.is_zero() {
            return Err(ConfigError::InvalidDebounce("0".to_string()));
        }
        if self.top_capacity == 0 {
            return Err(ConfigError::InvalidTopCapacity);
        }
        Ok(())
    }
}
