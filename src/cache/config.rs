//! Cache tuning knobs.
//!
//! Controls fast-tier capacity, per-policy TTLs, and single-flight timeouts
//! via `waypost.toml` or `WAYPOST_CACHE_*` environment variables.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_FAST_TIER_LIMIT: usize = 500;
const DEFAULT_ROUTE_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_POOL_FAST_TTL_SECS: u64 = 60 * 60;
const DEFAULT_PHOTO_TTL_SECS: u64 = 2 * 60 * 60;
const DEFAULT_HOTSPOTS_PER_DAY: usize = 4;
const DEFAULT_OWNER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WAITER_SLACK_SECS: u64 = 2;

/// Cache configuration from `waypost.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries in the fast in-process tier.
    pub fast_tier_limit: usize,
    /// Route plan TTL in seconds (both tiers).
    pub route_ttl_secs: u64,
    /// Daily pool TTL in the fast tier, in seconds. The durable pool record
    /// carries no TTL.
    pub pool_fast_ttl_secs: u64,
    /// Trip photo search TTL in seconds (fast tier only).
    pub photo_ttl_secs: u64,
    /// Hotspots generated per daily pool.
    pub hotspots_per_day: usize,
    /// Upper bound on a single-flight owner's computation.
    pub owner_timeout_secs: u64,
    /// Extra time a waiter allows the owner beyond its own timeout.
    pub waiter_slack_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fast_tier_limit: DEFAULT_FAST_TIER_LIMIT,
            route_ttl_secs: DEFAULT_ROUTE_TTL_SECS,
            pool_fast_ttl_secs: DEFAULT_POOL_FAST_TTL_SECS,
            photo_ttl_secs: DEFAULT_PHOTO_TTL_SECS,
            hotspots_per_day: DEFAULT_HOTSPOTS_PER_DAY,
            owner_timeout_secs: DEFAULT_OWNER_TIMEOUT_SECS,
            waiter_slack_secs: DEFAULT_WAITER_SLACK_SECS,
        }
    }
}

impl CacheConfig {
    /// Returns the fast tier limit as NonZeroUsize, clamping to 1 if zero.
    pub fn fast_tier_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.fast_tier_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn route_ttl(&self) -> Duration {
        Duration::from_secs(self.route_ttl_secs)
    }

    pub fn pool_fast_ttl(&self) -> Duration {
        Duration::from_secs(self.pool_fast_ttl_secs)
    }

    pub fn photo_ttl(&self) -> Duration {
        Duration::from_secs(self.photo_ttl_secs)
    }

    pub fn owner_timeout(&self) -> Duration {
        Duration::from_secs(self.owner_timeout_secs)
    }

    /// How long a waiter blocks on an in-flight computation before treating
    /// the wait as failed and attempting ownership itself.
    pub fn waiter_timeout(&self) -> Duration {
        Duration::from_secs(self.owner_timeout_secs + self.waiter_slack_secs)
    }
}
