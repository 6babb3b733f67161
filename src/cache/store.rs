//! Two-tier cache storage.
//!
//! A bounded in-process LRU tier in front of a durable tier reached through
//! [`DurableStore`]. Both tiers carry per-entry expiry; expired entries are
//! never returned and are purged lazily on lookup. Durable-tier failures
//! always degrade to a miss or a skipped write, never to a caller-visible
//! error: the fast tier remains authoritative for this process's lifetime.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::providers::DurableStore;

use super::config::CacheConfig;
use super::key::Fingerprint;
use super::lock::{rw_read, rw_write};

const DURABLE_ROOT: &str = "cache/entries";

/// One cached value with its lifetime bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl CacheEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        let created_at = OffsetDateTime::now_utc();
        Self {
            value,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// An entry is valid iff `now < expires_at`.
    pub fn is_valid(&self) -> bool {
        OffsetDateTime::now_utc() < self.expires_at
    }
}

/// Introspection snapshot of the fast tier.
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub entry_count: usize,
    pub entries: Vec<EntryStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryStatus {
    pub key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub valid: bool,
}

/// Fast in-process cache backed by a slower durable second tier.
pub struct TieredCache {
    fast: RwLock<LruCache<Fingerprint, CacheEntry>>,
    durable: Arc<dyn DurableStore>,
}

impl TieredCache {
    pub fn new(config: &CacheConfig, durable: Arc<dyn DurableStore>) -> Self {
        Self {
            fast: RwLock::new(LruCache::new(config.fast_tier_limit_non_zero())),
            durable,
        }
    }

    fn durable_path(key: &Fingerprint) -> String {
        format!("{DURABLE_ROOT}/{}/{key}", key.operation())
    }

    fn scope_path(operation: &str) -> String {
        format!("{DURABLE_ROOT}/{operation}")
    }

    /// Looks up a valid entry, fast tier first, then durable tier.
    ///
    /// Expired entries are removed from whichever tier they were found in.
    /// A valid durable hit repopulates the fast tier.
    pub async fn get(&self, key: &Fingerprint) -> Option<Value> {
        if let Some(entry) = self.fast_lookup(key) {
            counter!("waypost_cache_fast_hit_total").increment(1);
            debug!(key = %key, tier = "fast", "cache hit");
            return Some(entry.value);
        }
        counter!("waypost_cache_fast_miss_total").increment(1);

        match self.durable.read(&Self::durable_path(key)).await {
            Ok(Some(record)) => {
                let entry: CacheEntry = match serde_json::from_value(record) {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(key = %key, error = %err, "discarding undecodable durable cache record");
                        self.durable_delete(key).await;
                        return None;
                    }
                };
                if entry.is_valid() {
                    counter!("waypost_cache_durable_hit_total").increment(1);
                    debug!(key = %key, tier = "durable", "cache hit");
                    rw_write(&self.fast, "get.populate_fast").put(key.clone(), entry.clone());
                    Some(entry.value)
                } else {
                    counter!("waypost_cache_durable_miss_total").increment(1);
                    self.durable_delete(key).await;
                    None
                }
            }
            Ok(None) => {
                counter!("waypost_cache_durable_miss_total").increment(1);
                None
            }
            Err(err) => {
                // Outage degrades to a miss.
                counter!("waypost_cache_durable_error_total").increment(1);
                warn!(key = %key, error = %err, "durable tier read failed, treating as miss");
                None
            }
        }
    }

    /// Typed lookup. Entries that no longer decode as `T` count as misses.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &Fingerprint) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key = %key, error = %err, "cached value no longer decodes, invalidating");
                self.invalidate(key).await;
                None
            }
        }
    }

    /// Fast-tier-only lookup, for policies that keep no durable cache
    /// record (photos) or manage it themselves (daily pools).
    pub fn get_fast(&self, key: &Fingerprint) -> Option<Value> {
        let found = self.fast_lookup(key);
        if found.is_some() {
            counter!("waypost_cache_fast_hit_total").increment(1);
        } else {
            counter!("waypost_cache_fast_miss_total").increment(1);
        }
        found.map(|entry| entry.value)
    }

    /// Typed fast-tier-only lookup.
    pub fn get_fast_as<T: DeserializeOwned>(&self, key: &Fingerprint) -> Option<T> {
        let value = self.get_fast(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key = %key, error = %err, "cached value no longer decodes, evicting");
                self.invalidate_fast(key);
                None
            }
        }
    }

    /// Writes to both tiers with `expires_at = now + ttl`.
    ///
    /// The fast tier is written first; a durable-tier failure is logged and
    /// swallowed.
    pub async fn put(&self, key: &Fingerprint, value: Value, ttl: Duration) {
        let entry = CacheEntry::new(value, ttl);
        rw_write(&self.fast, "put").put(key.clone(), entry.clone());

        let record = match serde_json::to_value(&entry) {
            Ok(record) => record,
            Err(err) => {
                warn!(key = %key, error = %err, "cache entry not serializable, skipping durable write");
                return;
            }
        };
        if let Err(err) = self.durable.write(&Self::durable_path(key), record).await {
            counter!("waypost_cache_durable_error_total").increment(1);
            warn!(key = %key, error = %err, "durable tier write failed, fast tier remains authoritative");
        }
    }

    /// Writes to the fast tier only. Used by policies whose durable record
    /// is managed separately (daily pools) or not kept at all (photos).
    pub fn put_fast(&self, key: &Fingerprint, value: Value, ttl: Duration) {
        rw_write(&self.fast, "put_fast").put(key.clone(), CacheEntry::new(value, ttl));
    }

    /// Removes an entry from both tiers. Durable failures are non-fatal.
    pub async fn invalidate(&self, key: &Fingerprint) {
        rw_write(&self.fast, "invalidate").pop(key);
        self.durable_delete(key).await;
    }

    /// Removes the fast-tier entry only.
    pub fn invalidate_fast(&self, key: &Fingerprint) {
        rw_write(&self.fast, "invalidate_fast").pop(key);
    }

    /// Clears one operation's entries from the fast tier only; its durable
    /// records are untouched and will repopulate it on the next lookup.
    /// Entries of other operations sharing the store are never affected.
    pub fn clear_scope_fast(&self, operation: &str) {
        let mut guard = rw_write(&self.fast, "clear_scope_fast");
        let keys: Vec<Fingerprint> = guard
            .iter()
            .filter(|(key, _)| key.operation() == operation)
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            guard.pop(&key);
        }
    }

    /// Clears one operation's entries from both tiers. Durable failures are
    /// non-fatal.
    pub async fn clear_scope(&self, operation: &str) {
        self.clear_scope_fast(operation);
        if let Err(err) = self.durable.delete(&Self::scope_path(operation)).await {
            counter!("waypost_cache_durable_error_total").increment(1);
            warn!(operation, error = %err, "durable tier scope clear failed");
        }
    }

    /// Snapshot of one operation's fast-tier keys and their validity.
    pub fn report_scope(&self, operation: &str) -> CacheReport {
        let guard = rw_read(&self.fast, "report_scope");
        let entries: Vec<EntryStatus> = guard
            .iter()
            .filter(|(key, _)| key.operation() == operation)
            .map(|(key, entry)| EntryStatus {
                key: key.to_string(),
                expires_at: entry.expires_at,
                valid: entry.is_valid(),
            })
            .collect();
        CacheReport {
            entry_count: entries.len(),
            entries,
        }
    }

    fn fast_lookup(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let mut guard = rw_write(&self.fast, "get.fast");
        match guard.get(key) {
            Some(entry) if entry.is_valid() => Some(entry.clone()),
            Some(_) => {
                guard.pop(key);
                None
            }
            None => None,
        }
    }

    async fn durable_delete(&self, key: &Fingerprint) {
        if let Err(err) = self.durable.delete(&Self::durable_path(key)).await {
            counter!("waypost_cache_durable_error_total").increment(1);
            warn!(key = %key, error = %err, "durable tier delete failed");
        }
    }
}
