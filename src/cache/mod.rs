//! Waypost cache system.
//!
//! The reusable machinery behind the three policy services:
//!
//! - **Key builder**: deterministic fingerprints for cacheable operations.
//! - **Tiered store**: in-process LRU tier over a durable second tier.
//! - **Single flight**: per-key deduplication of in-flight computations.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `waypost.toml`:
//!
//! ```toml
//! [cache]
//! fast_tier_limit = 500
//! route_ttl_secs = 86400
//! # ... see config.rs for all options
//! ```

mod config;
mod flight;
mod key;
mod lock;
mod store;

pub use config::CacheConfig;
pub use flight::{FlightError, SingleFlight};
pub use key::{Fingerprint, KeyBuilder};
pub use store::{CacheEntry, CacheReport, EntryStatus, TieredCache};
