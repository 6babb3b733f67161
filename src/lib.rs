//! Waypost caching core
//!
//! The concurrent route/content caching and request-deduplication layer of
//! the Waypost travel-planning backend. Three expensive, rate-limited
//! subsystems (route calculation, daily hotspot generation, trip photo
//! search) share one machinery:
//!
//! - **Key builder**: deterministic fingerprints from an operation name and
//!   its normalized parameters.
//! - **Two-tier store**: a bounded in-process tier in front of a slower
//!   durable tier, both with per-entry expiry.
//! - **Single flight**: per-key mutual exclusion so concurrent requests for
//!   the same uncached key collapse into one upstream call.
//!
//! The HTTP layer, auth, and domain-record persistence live elsewhere and
//! reach this crate through the `providers` traits and the policy services
//! in `application`.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod providers;
