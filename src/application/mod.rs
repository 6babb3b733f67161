//! Policy services wiring the cache machinery around upstream providers.

pub mod error;
pub mod hotspots;
pub mod photos;
pub mod routes;
