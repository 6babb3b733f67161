//! Collaborator interfaces.
//!
//! The routing provider, language model, photo library, and durable store
//! are owned by excluded subsystems; this crate sees them only through these
//! traits. Implementations carry their own HTTP clients and latency; the
//! policy layer bounds every call with a timeout.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::geo::Location;
use crate::domain::photos::{DateWindow, PhotoItem};
use crate::domain::route::{RouteLeg, RoutePreference, Vehicle};

/// Failure kinds surfaced by upstream collaborators.
///
/// `Timeout` is applied by the caller when a provider future exceeds its
/// configured bound; providers themselves never need to return it.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream rate limited")]
    RateLimited,
    #[error("upstream unavailable: {message}")]
    Unavailable { message: String },
    #[error("upstream returned malformed data: {message}")]
    Malformed { message: String },
    #[error("provider `{provider}` is not configured")]
    Unconfigured { provider: &'static str },
    #[error("upstream call timed out")]
    Timeout,
    #[error("authentication rejected: {message}")]
    Auth { message: String },
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// True when a retry without operator intervention can never help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unconfigured { .. })
    }
}

/// Failure of the durable second-tier store.
///
/// Always swallowed at the cache-store boundary: a failing durable tier
/// degrades to a miss or a skipped write, never to a caller-visible error.
#[derive(Debug, Error)]
#[error("durable store error: {message}")]
pub struct DurableStoreError {
    pub message: String,
}

impl DurableStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Computes road routes between two named locations.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn compute_route(
        &self,
        start: &Location,
        end: &Location,
        vehicle: Vehicle,
        preference: RoutePreference,
    ) -> Result<Vec<RouteLeg>, ProviderError>;
}

/// Hosted language model producing free-form text for a prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError>;
}

/// Photo library search scoped to a date window.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    async fn search(
        &self,
        access_token: &str,
        window: &DateWindow,
    ) -> Result<Vec<PhotoItem>, ProviderError>;
}

/// Durable key/value records addressed by slash-separated paths.
///
/// Deleting a path removes the record and everything beneath it, matching
/// the tree semantics of the backing realtime database.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<Value>, DurableStoreError>;
    async fn write(&self, path: &str, record: Value) -> Result<(), DurableStoreError>;
    async fn delete(&self, path: &str) -> Result<(), DurableStoreError>;
}
