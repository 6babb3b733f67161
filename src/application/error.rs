use thiserror::Error;

use crate::cache::FlightError;
use crate::domain::error::DomainError;
use crate::infra::error::InfraError;
use crate::providers::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<FlightError<AppError>> for AppError {
    fn from(error: FlightError<AppError>) -> Self {
        match error {
            FlightError::Compute(inner) => inner,
            FlightError::Exhausted { key } => AppError::Provider(ProviderError::unavailable(
                format!("computation for `{key}` kept failing under contention"),
            )),
        }
    }
}
