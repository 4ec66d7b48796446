//! Application layer errors

use std::time::Duration;
use thiserror::Error;

use crate::domain::errors::{DomainError, ErrorKind};
use crate::domain::shared::IdempotencyKey;
use crate::domain::traits::Aggregate;

/// The single error a command service returns.
///
/// Callers need to know whether anything changed locally before deciding to
/// resubmit: see [`ServiceError::local_state_changed`].
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(DomainError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("command with idempotency key {0} is already in flight")]
    Duplicate(IdempotencyKey),

    #[error("conflict: {0}")]
    Conflict(DomainError),

    #[error("{0}")]
    Suspended(DomainError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The backend call failed before anything was written locally.
    #[error("provider error: {0}")]
    Provider(ProviderError),

    /// The local write committed; the backend did not acknowledge it.
    #[error("saved locally, backend sync failed: {0}")]
    SyncFailed(ProviderError),

    /// The session was recorded locally; analytics delivery failed.
    #[error("analytics dispatch failed: {0}")]
    DispatchFailed(ProviderError),
}

impl ServiceError {
    pub fn not_found<T: Aggregate>(key: &T::Key) -> Self {
        ServiceError::NotFound(format!("{} {}", T::KIND, key))
    }

    /// True when the call got far enough to change local state.
    pub fn local_state_changed(&self) -> bool {
        matches!(self, ServiceError::SyncFailed(_) | ServiceError::DispatchFailed(_))
    }

    /// True when the same command may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Duplicate(_) => true,
            ServiceError::Storage(e) => e.is_transient(),
            ServiceError::Provider(e)
            | ServiceError::SyncFailed(e)
            | ServiceError::DispatchFailed(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err.kind() {
            ErrorKind::Validation => ServiceError::Validation(err),
            ErrorKind::Conflict => ServiceError::Conflict(err),
            ErrorKind::NotFound => ServiceError::NotFound(err.to_string()),
            ErrorKind::Suspended => ServiceError::Suspended(err),
        }
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Io(_) | StorageError::Unavailable(_) | StorageError::Database(_)
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Failures reported by (or while waiting on) the external backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend rejected request: {0}")]
    Rejected(String),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, ProviderError::Rejected(_))
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
