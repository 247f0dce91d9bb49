//! Error types for the controller and its store seams.

use hc_types::ObjectKey;
use thiserror::Error;

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Typed failures from the store seams (cache reads and client writes).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{kind} '{key}' not found")]
    NotFound { kind: &'static str, key: ObjectKey },

    #[error("{kind} '{key}' already exists")]
    Conflict { kind: &'static str, key: ObjectKey },

    /// Infrastructure-level failure; the caller should retry.
    #[error("transient store failure: {0}")]
    Transient(String),
}

/// Controller-level failures.
///
/// Everything here is returned from a reconcile and retried under backoff.
/// Conditions that should *not* be retried (malformed key, already-deleted
/// resource) are handled inside the reconciler and never surface as errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The target CronJob exists but is not controlled by this HealthCheck.
    /// Retrying cannot fix this without operator intervention; the retry
    /// keeps the condition visible in logs and events.
    #[error("CronJob '{name}' already exists and is not managed by HealthCheck")]
    NotOwned { name: String },

    #[error("configuration error: {0}")]
    Config(String),
}
