//! Error types for the service layer.

use keymint_license::LicenseError;
use keymint_storage::StorageError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-layer errors. Licensing and storage failures pass through
/// unchanged so callers see the core taxonomy verbatim.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A licensing-core failure (validation, format, lifecycle).
    #[error(transparent)]
    License(#[from] LicenseError),

    /// No record exists for the presented key.
    #[error("license not found")]
    NotFound,

    /// The persisted status kept changing under a transition; the
    /// caller can observe the current state and retry.
    #[error("conflicting concurrent update: {0}")]
    Conflict(String),

    /// The transient-failure retry budget is exhausted.
    #[error("storage unavailable after {attempts} attempts: {source}")]
    StorageUnavailable {
        attempts: u32,
        #[source]
        source: StorageError,
    },

    /// A non-transient storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Process configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
