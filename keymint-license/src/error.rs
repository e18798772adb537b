//! Error types for the licensing core.

use crate::lifecycle::StatusCode;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for licensing operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Licensing-core errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Caller-supplied facts are malformed (empty email/name,
    /// non-future expiry, zero activation count, empty reason).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A presented key string fails the structural check.
    #[error("license key is not a 25-character key")]
    InvalidFormat,

    /// An internal derivation invariant was violated. Should be
    /// unreachable; treated as a defect if observed.
    #[error("key encoding invariant violated: {0}")]
    Encoding(String),

    /// The requested lifecycle transition is not legal from the
    /// record's current state.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: StatusCode, to: StatusCode },

    /// The record is already in the state the transition targets, or
    /// the transition's precondition state does not hold.
    #[error("license is already {0}")]
    AlreadyInState(StatusCode),

    /// The license is past its expiry instant.
    #[error("license expired at {0}")]
    Expired(DateTime<Utc>),
}
