//! The license lifecycle state machine.
//!
//! Persisted status and effective status are different things:
//! `expired` is derived from the expiry instant at read time, and the
//! persisted column is only ever rewritten for the automatic
//! `active → expired` promotion. Suspended and revoked records keep
//! their persisted status even past expiry.
//!
//! Legal transitions:
//! - `active → suspended` (requires a reason)
//! - `active → expired` (automatic only: read-time reconciliation or
//!   the maintenance sweep)
//! - `suspended → active` (reactivation; refused once past expiry)
//!
//! Nothing currently produces `revoked`; the state is modeled but has
//! no trigger.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plain status discriminant, as stored and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCode {
    Active,
    Suspended,
    Expired,
    Revoked,
}

impl StatusCode {
    /// The storage/display spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    /// Parses the storage spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "expired" => Some(Self::Expired),
            "revoked" => Some(Self::Revoked),
            _ => None,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle state. Suspension metadata lives inside the
/// variant, so "set iff suspended" holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LicenseState {
    Active,
    Suspended {
        at: DateTime<Utc>,
        reason: String,
    },
    Expired,
    Revoked,
}

impl LicenseState {
    /// The plain discriminant of this state.
    #[must_use]
    pub fn code(&self) -> StatusCode {
        match self {
            Self::Active => StatusCode::Active,
            Self::Suspended { .. } => StatusCode::Suspended,
            Self::Expired => StatusCode::Expired,
            Self::Revoked => StatusCode::Revoked,
        }
    }

    /// Returns the suspension reason, if suspended.
    #[must_use]
    pub fn suspension_reason(&self) -> Option<&str> {
        match self {
            Self::Suspended { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for LicenseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code().as_str())
    }
}

/// The status a caller observing "current status" should see.
///
/// `Expired` whenever `now` is past the expiry instant, the persisted
/// code otherwise. Display-level only: this function never decides a
/// write. Use [`needs_expiry_promotion`] for that.
#[must_use]
pub fn effective_status(
    state: &LicenseState,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> StatusCode {
    if now > expires_at {
        StatusCode::Expired
    } else {
        state.code()
    }
}

/// True when the read path should promote the persisted status to
/// expired: persisted active and past expiry. Suspended and revoked
/// records are never promoted.
#[must_use]
pub fn needs_expiry_promotion(
    state: &LicenseState,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    matches!(state, LicenseState::Active) && now > expires_at
}

/// Checks the `active → suspended` transition.
///
/// Legal from `active` regardless of expiry — the read path promotes
/// past-expiry records first, so this is only reached while still
/// nominally active.
///
/// # Errors
///
/// `InvalidInput` for a blank reason; `AlreadyInState` when already
/// suspended; `IllegalTransition` from expired or revoked.
pub fn check_suspend(state: &LicenseState, reason: &str) -> LicenseResult<()> {
    if reason.trim().is_empty() {
        return Err(LicenseError::InvalidInput(
            "suspension reason is required".to_string(),
        ));
    }
    match state {
        LicenseState::Active => Ok(()),
        LicenseState::Suspended { .. } => {
            Err(LicenseError::AlreadyInState(StatusCode::Suspended))
        }
        other => Err(LicenseError::IllegalTransition {
            from: other.code(),
            to: StatusCode::Suspended,
        }),
    }
}

/// Checks the `suspended → active` reactivation.
///
/// The one rule that must consult persisted status and expiry
/// together: a suspended record whose expiry has passed cannot come
/// back, full stop.
///
/// # Errors
///
/// `Expired` for a past-expiry suspended record; `AlreadyInState` when
/// already active; `IllegalTransition` from expired or revoked.
pub fn check_reactivate(
    state: &LicenseState,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> LicenseResult<()> {
    match state {
        LicenseState::Suspended { .. } => {
            if expires_at < now {
                Err(LicenseError::Expired(expires_at))
            } else {
                Ok(())
            }
        }
        LicenseState::Active => Err(LicenseError::AlreadyInState(StatusCode::Active)),
        other => Err(LicenseError::IllegalTransition {
            from: other.code(),
            to: StatusCode::Active,
        }),
    }
}
