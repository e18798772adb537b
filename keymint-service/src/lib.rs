//! License issuance and lifecycle orchestration for keymint.
//!
//! `LicenseService` ties the pure core (`keymint-license`) to an
//! injected storage contract (`keymint-storage`):
//! - mints and persists keys at creation time
//! - reconciles persisted vs. effective status on every read,
//!   promoting `active → expired` with a guarded write
//! - enforces the lifecycle rules before suspend/reactivate writes
//! - pairs every creation and transition with exactly one audit entry
//! - retries transient storage failures on the read paths only
//!
//! The HTTP surface, throttling, and delivery are not here; callers
//! embed the service behind whatever transport they run.

mod audit;
mod config;
mod error;
mod service;

pub use audit::AuditRecorder;
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use service::{
    BatchOutcome, CreateLicense, InvalidityReason, LicenseService, ValidityReport, SYSTEM_ACTOR,
};
