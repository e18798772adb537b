//! Core identifier types for keymint.
//!
//! This crate defines the fundamental identifiers used throughout the
//! licensing core:
//! - `LicenseId`: surrogate record identity (UUID v7, time-ordered)
//! - `InstanceId`: the random per-key instance identifier baked into
//!   key derivation (UUID v4)
//!
//! Domain logic (facts, key derivation, lifecycle rules) lives in
//! `keymint-license`; persistence in `keymint-storage`.

mod ids;

pub use ids::{InstanceId, LicenseId};
