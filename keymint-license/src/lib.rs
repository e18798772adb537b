//! License facts, key derivation, and lifecycle rules for keymint.
//!
//! This crate is the pure core of the licensing system. It handles:
//! - The signed fact set every license is derived from
//! - Key derivation: HMAC-SHA256 over a canonical fact string,
//!   truncated and checksummed into a 25-character typeable key
//! - Structural and cryptographic key verification
//! - The lifecycle state machine (active / suspended / expired /
//!   revoked) and the effective-status rule
//!
//! # Design Principles
//!
//! - **No I/O**: everything here is a pure function over values.
//!   Persistence lives in `keymint-storage`, orchestration in
//!   `keymint-service`.
//! - **Explicit secrets**: the signing secret is passed in at
//!   construction, never read from ambient state, so multiple
//!   secrets and products can coexist in one process.
//! - **Verification never panics**: `verify` is called on untrusted
//!   input and always answers with a boolean.
//!
//! # License Key Format
//!
//! Keys are 25 uppercase alphanumerics rendered as five dash-separated
//! groups of five: `XXXXX-XXXXX-XXXXX-XXXXX-XXXXX`. The first 20
//! characters derive from the keyed digest of the canonical fact
//! string; the last 5 are a checksum over that digest.

mod device;
mod error;
mod facts;
mod key;
mod lifecycle;
mod signer;

pub use device::{activation_key, device_fingerprint};
pub use error::{LicenseError, LicenseResult};
pub use facts::{LicenseFacts, DEFAULT_FEATURE, FACTS_VERSION};
pub use key::{validate_format, KeyCodec, LicenseKey, MintedKey, KEY_LENGTH};
pub use lifecycle::{
    check_reactivate, check_suspend, effective_status, needs_expiry_promotion, LicenseState,
    StatusCode,
};
pub use signer::{checksum_digest, Signer};
