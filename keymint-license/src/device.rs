//! Device fingerprinting and activation-key derivation.
//!
//! Helpers for the activation tracking schema. No enforcement logic
//! lives here: activation counting is recorded, not policed.

use crate::key::LicenseKey;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Length of a device fingerprint in hex characters.
const FINGERPRINT_LENGTH: usize = 32;

/// Length of an activation key in hex characters.
const ACTIVATION_KEY_LENGTH: usize = 16;

/// Derives a device fingerprint from request facts.
///
/// Missing components collapse to `"unknown"` so the fingerprint is
/// always derivable, just weaker.
#[must_use]
pub fn device_fingerprint(user_agent: Option<&str>, ip_address: Option<&str>) -> String {
    let facts = serde_json::json!({
        "userAgent": user_agent.unwrap_or("unknown"),
        "ipAddress": ip_address.unwrap_or("unknown"),
    });

    let mut hasher = Sha256::new();
    hasher.update(facts.to_string().as_bytes());
    let hash = hex::encode(hasher.finalize());
    hash[..FINGERPRINT_LENGTH].to_string()
}

/// Derives an activation key binding a license key to a device
/// fingerprint at an instant.
#[must_use]
pub fn activation_key(key: &LicenseKey, fingerprint: &str, now: DateTime<Utc>) -> String {
    let input = format!("{key}|{fingerprint}|{}", now.timestamp_millis());

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hash = hex::encode(hasher.finalize());
    hash[..ACTIVATION_KEY_LENGTH].to_uppercase()
}
