//! The signed payload a license is derived from.
//!
//! `LicenseFacts` is immutable once issued: it is the sole input to
//! key derivation and the sole thing the out-of-band signature covers.
//! The JSON field names (`productId`, `maxActivations`, …) are part of
//! the signature input and must not change.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Utc};
use keymint_types::InstanceId;
use serde::{Deserialize, Serialize};

/// Schema version stamped into every issued fact set.
pub const FACTS_VERSION: &str = "1.0";

/// Feature tag applied when the caller supplies none.
pub const DEFAULT_FEATURE: &str = "basic";

/// The identifying facts of one license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseFacts {
    /// Customer email, lower-cased and trimmed.
    pub email: String,
    /// Customer name, trimmed.
    pub name: String,
    /// Process-wide product identifier.
    pub product_id: String,
    /// Expiry instant.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expiry: DateTime<Utc>,
    /// Feature tags, in the order supplied. Never empty.
    pub features: Vec<String>,
    /// Maximum activation count. Always positive.
    pub max_activations: u32,
    /// Issuance instant.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub generated: DateTime<Utc>,
    /// Schema version of this fact set.
    pub version: String,
    /// Random per-license instance identifier.
    pub uuid: InstanceId,
}

impl LicenseFacts {
    /// Issues a validated fact set at `now`.
    ///
    /// Normalizes the email (trim + lowercase) and name (trim), drops
    /// blank feature tags and falls back to [`DEFAULT_FEATURE`] when
    /// none remain, and stamps a fresh [`InstanceId`].
    ///
    /// # Errors
    ///
    /// `InvalidInput` when the email or name is empty after trimming,
    /// the expiry is not strictly after `now`, or `max_activations`
    /// is zero.
    pub fn issue(
        email: &str,
        name: &str,
        product_id: &str,
        expiry: DateTime<Utc>,
        features: Vec<String>,
        max_activations: u32,
        now: DateTime<Utc>,
    ) -> LicenseResult<Self> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(LicenseError::InvalidInput(
                "customer email is required".to_string(),
            ));
        }

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(LicenseError::InvalidInput(
                "customer name is required".to_string(),
            ));
        }

        if expiry <= now {
            return Err(LicenseError::InvalidInput(
                "expiry must be in the future".to_string(),
            ));
        }

        if max_activations == 0 {
            return Err(LicenseError::InvalidInput(
                "max activations must be positive".to_string(),
            ));
        }

        let mut features: Vec<String> = features
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if features.is_empty() {
            features.push(DEFAULT_FEATURE.to_string());
        }

        Ok(Self {
            email,
            name,
            product_id: product_id.to_string(),
            expiry,
            features,
            max_activations,
            generated: now,
            version: FACTS_VERSION.to_string(),
            uuid: InstanceId::new(),
        })
    }

    /// The canonical pipe-delimited string key derivation digests.
    ///
    /// Feature order is significant: re-issuing with reordered tags
    /// yields a different key. Known limitation, kept for
    /// compatibility with already-issued keys.
    #[must_use]
    pub fn canonical_input(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.email,
            self.expiry.timestamp_millis(),
            self.features.join(","),
            self.generated.timestamp_millis(),
            self.uuid
        )
    }

    /// The canonical JSON the out-of-band signature covers. Unlike
    /// [`canonical_input`](Self::canonical_input), this includes every
    /// field (product id, name, max activations, version).
    pub fn signing_payload(&self) -> LicenseResult<String> {
        serde_json::to_string(self).map_err(|e| LicenseError::Encoding(e.to_string()))
    }
}
