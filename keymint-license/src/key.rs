//! License key derivation, formatting, and verification.
//!
//! A key is a projection of a [`LicenseFacts`] plus the signing
//! secret — the facts are persisted separately so a presented key can
//! later be re-derived and cross-checked.

use crate::error::{LicenseError, LicenseResult};
use crate::facts::LicenseFacts;
use crate::signer::{checksum_digest, Signer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Total key length after stripping the delimiters.
pub const KEY_LENGTH: usize = 25;

/// Characters per dash-separated group.
const GROUP_SIZE: usize = 5;

/// Length of the segment derived from the keyed digest.
const DERIVED_LENGTH: usize = 20;

/// Length of the checksum segment.
const CHECKSUM_LENGTH: usize = 5;

/// Strips everything but ASCII alphanumerics and upper-cases the rest.
fn normalize(candidate: &str) -> String {
    candidate
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Structural check: exactly 25 alphanumerics once delimiters are
/// stripped, case-insensitive.
///
/// Necessary but not sufficient — this says nothing about
/// authenticity. Use [`KeyCodec::verify`] for that.
#[must_use]
pub fn validate_format(candidate: &str) -> bool {
    normalize(candidate).len() == KEY_LENGTH
}

/// A 25-character license key, always rendered as five dash-separated
/// groups of five: `XXXXX-XXXXX-XXXXX-XXXXX-XXXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Parses a candidate string presented by a caller.
    ///
    /// Accepts any delimiter/casing noise around a structurally valid
    /// key and normalizes to the canonical grouped rendering.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` when the candidate does not strip down to
    /// exactly 25 alphanumerics.
    pub fn parse(candidate: &str) -> LicenseResult<Self> {
        let raw = normalize(candidate);
        if raw.len() != KEY_LENGTH {
            return Err(LicenseError::InvalidFormat);
        }
        Ok(Self(group(&raw)))
    }

    /// Builds a key from a freshly derived 25-character payload.
    ///
    /// # Errors
    ///
    /// `Encoding` when the payload is not exactly 25 alphanumerics.
    /// Unreachable given the fixed-width derivation steps; kept as a
    /// defensive invariant.
    fn from_raw(raw: &str) -> LicenseResult<Self> {
        let raw = normalize(raw);
        if raw.len() != KEY_LENGTH {
            return Err(LicenseError::Encoding(format!(
                "derived key has {} characters, expected {}",
                raw.len(),
                KEY_LENGTH
            )));
        }
        Ok(Self(group(&raw)))
    }

    /// The canonical dash-grouped rendering.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 25 characters without delimiters.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize(&self.0)
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LicenseKey {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Renders a normalized payload as dash-separated groups.
fn group(raw: &str) -> String {
    raw.as_bytes()
        .chunks(GROUP_SIZE)
        .map(|chunk| std::str::from_utf8(chunk).expect("chunk boundaries are ASCII"))
        .collect::<Vec<_>>()
        .join("-")
}

/// A freshly minted key plus the out-of-band signature over the full
/// fact set. The signature is stored in record metadata for later
/// re-verification; it is not part of the key itself.
#[derive(Debug, Clone)]
pub struct MintedKey {
    pub key: LicenseKey,
    pub signature: String,
}

/// Derives and verifies license keys from license facts.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    signer: Signer,
}

impl KeyCodec {
    /// Creates a codec over the given signer.
    #[must_use]
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Convenience constructor from a raw secret.
    #[must_use]
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Self {
        Self::new(Signer::new(secret))
    }

    /// Mints the key for a fact set.
    ///
    /// The derived segment is the first 20 hex characters of the keyed
    /// digest over the canonical fact string; the checksum segment is
    /// the first 5 hex characters of the checksum digest over that
    /// keyed digest. Both are upper-cased and grouped.
    ///
    /// # Errors
    ///
    /// `Encoding` if the assembled key is not exactly 25 characters
    /// (defensive invariant); `Encoding` if the fact set cannot be
    /// serialized for the out-of-band signature.
    pub fn mint(&self, facts: &LicenseFacts) -> LicenseResult<MintedKey> {
        let digest = self.signer.keyed_digest(facts.canonical_input().as_bytes());
        let derived = &digest[..DERIVED_LENGTH];
        let checksum = checksum_digest(digest.as_bytes());
        let raw = format!("{derived}{}", &checksum[..CHECKSUM_LENGTH]).to_uppercase();
        let key = LicenseKey::from_raw(&raw)?;

        let signature = self.signer.keyed_digest(facts.signing_payload()?.as_bytes());
        Ok(MintedKey { key, signature })
    }

    /// Verifies a presented key against a stored fact set.
    ///
    /// Recomputes both segments from the facts and compares. Always
    /// answers with a boolean — malformed input is a `false`, never an
    /// error, because candidates are untrusted.
    #[must_use]
    pub fn verify(&self, candidate: &str, facts: &LicenseFacts) -> bool {
        let normalized = normalize(candidate);
        if normalized.len() != KEY_LENGTH {
            return false;
        }

        let digest = self.signer.keyed_digest(facts.canonical_input().as_bytes());
        let expected_derived = digest[..DERIVED_LENGTH].to_uppercase();
        let expected_checksum = checksum_digest(digest.as_bytes())[..CHECKSUM_LENGTH].to_uppercase();

        normalized[..DERIVED_LENGTH] == expected_derived
            && normalized[DERIVED_LENGTH..] == expected_checksum
    }
}
