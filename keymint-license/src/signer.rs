//! Keyed and unkeyed digests used by key derivation.
//!
//! The keyed digest (HMAC-SHA256) is the tamper-evident primitive; the
//! unkeyed checksum digest (MD5) only shortens the keyed digest into
//! the 5-character checksum segment and carries no authentication
//! weight of its own.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Computes keyed digests over a construction-time signing secret.
///
/// Cheap to clone; the secret is shared, not re-derived.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
}

impl Signer {
    /// Creates a signer over the given secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Deterministic keyed digest of `message`, as lowercase hex.
    ///
    /// Same `(secret, message)` always yields the same 64-character
    /// output; flipping one bit of either input changes roughly half
    /// the output bits.
    #[must_use]
    pub fn keyed_digest(&self, message: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret.
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

/// Deterministic unkeyed digest of `message`, as lowercase hex.
///
/// Used only for compact checksum derivation; not a substitute for
/// [`Signer::keyed_digest`]'s tamper-evidence.
#[must_use]
pub fn checksum_digest(message: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(message);
    hex::encode(hasher.finalize())
}
