//! Shared test helpers for licensing-core tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use keymint_license::{KeyCodec, LicenseFacts, FACTS_VERSION};
use keymint_types::InstanceId;

pub const TEST_SECRET: &str = "keymint-test-signing-secret-v1";
pub const TEST_PRODUCT: &str = "acme-pos-v1";

/// Codec over the fixed test secret.
pub fn test_codec() -> KeyCodec {
    KeyCodec::from_secret(TEST_SECRET)
}

/// A fixed instant with whole-millisecond precision.
pub fn at_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

/// A valid fact set issued now, expiring in 30 days.
pub fn make_facts() -> LicenseFacts {
    let now = Utc::now();
    LicenseFacts::issue(
        "customer@example.com",
        "Test Customer",
        TEST_PRODUCT,
        now + chrono::Duration::days(30),
        vec!["basic".to_string()],
        1,
        now,
    )
    .unwrap()
}

/// A fully pinned fact set for deterministic derivation tests.
pub fn pinned_facts() -> LicenseFacts {
    LicenseFacts {
        email: "customer@example.com".to_string(),
        name: "Test Customer".to_string(),
        product_id: TEST_PRODUCT.to_string(),
        expiry: at_millis(1_900_000_000_000),
        features: vec!["basic".to_string(), "pro".to_string()],
        max_activations: 3,
        generated: at_millis(1_700_000_000_000),
        version: FACTS_VERSION.to_string(),
        uuid: InstanceId::parse("6f1c1b5e-9c40-4b0f-8d2a-3a8f6f1e2b4c").unwrap(),
    }
}
