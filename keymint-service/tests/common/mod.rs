//! Shared test helpers for service tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use keymint_license::{LicenseFacts, FACTS_VERSION};
use keymint_service::{CreateLicense, LicenseService, ServiceConfig};
use keymint_storage::{LicenseRecord, LicenseStore, Provenance, SqliteStore};
use keymint_types::InstanceId;

pub const TEST_SECRET: &str = "service-test-signing-secret";
pub const TEST_PRODUCT: &str = "acme-pos-v1";

pub struct TestHarness {
    pub service: LicenseService<SqliteStore>,
    _dir: tempfile::TempDir,
}

/// A service over a fresh file-backed store.
pub fn harness() -> TestHarness {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("licenses.db")).unwrap();
    let config = ServiceConfig::new(TEST_SECRET, TEST_PRODUCT);
    TestHarness {
        service: LicenseService::new(&config, store),
        _dir: dir,
    }
}

/// A 30-day issuance request with defaults left blank.
pub fn request(email: &str) -> CreateLicense {
    CreateLicense {
        email: email.to_string(),
        name: "Svc Tester".to_string(),
        validity_days: 30,
        features: Vec::new(),
        max_activations: None,
    }
}

pub fn provenance() -> Provenance {
    Provenance::from_origin("test")
}

/// Inserts a record directly through the store with an arbitrary
/// expiry offset (negative for already-expired), bypassing issuance
/// validation. The key is minted with the service's own codec so it
/// still verifies.
pub fn insert_with_expiry(
    service: &LicenseService<SqliteStore>,
    email: &str,
    expires_in_days: i64,
) -> LicenseRecord {
    let now = Utc::now();
    let facts = LicenseFacts {
        email: email.to_string(),
        name: "Svc Tester".to_string(),
        product_id: TEST_PRODUCT.to_string(),
        expiry: now + Duration::days(expires_in_days),
        features: vec!["basic".to_string()],
        max_activations: 1,
        generated: now - Duration::days(40),
        version: FACTS_VERSION.to_string(),
        uuid: InstanceId::new(),
    };
    let minted = service.codec().mint(&facts).unwrap();
    service
        .store()
        .insert_license(&facts, &minted.key, &minted.signature, &provenance())
        .unwrap()
}
