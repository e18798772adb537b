//! License orchestration over an injected storage contract.

use crate::audit::AuditRecorder;
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use chrono::{Duration, Utc};
use keymint_license::{
    check_reactivate, check_suspend, needs_expiry_promotion, KeyCodec, LicenseError, LicenseFacts,
    LicenseKey, LicenseState, StatusCode,
};
use keymint_storage::{
    AuditEntry, LicenseRecord, LicenseStats, LicenseStore, ListFilter, Provenance, StorageResult,
};
use serde::{Deserialize, Serialize};

/// Actor recorded for automatic transitions.
pub const SYSTEM_ACTOR: &str = "system";

/// Reason recorded for automatic expiry promotion.
const AUTO_EXPIRE_REASON: &str = "Auto-expired";

/// Retry budget for read-path operations on transient failures.
const READ_RETRY_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles per attempt.
const RETRY_BACKOFF_BASE: std::time::Duration = std::time::Duration::from_millis(100);

/// How many compare-and-set rounds a transition gets before reporting
/// a conflict.
const TRANSITION_ATTEMPTS: u32 = 3;

/// Upper bound on one batch issuance.
const MAX_BATCH_SIZE: usize = 50;

/// An issuance request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLicense {
    pub email: String,
    pub name: String,
    pub validity_days: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub max_activations: Option<u32>,
}

/// Why a presented key is not currently valid. Reasons are mutually
/// exclusive and checked in this precedence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidityReason {
    NotFound,
    Suspended {
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Revoked,
    Expired,
}

/// Outcome of a validity check.
#[derive(Debug, Clone, Serialize)]
pub struct ValidityReport {
    pub valid: bool,
    #[serde(flatten)]
    pub reason: Option<InvalidityReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<LicenseRecord>,
}

/// Per-index results of a batch issuance.
#[derive(Debug)]
pub struct BatchOutcome {
    pub created: Vec<(usize, LicenseRecord)>,
    pub failed: Vec<(usize, ServiceError)>,
}

/// Orchestrates the key codec and lifecycle rules against a store.
pub struct LicenseService<S: LicenseStore> {
    store: S,
    codec: KeyCodec,
    product_id: String,
}

impl<S: LicenseStore> LicenseService<S> {
    /// Creates a service over an injected store.
    pub fn new(config: &ServiceConfig, store: S) -> Self {
        Self {
            store,
            codec: KeyCodec::from_secret(config.signing_secret.as_bytes()),
            product_id: config.product_id.clone(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The key codec bound to this service's secret.
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Issues a new license: mints the key, persists the record as
    /// active, and records one `created` audit entry.
    pub fn create(
        &self,
        request: &CreateLicense,
        provenance: &Provenance,
    ) -> ServiceResult<LicenseRecord> {
        let now = Utc::now();
        let expiry = now + Duration::days(i64::from(request.validity_days));
        let facts = LicenseFacts::issue(
            &request.email,
            &request.name,
            &self.product_id,
            expiry,
            request.features.clone(),
            request.max_activations.unwrap_or(1),
            now,
        )?;

        let minted = self.codec.mint(&facts)?;
        let record = self
            .store
            .insert_license(&facts, &minted.key, &minted.signature, provenance)?;
        AuditRecorder::new(&self.store).created(record.id, SYSTEM_ACTOR)?;

        tracing::info!(id = %record.id, key = %record.key, email = %record.email, "license created");
        Ok(record)
    }

    /// Issues a batch, collecting per-index successes and failures.
    pub fn create_batch(
        &self,
        requests: &[CreateLicense],
        provenance: &Provenance,
    ) -> ServiceResult<BatchOutcome> {
        if requests.is_empty() {
            return Err(
                LicenseError::InvalidInput("batch must not be empty".to_string()).into(),
            );
        }
        if requests.len() > MAX_BATCH_SIZE {
            return Err(LicenseError::InvalidInput(format!(
                "batch size cannot exceed {MAX_BATCH_SIZE}"
            ))
            .into());
        }

        let mut outcome = BatchOutcome {
            created: Vec::new(),
            failed: Vec::new(),
        };
        for (index, request) in requests.iter().enumerate() {
            match self.create(request, provenance) {
                Ok(record) => outcome.created.push((index, record)),
                Err(err) => outcome.failed.push((index, err)),
            }
        }
        tracing::info!(
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "batch issuance finished"
        );
        Ok(outcome)
    }

    /// Fetches a record by its presented key, reconciling persisted
    /// vs. effective status.
    ///
    /// Format failure short-circuits before storage. On a hit the
    /// last-checked instant is stamped unconditionally, and a
    /// persisted-active record past its expiry is promoted to expired
    /// with a guarded write plus one audit entry. Losing that guard to
    /// a concurrent reader just means observing the winner's write.
    pub fn fetch_by_key(&self, candidate: &str) -> ServiceResult<LicenseRecord> {
        let key = LicenseKey::parse(candidate)?;
        let mut record = self
            .retry_read(|| self.store.get_by_key(&key))?
            .ok_or(ServiceError::NotFound)?;

        let now = Utc::now();
        self.store.touch_last_checked(record.id, now)?;
        record.last_checked = Some(now);

        if needs_expiry_promotion(&record.state, record.expires_at, now) {
            match self
                .store
                .update_status(record.id, StatusCode::Active, &LicenseState::Expired)?
            {
                Some(promoted) => {
                    AuditRecorder::new(&self.store).status_changed(
                        promoted.id,
                        StatusCode::Active,
                        StatusCode::Expired,
                        Some(AUTO_EXPIRE_REASON),
                        SYSTEM_ACTOR,
                    )?;
                    tracing::debug!(id = %promoted.id, "license auto-promoted to expired");
                    record = promoted;
                }
                None => {
                    // A concurrent reader won the promotion; observe it.
                    record = self
                        .retry_read(|| self.store.get_by_key(&key))?
                        .ok_or(ServiceError::NotFound)?;
                }
            }
        }

        Ok(record)
    }

    /// Answers whether a presented key is currently valid, with a
    /// structured reason when it is not.
    ///
    /// Reasons are checked in precedence order: not found, suspended
    /// (with detail), revoked, expired. A suspended record past its
    /// expiry reports `suspended` — suspension wins for reporting even
    /// though reactivation would be refused as expired.
    pub fn check_validity(&self, candidate: &str) -> ServiceResult<ValidityReport> {
        let record = match self.fetch_by_key(candidate) {
            Ok(record) => record,
            Err(ServiceError::NotFound) => {
                return Ok(ValidityReport {
                    valid: false,
                    reason: Some(InvalidityReason::NotFound),
                    record: None,
                })
            }
            Err(err) => return Err(err),
        };

        let now = Utc::now();
        let reason = match &record.state {
            LicenseState::Suspended { reason, .. } => Some(InvalidityReason::Suspended {
                detail: Some(reason.clone()),
            }),
            LicenseState::Revoked => Some(InvalidityReason::Revoked),
            LicenseState::Expired => Some(InvalidityReason::Expired),
            LicenseState::Active if now > record.expires_at => Some(InvalidityReason::Expired),
            LicenseState::Active => None,
        };

        Ok(ValidityReport {
            valid: reason.is_none(),
            reason,
            record: Some(record),
        })
    }

    /// Suspends an active license with a reason.
    pub fn suspend(
        &self,
        candidate: &str,
        reason: &str,
        actor: &str,
    ) -> ServiceResult<LicenseRecord> {
        for _ in 0..TRANSITION_ATTEMPTS {
            let record = self.fetch_by_key(candidate)?;
            check_suspend(&record.state, reason)?;

            let to = LicenseState::Suspended {
                at: Utc::now(),
                reason: reason.trim().to_string(),
            };
            if let Some(updated) = self.store.update_status(record.id, StatusCode::Active, &to)? {
                AuditRecorder::new(&self.store).status_changed(
                    updated.id,
                    StatusCode::Active,
                    StatusCode::Suspended,
                    Some(reason.trim()),
                    actor,
                )?;
                tracing::info!(id = %updated.id, actor, "license suspended");
                return Ok(updated);
            }
            // Guard miss: re-read and re-check; the common conflict
            // (a racing suspend won) surfaces through check_suspend
            // on the next round.
        }
        Err(ServiceError::Conflict(
            "license status kept changing during suspend".to_string(),
        ))
    }

    /// Reactivates a suspended license, clearing its suspension
    /// metadata. Refused once the expiry has passed.
    pub fn reactivate(&self, candidate: &str, actor: &str) -> ServiceResult<LicenseRecord> {
        for _ in 0..TRANSITION_ATTEMPTS {
            let record = self.fetch_by_key(candidate)?;
            check_reactivate(&record.state, record.expires_at, Utc::now())?;

            if let Some(updated) =
                self.store
                    .update_status(record.id, StatusCode::Suspended, &LicenseState::Active)?
            {
                AuditRecorder::new(&self.store).reactivated(updated.id, actor)?;
                tracing::info!(id = %updated.id, actor, "license reactivated");
                return Ok(updated);
            }
        }
        Err(ServiceError::Conflict(
            "license status kept changing during reactivate".to_string(),
        ))
    }

    /// Filtered listing, newest first.
    pub fn list(&self, filter: &ListFilter) -> ServiceResult<Vec<LicenseRecord>> {
        self.retry_read(|| self.store.list_licenses(filter))
    }

    /// The audit trail for a presented key, newest first.
    pub fn history(&self, candidate: &str) -> ServiceResult<Vec<AuditEntry>> {
        let record = self.fetch_by_key(candidate)?;
        self.retry_read(|| self.store.history(record.id))
    }

    /// Aggregate counts by effective bucket.
    pub fn stats(&self) -> ServiceResult<LicenseStats> {
        let now = Utc::now();
        self.retry_read(|| self.store.aggregate_stats(now))
    }

    /// Promotes every persisted-active record past its expiry, with
    /// one audit entry each, returning the number changed. Running it
    /// twice back-to-back yields zero the second time.
    pub fn sweep_expired(&self) -> ServiceResult<u64> {
        let promoted = self.store.sweep_expired(Utc::now())?;
        let recorder = AuditRecorder::new(&self.store);
        for id in &promoted {
            recorder.status_changed(
                *id,
                StatusCode::Active,
                StatusCode::Expired,
                Some(AUTO_EXPIRE_REASON),
                SYSTEM_ACTOR,
            )?;
        }
        tracing::info!(count = promoted.len(), "expiry sweep finished");
        Ok(promoted.len() as u64)
    }

    /// Storage connectivity check, with the read retry policy.
    pub fn health_check(&self) -> ServiceResult<()> {
        self.retry_read(|| self.store.ping())
    }

    /// Re-derives a record's key from its stored facts and
    /// cross-checks it against the stored key string.
    #[must_use]
    pub fn verify_record(&self, record: &LicenseRecord) -> bool {
        self.codec.verify(record.key.as_str(), &record.facts())
    }

    /// Runs a read-path operation, retrying transient storage
    /// failures with exponential backoff. Mutations never come
    /// through here.
    fn retry_read<T>(&self, mut op: impl FnMut() -> StorageResult<T>) -> ServiceResult<T> {
        let mut attempt = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    attempt += 1;
                    if attempt >= READ_RETRY_ATTEMPTS {
                        return Err(ServiceError::StorageUnavailable {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let backoff = RETRY_BACKOFF_BASE * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient storage failure, retrying"
                    );
                    std::thread::sleep(backoff);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
