//! The storage contract consumed by the service layer.

use crate::error::StorageResult;
use crate::model::{
    AuditEntry, LicenseRecord, LicenseStats, ListFilter, NewAuditEntry, Provenance,
};
use chrono::{DateTime, Utc};
use keymint_license::{LicenseFacts, LicenseKey, LicenseState, StatusCode};
use keymint_types::LicenseId;

/// Narrow persistence contract for license records and their history.
///
/// Implementations must make [`update_status`](Self::update_status) an
/// atomic compare-and-set on the persisted status: of two racing
/// writers at most one observes its expected status, and suspension
/// metadata changes atomically with the status column.
pub trait LicenseStore: Send + Sync {
    /// Persists a freshly minted license as active.
    fn insert_license(
        &self,
        facts: &LicenseFacts,
        key: &LicenseKey,
        signature: &str,
        provenance: &Provenance,
    ) -> StorageResult<LicenseRecord>;

    /// Looks a record up by its key.
    fn get_by_key(&self, key: &LicenseKey) -> StorageResult<Option<LicenseRecord>>;

    /// Stamps the last-checked instant. Pure bookkeeping; no status
    /// logic.
    fn touch_last_checked(&self, id: LicenseId, now: DateTime<Utc>) -> StorageResult<()>;

    /// Compare-and-set status transition: writes `to` only if the
    /// persisted status still equals `from`. Returns the updated
    /// record, or `None` when the guard failed (a concurrent writer
    /// got there first).
    fn update_status(
        &self,
        id: LicenseId,
        from: StatusCode,
        to: &LicenseState,
    ) -> StorageResult<Option<LicenseRecord>>;

    /// Appends one immutable history entry.
    fn append_history(&self, entry: &NewAuditEntry) -> StorageResult<()>;

    /// The record's history, newest first.
    fn history(&self, id: LicenseId) -> StorageResult<Vec<AuditEntry>>;

    /// Filtered listing, newest first.
    fn list_licenses(&self, filter: &ListFilter) -> StorageResult<Vec<LicenseRecord>>;

    /// Aggregate counts by effective bucket at `now`.
    fn aggregate_stats(&self, now: DateTime<Utc>) -> StorageResult<LicenseStats>;

    /// Promotes every persisted-active record past its expiry to
    /// expired, in one guarded pass, and returns the ids actually
    /// promoted. Idempotent; never touches suspended or revoked rows.
    fn sweep_expired(&self, now: DateTime<Utc>) -> StorageResult<Vec<LicenseId>>;

    /// Connectivity check.
    fn ping(&self) -> StorageResult<()>;
}
