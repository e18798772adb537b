//! The audit recorder: every creation and transition appends exactly
//! one immutable history entry through the storage contract.

use keymint_license::StatusCode;
use keymint_storage::{AuditAction, LicenseStore, NewAuditEntry, StorageResult};
use keymint_types::LicenseId;

const CREATED_REASON: &str = "License generated";
const REACTIVATED_REASON: &str = "License reactivated";

/// Appends history entries for one store.
pub struct AuditRecorder<'a, S: LicenseStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: LicenseStore + ?Sized> AuditRecorder<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Records an issuance: no old status, new status active.
    pub fn created(&self, id: LicenseId, actor: &str) -> StorageResult<()> {
        self.store.append_history(&NewAuditEntry {
            license_id: id,
            action: AuditAction::Created,
            old_status: None,
            new_status: Some(StatusCode::Active),
            reason: Some(CREATED_REASON.to_string()),
            performed_by: actor.to_string(),
        })
    }

    /// Records a status transition with its old/new pairing.
    pub fn status_changed(
        &self,
        id: LicenseId,
        old: StatusCode,
        new: StatusCode,
        reason: Option<&str>,
        actor: &str,
    ) -> StorageResult<()> {
        self.store.append_history(&NewAuditEntry {
            license_id: id,
            action: AuditAction::StatusChanged,
            old_status: Some(old),
            new_status: Some(new),
            reason: reason.map(str::to_string),
            performed_by: actor.to_string(),
        })
    }

    /// Records a reactivation (`suspended → active`).
    pub fn reactivated(&self, id: LicenseId, actor: &str) -> StorageResult<()> {
        self.store.append_history(&NewAuditEntry {
            license_id: id,
            action: AuditAction::Reactivated,
            old_status: Some(StatusCode::Suspended),
            new_status: Some(StatusCode::Active),
            reason: Some(REACTIVATED_REASON.to_string()),
            performed_by: actor.to_string(),
        })
    }
}
