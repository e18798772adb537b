//! Persisted entities: license records, audit entries, filters, stats.

use chrono::{DateTime, Utc};
use keymint_license::{effective_status, LicenseFacts, LicenseKey, LicenseState, StatusCode};
use keymint_types::{InstanceId, LicenseId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far back a license still counts as "recent" in the stats.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Where an issuance request came from.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub origin: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Provenance {
    /// Provenance with just an origin tag.
    #[must_use]
    pub fn from_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ip_address: None,
            user_agent: None,
        }
    }
}

/// The free-form metadata column: issuance provenance plus the
/// out-of-band signature over the fact set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub signature: String,
}

/// A persisted license.
///
/// The embedded fact fields are flattened; suspension metadata lives
/// inside [`LicenseState`], so it is present exactly when the record
/// is suspended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub id: LicenseId,
    pub key: LicenseKey,
    pub email: String,
    pub name: String,
    pub product_id: String,
    pub features: Vec<String>,
    pub max_activations: u32,
    pub current_activations: u32,
    pub instance: InstanceId,
    pub facts_version: String,
    #[serde(flatten)]
    pub state: LicenseState,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_checked: Option<DateTime<Utc>>,
    pub metadata: RecordMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LicenseRecord {
    /// The status a caller should observe at `now`.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> StatusCode {
        effective_status(&self.state, self.expires_at, now)
    }

    /// Rebuilds the fact set this record was issued from, for
    /// re-deriving and cross-checking a presented key.
    #[must_use]
    pub fn facts(&self) -> LicenseFacts {
        LicenseFacts {
            email: self.email.clone(),
            name: self.name.clone(),
            product_id: self.product_id.clone(),
            expiry: self.expires_at,
            features: self.features.clone(),
            max_activations: self.max_activations,
            generated: self.issued_at,
            version: self.facts_version.clone(),
            uuid: self.instance,
        }
    }
}

/// What happened to a license, as recorded in its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
    Reactivated,
}

impl AuditAction {
    /// The storage spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChanged => "status_changed",
            Self::Reactivated => "reactivated",
        }
    }

    /// Parses the storage spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "status_changed" => Some(Self::StatusChanged),
            "reactivated" => Some(Self::Reactivated),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable history entry. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub license_id: LicenseId,
    pub action: AuditAction,
    pub old_status: Option<StatusCode>,
    pub new_status: Option<StatusCode>,
    pub reason: Option<String>,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

/// Input for appending a history entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub license_id: LicenseId,
    pub action: AuditAction,
    pub old_status: Option<StatusCode>,
    pub new_status: Option<StatusCode>,
    pub reason: Option<String>,
    pub performed_by: String,
}

/// Listing filter. Substring matches are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<StatusCode>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub limit: Option<u32>,
}

/// Aggregate counts by effective bucket. `active` excludes past-expiry
/// records; `expired` includes them even while still persisted active;
/// the buckets are internally consistent, not mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LicenseStats {
    pub total: u64,
    pub active: u64,
    pub suspended: u64,
    pub expired: u64,
    pub revoked: u64,
    pub recent: u64,
}
