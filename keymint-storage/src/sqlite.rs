//! Pooled SQLite implementation of [`LicenseStore`].
//!
//! The schema bootstraps on open. All timestamps are stored as epoch
//! milliseconds; feature lists and record metadata are JSON columns.

use crate::error::{StorageError, StorageResult};
use crate::model::{
    AuditAction, AuditEntry, LicenseRecord, LicenseStats, ListFilter, NewAuditEntry, Provenance,
    RecordMetadata,
};
use crate::store::LicenseStore;
use chrono::{DateTime, TimeZone, Utc};
use keymint_license::{LicenseFacts, LicenseKey, LicenseState, StatusCode};
use keymint_types::{InstanceId, LicenseId};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

/// Upper bound on pooled connections.
const POOL_MAX_SIZE: u32 = 10;

/// How long to wait for a pooled connection before failing.
const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS licenses (
    id TEXT PRIMARY KEY,
    license_key TEXT UNIQUE NOT NULL,
    customer_email TEXT NOT NULL,
    customer_name TEXT NOT NULL,
    product_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'suspended', 'expired', 'revoked')),
    features TEXT NOT NULL DEFAULT '[]',
    max_activations INTEGER NOT NULL DEFAULT 1,
    current_activations INTEGER NOT NULL DEFAULT 0,
    instance_id TEXT NOT NULL,
    facts_version TEXT NOT NULL,
    issued_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    suspended_at INTEGER,
    suspended_reason TEXT,
    last_checked INTEGER,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS license_activations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    license_id TEXT NOT NULL REFERENCES licenses(id) ON DELETE CASCADE,
    device_fingerprint TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT,
    activated_at INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    metadata TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS license_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    license_id TEXT NOT NULL REFERENCES licenses(id) ON DELETE CASCADE,
    action TEXT NOT NULL,
    old_status TEXT,
    new_status TEXT,
    reason TEXT,
    performed_by TEXT NOT NULL,
    performed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_licenses_key ON licenses(license_key);
CREATE INDEX IF NOT EXISTS idx_licenses_email ON licenses(customer_email);
CREATE INDEX IF NOT EXISTS idx_licenses_status ON licenses(status);
CREATE INDEX IF NOT EXISTS idx_licenses_expires ON licenses(expires_at);
CREATE INDEX IF NOT EXISTS idx_activations_license ON license_activations(license_id);
CREATE INDEX IF NOT EXISTS idx_history_license ON license_history(license_id);
";

const LICENSE_COLUMNS: &str = "id, license_key, customer_email, customer_name, product_id, \
    status, features, max_activations, current_activations, instance_id, facts_version, \
    issued_at, expires_at, suspended_at, suspended_reason, last_checked, metadata, \
    created_at, updated_at";

/// Pooled SQLite store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Opens (creating if needed) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )
        });
        Self::from_manager(manager, POOL_MAX_SIZE)
    }

    /// Opens an in-memory store for tests. A single pooled connection:
    /// every in-memory SQLite connection is its own database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        Self::from_manager(manager, 1)
    }

    fn from_manager(manager: SqliteConnectionManager, max_size: u32) -> StorageResult<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_timeout(POOL_ACQUIRE_TIMEOUT)
            .build(manager)?;
        let store = Self { pool };
        store.conn()?.execute_batch(SCHEMA)?;
        Ok(store)
    }

    fn conn(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn get_by_id(&self, id: LicenseId) -> StorageResult<Option<LicenseRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE id = ?1");
        let raw = conn
            .query_row(&sql, params![id.to_string()], read_license_row)
            .optional()?;
        raw.map(into_record).transpose()
    }
}

impl LicenseStore for SqliteStore {
    fn insert_license(
        &self,
        facts: &LicenseFacts,
        key: &LicenseKey,
        signature: &str,
        provenance: &Provenance,
    ) -> StorageResult<LicenseRecord> {
        // Clamp to storage granularity so the returned record equals
        // its own re-read.
        let now = from_millis(Utc::now().timestamp_millis())?;
        let record = LicenseRecord {
            id: LicenseId::new(),
            key: key.clone(),
            email: facts.email.clone(),
            name: facts.name.clone(),
            product_id: facts.product_id.clone(),
            features: facts.features.clone(),
            max_activations: facts.max_activations,
            current_activations: 0,
            instance: facts.uuid,
            facts_version: facts.version.clone(),
            state: LicenseState::Active,
            issued_at: from_millis(facts.generated.timestamp_millis())?,
            expires_at: from_millis(facts.expiry.timestamp_millis())?,
            last_checked: None,
            metadata: RecordMetadata {
                origin: provenance.origin.clone(),
                ip_address: provenance.ip_address.clone(),
                user_agent: provenance.user_agent.clone(),
                signature: signature.to_string(),
            },
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO licenses (
                id, license_key, customer_email, customer_name, product_id, status,
                features, max_activations, current_activations, instance_id, facts_version,
                issued_at, expires_at, suspended_at, suspended_reason, last_checked,
                metadata, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, NULL, NULL, NULL, ?14, ?15, ?16)",
            params![
                record.id.to_string(),
                record.key.as_str(),
                record.email,
                record.name,
                record.product_id,
                record.state.code().as_str(),
                serde_json::to_string(&record.features)?,
                record.max_activations,
                record.current_activations,
                record.instance.to_string(),
                record.facts_version,
                record.issued_at.timestamp_millis(),
                record.expires_at.timestamp_millis(),
                serde_json::to_string(&record.metadata)?,
                record.created_at.timestamp_millis(),
                record.updated_at.timestamp_millis(),
            ],
        )?;

        tracing::debug!(id = %record.id, key = %record.key, "license row inserted");
        Ok(record)
    }

    fn get_by_key(&self, key: &LicenseKey) -> StorageResult<Option<LicenseRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE license_key = ?1");
        let raw = conn
            .query_row(&sql, params![key.as_str()], read_license_row)
            .optional()?;
        raw.map(into_record).transpose()
    }

    fn touch_last_checked(&self, id: LicenseId, now: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE licenses SET last_checked = ?1 WHERE id = ?2",
            params![now.timestamp_millis(), id.to_string()],
        )?;
        Ok(())
    }

    fn update_status(
        &self,
        id: LicenseId,
        from: StatusCode,
        to: &LicenseState,
    ) -> StorageResult<Option<LicenseRecord>> {
        let (suspended_at, suspended_reason) = match to {
            LicenseState::Suspended { at, reason } => {
                (Some(at.timestamp_millis()), Some(reason.clone()))
            }
            _ => (None, None),
        };

        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE licenses
             SET status = ?1, suspended_at = ?2, suspended_reason = ?3, updated_at = ?4
             WHERE id = ?5 AND status = ?6",
            params![
                to.code().as_str(),
                suspended_at,
                suspended_reason,
                Utc::now().timestamp_millis(),
                id.to_string(),
                from.as_str(),
            ],
        )?;
        drop(conn);

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id)
    }

    fn append_history(&self, entry: &NewAuditEntry) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO license_history (
                license_id, action, old_status, new_status, reason, performed_by, performed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.license_id.to_string(),
                entry.action.as_str(),
                entry.old_status.map(|s| s.as_str()),
                entry.new_status.map(|s| s.as_str()),
                entry.reason,
                entry.performed_by,
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn history(&self, id: LicenseId) -> StorageResult<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, license_id, action, old_status, new_status, reason, performed_by, performed_at
             FROM license_history
             WHERE license_id = ?1
             ORDER BY performed_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![id.to_string()], read_history_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_audit_entry).collect()
    }

    fn list_licenses(&self, filter: &ListFilter) -> StorageResult<Vec<LicenseRecord>> {
        let mut sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE 1=1");
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(email) = &filter.email {
            sql.push_str(" AND LOWER(customer_email) LIKE '%' || LOWER(?) || '%'");
            values.push(Value::Text(email.clone()));
        }
        if let Some(name) = &filter.name {
            sql.push_str(" AND LOWER(customer_name) LIKE '%' || LOWER(?) || '%'");
            values.push(Value::Text(name.clone()));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::from(limit)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), read_license_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_record).collect()
    }

    fn aggregate_stats(&self, now: DateTime<Utc>) -> StorageResult<LicenseStats> {
        let now_ms = now.timestamp_millis();
        let recent_cutoff = (now - chrono::Duration::days(crate::model::RECENT_WINDOW_DAYS))
            .timestamp_millis();

        let conn = self.conn()?;
        let stats = conn.query_row(
            "SELECT
                COUNT(*),
                COUNT(CASE WHEN status = 'active' AND expires_at > ?1 THEN 1 END),
                COUNT(CASE WHEN status = 'suspended' THEN 1 END),
                COUNT(CASE WHEN status = 'expired' OR expires_at <= ?1 THEN 1 END),
                COUNT(CASE WHEN status = 'revoked' THEN 1 END),
                COUNT(CASE WHEN created_at >= ?2 THEN 1 END)
             FROM licenses",
            params![now_ms, recent_cutoff],
            |row| {
                Ok(LicenseStats {
                    total: row.get::<_, i64>(0)? as u64,
                    active: row.get::<_, i64>(1)? as u64,
                    suspended: row.get::<_, i64>(2)? as u64,
                    expired: row.get::<_, i64>(3)? as u64,
                    revoked: row.get::<_, i64>(4)? as u64,
                    recent: row.get::<_, i64>(5)? as u64,
                })
            },
        )?;
        Ok(stats)
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> StorageResult<Vec<LicenseId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "UPDATE licenses
             SET status = 'expired', updated_at = ?1
             WHERE status = 'active' AND expires_at < ?1
             RETURNING id",
        )?;
        let ids = stmt
            .query_map(params![now.timestamp_millis()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        ids.into_iter()
            .map(|id| {
                LicenseId::parse(&id)
                    .map_err(|e| StorageError::InvalidData(format!("license id {id}: {e}")))
            })
            .collect()
    }

    fn ping(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

/// Raw column values of one license row, before invariant checks.
struct RawLicense {
    id: String,
    key: String,
    email: String,
    name: String,
    product_id: String,
    status: String,
    features: String,
    max_activations: i64,
    current_activations: i64,
    instance: String,
    facts_version: String,
    issued_at: i64,
    expires_at: i64,
    suspended_at: Option<i64>,
    suspended_reason: Option<String>,
    last_checked: Option<i64>,
    metadata: String,
    created_at: i64,
    updated_at: i64,
}

fn read_license_row(row: &Row<'_>) -> rusqlite::Result<RawLicense> {
    Ok(RawLicense {
        id: row.get(0)?,
        key: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        product_id: row.get(4)?,
        status: row.get(5)?,
        features: row.get(6)?,
        max_activations: row.get(7)?,
        current_activations: row.get(8)?,
        instance: row.get(9)?,
        facts_version: row.get(10)?,
        issued_at: row.get(11)?,
        expires_at: row.get(12)?,
        suspended_at: row.get(13)?,
        suspended_reason: row.get(14)?,
        last_checked: row.get(15)?,
        metadata: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

fn into_record(raw: RawLicense) -> StorageResult<LicenseRecord> {
    let code = StatusCode::parse(&raw.status)
        .ok_or_else(|| StorageError::InvalidData(format!("unknown status '{}'", raw.status)))?;

    // Suspension metadata is set iff the row is suspended.
    let state = match (code, raw.suspended_at, raw.suspended_reason) {
        (StatusCode::Suspended, Some(at), Some(reason)) => LicenseState::Suspended {
            at: from_millis(at)?,
            reason,
        },
        (StatusCode::Suspended, _, _) => {
            return Err(StorageError::InvalidData(format!(
                "suspended license {} is missing suspension metadata",
                raw.id
            )));
        }
        (_, None, None) => match code {
            StatusCode::Active => LicenseState::Active,
            StatusCode::Expired => LicenseState::Expired,
            StatusCode::Revoked => LicenseState::Revoked,
            StatusCode::Suspended => unreachable!("handled above"),
        },
        (_, _, _) => {
            return Err(StorageError::InvalidData(format!(
                "{} license {} carries suspension metadata",
                raw.status, raw.id
            )));
        }
    };

    Ok(LicenseRecord {
        id: LicenseId::parse(&raw.id)
            .map_err(|e| StorageError::InvalidData(format!("license id {}: {e}", raw.id)))?,
        key: LicenseKey::parse(&raw.key)
            .map_err(|e| StorageError::InvalidData(format!("license key {}: {e}", raw.key)))?,
        email: raw.email,
        name: raw.name,
        product_id: raw.product_id,
        features: serde_json::from_str(&raw.features)?,
        max_activations: raw.max_activations as u32,
        current_activations: raw.current_activations as u32,
        instance: InstanceId::parse(&raw.instance)
            .map_err(|e| StorageError::InvalidData(format!("instance id {}: {e}", raw.instance)))?,
        facts_version: raw.facts_version,
        state,
        issued_at: from_millis(raw.issued_at)?,
        expires_at: from_millis(raw.expires_at)?,
        last_checked: raw.last_checked.map(from_millis).transpose()?,
        metadata: serde_json::from_str(&raw.metadata)?,
        created_at: from_millis(raw.created_at)?,
        updated_at: from_millis(raw.updated_at)?,
    })
}

/// Raw column values of one history row.
struct RawHistory {
    id: i64,
    license_id: String,
    action: String,
    old_status: Option<String>,
    new_status: Option<String>,
    reason: Option<String>,
    performed_by: String,
    performed_at: i64,
}

fn read_history_row(row: &Row<'_>) -> rusqlite::Result<RawHistory> {
    Ok(RawHistory {
        id: row.get(0)?,
        license_id: row.get(1)?,
        action: row.get(2)?,
        old_status: row.get(3)?,
        new_status: row.get(4)?,
        reason: row.get(5)?,
        performed_by: row.get(6)?,
        performed_at: row.get(7)?,
    })
}

fn into_audit_entry(raw: RawHistory) -> StorageResult<AuditEntry> {
    let parse_status = |s: Option<String>| -> StorageResult<Option<StatusCode>> {
        s.map(|s| {
            StatusCode::parse(&s)
                .ok_or_else(|| StorageError::InvalidData(format!("unknown status '{s}'")))
        })
        .transpose()
    };

    Ok(AuditEntry {
        id: raw.id,
        license_id: LicenseId::parse(&raw.license_id).map_err(|e| {
            StorageError::InvalidData(format!("license id {}: {e}", raw.license_id))
        })?,
        action: AuditAction::parse(&raw.action)
            .ok_or_else(|| StorageError::InvalidData(format!("unknown action '{}'", raw.action)))?,
        old_status: parse_status(raw.old_status)?,
        new_status: parse_status(raw.new_status)?,
        reason: raw.reason,
        performed_by: raw.performed_by,
        performed_at: from_millis(raw.performed_at)?,
    })
}

fn from_millis(ms: i64) -> StorageResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::InvalidData(format!("timestamp {ms} out of range")))
}
