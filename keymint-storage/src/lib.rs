//! SQLite storage layer for keymint license records.
//!
//! Persists license records, their append-only history, and the
//! reserved activation-tracking table behind a bounded connection
//! pool.
//!
//! # Architecture
//!
//! - `LicenseStore` is the narrow contract the service layer consumes;
//!   it is injected, so lifecycle and codec logic stay testable
//!   without a live store.
//! - `SqliteStore` is the pooled SQLite implementation. Status
//!   transitions are compare-and-set writes: the update carries the
//!   expected current status, and a guard miss reports the lost race
//!   instead of overwriting it.
//! - The schema bootstraps on open; timestamps are epoch milliseconds.

mod error;
mod model;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult};
pub use model::{
    AuditAction, AuditEntry, LicenseRecord, LicenseStats, ListFilter, NewAuditEntry, Provenance,
    RecordMetadata, RECENT_WINDOW_DAYS,
};
pub use sqlite::SqliteStore;
pub use store::LicenseStore;
