//! # Daftar Store
//!
//! SQLite-backed implementations of the `DebtStore` and `NotificationStore`
//! traits. One database file, one shared connection behind a mutex — the
//! mutex plus single-statement UPDATEs give every read-modify-write the
//! per-record atomicity the scheduler relies on.
//!
//! The reminder sub-state is embedded in the `debts` table as flat columns,
//! so a throttle claim is a single-column conditional UPDATE: atomic, and
//! incapable of clobbering a concurrent payment write.

pub mod debts;
pub mod notifications;

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use daftar_core::error::{DaftarError, Result};

pub use debts::SqliteDebtStore;
pub use notifications::SqliteNotificationStore;

/// Shared handle to the Daftar database. Cheap to clone; both stores hand
/// out views over the same connection.
#[derive(Clone)]
pub struct SqliteDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDb {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
            .map_err(store_err)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS debts (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                counterparty_name TEXT NOT NULL,
                counterparty_phone TEXT,
                direction TEXT NOT NULL,            -- 'borrowed' | 'lent'
                amount INTEGER NOT NULL,
                remaining_amount INTEGER NOT NULL,
                due_date TEXT NOT NULL,
                original_due_date TEXT NOT NULL,
                status TEXT NOT NULL,               -- derived, recomputed on every write
                before_enabled INTEGER NOT NULL DEFAULT 1,
                before_days INTEGER NOT NULL DEFAULT 3,
                before_last_sent TEXT,
                on_due_enabled INTEGER NOT NULL DEFAULT 1,
                on_due_last_sent TEXT,
                overdue_enabled INTEGER NOT NULL DEFAULT 1,
                overdue_interval INTEGER NOT NULL DEFAULT 3,
                overdue_last_sent TEXT,
                extensions TEXT NOT NULL DEFAULT '[]',  -- JSON audit trail
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_debts_owner ON debts(owner);
            CREATE INDEX IF NOT EXISTS idx_debts_outstanding ON debts(remaining_amount);

            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                kind TEXT NOT NULL,                 -- 'debt_reminder'
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                data TEXT NOT NULL DEFAULT '{}',    -- JSON deep-link payload
                priority TEXT NOT NULL,             -- 'medium' | 'high'
                status TEXT NOT NULL,               -- scheduled | sent | failed | read
                channel TEXT NOT NULL,              -- advisory tag
                scheduled_for TEXT NOT NULL,
                sent_at TEXT,
                read_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_owner ON notifications(owner, created_at);
            CREATE INDEX IF NOT EXISTS idx_notifications_status ON notifications(status, scheduled_for);
            ",
        )
        .map_err(store_err)?;
        Ok(())
    }

    /// Debt store view.
    pub fn debts(&self) -> SqliteDebtStore {
        SqliteDebtStore::new(self.conn.clone())
    }

    /// Notification store view.
    pub fn notifications(&self) -> SqliteNotificationStore {
        SqliteNotificationStore::new(self.conn.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DaftarError::Store(format!("connection lock poisoned: {e}")))
    }
}

pub(crate) fn store_err(e: rusqlite::Error) -> DaftarError {
    DaftarError::Store(e.to_string())
}

/// Fixed-width RFC 3339 (microseconds, Z suffix) so lexicographic string
/// comparison in SQL matches chronological order.
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| DaftarError::Store(format!("bad timestamp '{s}': {e}")))
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|v| parse_ts(&v)).transpose()
}
