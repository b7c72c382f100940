//! SQLite store for the couple's questions, recorded answers and shared
//! progress.
//!
//! All access goes through [`Database`], which owns the single connection.
//! Every write runs in one transaction, so a rejected operation leaves no
//! trace.

pub mod error;
pub mod migrations;
pub mod models;
pub mod progress;
pub mod queries;
pub mod state;
pub mod submit;

pub use error::{Result, StoreError};

use chrono::NaiveDate;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the store at `path` and bring it up to date.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self::open_unmigrated(path)?;
        db.initialize(today())?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Open the file at `path` as it is, without creating or seeding
    /// anything. A store in an older layout can still be `reset` this way.
    pub fn open_unmigrated(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::from_connection(conn)
    }

    /// A fresh, initialized store that lives only as long as the handle.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self::from_connection(Connection::open_in_memory()?)?;
        db.initialize(today())?;
        Ok(db)
    }

    /// Wrap a connection without creating or seeding anything.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create missing tables and seed the two users and the couple state.
    /// Running it again changes nothing.
    pub fn initialize(&self, today: NaiveDate) -> Result<()> {
        self.with_tx(|tx| {
            migrations::run(tx)?;
            migrations::seed(tx, today)
        })
    }

    /// Drop everything and start over. Refuses when questions or answers
    /// exist unless `force` is set.
    pub fn reset(&self, force: bool, today: NaiveDate) -> Result<()> {
        self.with_tx(|tx| migrations::reset(tx, force, today))
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside an immediate transaction. Any error rolls back.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

/// The local calendar day; the daily slots and streaks follow it.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
