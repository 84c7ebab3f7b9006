// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `Store` handle and its `with_tx` transactional-lambda shape: a
// uniform "one transaction per operation" wrapper over the full entity
// set, so handlers that read-then-mutate never tear state across two
// transactions.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info, instrument};

use pressd_core::error::PressdError;

pub fn db_err(e: rusqlite::Error) -> PressdError {
    PressdError::Store(e.to_string())
}

/// Transactional, SQLite-backed store for every entity in 
///
/// `rusqlite::Connection` is not `Sync`, and SQLite itself serializes
/// writers, so the connection is held behind a `Mutex` the way a single
/// writer-at-a-time store should be: concurrent callers queue for the
/// mutex rather than racing the database's own locking.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the store database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PressdError> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        Self::init(conn)
    }

    /// Open an in-memory database, for tests and `#[cfg(test)]` fixtures.
    pub fn open_in_memory() -> Result<Self, PressdError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, PressdError> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        // Concurrent writers serialize on the SQLite lock instead of
        // immediately erroring with SQLITE_BUSY.
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(db_err)?;
        // Cascading deletes (printer -> jobs -> documents/subscriptions,
        // class -> class_members, subscription -> notifications) rely on
        // this being on for the lifetime of the connection.
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(db_err)?;
        conn.execute_batch(crate::schema::CREATE_TABLES_SQL)
            .map_err(db_err)?;
        info!("pressd store schema ready");
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a single SQLite transaction, committing on `Ok` and
    /// rolling back on `Err` or panic-unwind. Every state-changing dispatcher
    /// operation (and every read that must observe a consistent snapshot
    /// across several tables) goes through this single entry point so a
    /// state-change and the notifications it emits land in the same
    /// transaction.
    #[instrument(skip(self, f))]
    pub fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction) -> Result<T, PressdError>,
    ) -> Result<T, PressdError> {
        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction().map_err(db_err)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(db_err)?;
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "transaction rolled back");
                // `Transaction::drop` rolls back automatically if not
                // committed; an explicit rollback just surfaces errors.
                let _ = tx.rollback();
                Err(e)
            }
        }
    }

    /// Read-only variant of [`with_tx`]. Semantically identical (SQLite has
    /// no separate read-transaction mode) but documents intent at call
    /// sites "read-only operations take shared
    /// transactions".
    pub fn with_tx_read<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction) -> Result<T, PressdError>,
    ) -> Result<T, PressdError> {
        self.with_tx(f)
    }
}
