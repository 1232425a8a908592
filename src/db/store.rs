//! Owned storage handle.
//!
//! The service opens exactly one `Store` at startup and drops it at
//! shutdown. Each request borrows the connection only for its storage
//! steps through `with_conn`; nothing holds the lock across the
//! extraction call.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database file and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = open_database(path)?;
        tracing::info!(path = %path.display(), "Storage opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T, E>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        let guard = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&guard)
    }
}
