//! SQLite database for handle bindings
//!
//! Holds the durable mapping from minted local parts to the URIs they
//! resolve to. Sequence ids come from the database, so two concurrent
//! minters can never compose the same local part.

pub mod bindings;
pub mod schema;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::MintError;

/// Handle binding database.
pub struct HandleDb {
    conn: Mutex<Connection>,
}

impl HandleDb {
    /// Open or create the binding database.
    pub fn open(path: &Path) -> Result<Self, MintError> {
        info!(path = %path.display(), "Opening handle binding database");
        let conn = Connection::open(path)?;

        // WAL for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, MintError> {
        debug!("Opening in-memory handle binding database");
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), MintError> {
        self.with_conn(|conn| schema::init_schema(conn))
    }

    /// Run a read-only operation against the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, MintError>
    where
        F: FnOnce(&Connection) -> Result<T, MintError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MintError::Internal(format!("Lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Run a transactional operation with exclusive access.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, MintError>
    where
        F: FnOnce(&mut Connection) -> Result<T, MintError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| MintError::Internal(format!("Lock poisoned: {e}")))?;
        f(&mut conn)
    }
}
