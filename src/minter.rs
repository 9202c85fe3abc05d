//! Handle minting
//!
//! Given a target URI, returns a persistent-identifier handle that resolves
//! to it: an existing binding for the exact URI is reused, otherwise a fresh
//! sequence id is allocated and bound. Check, Allocate and Bind run inside
//! one explicit transaction, so a concurrent minter cannot observe or create
//! a duplicate local part for the same URI between the check and the bind.
//! No failure is retried here; a blind retry of the check phase could race
//! with a separate allocation.

use tracing::{debug, info};
use url::Url;

use crate::db::{bindings, HandleDb};
use crate::error::MintError;
use crate::types::Handle;

/// Mints persistent-identifier handles backed by [`HandleDb`].
pub struct HandleMinter {
    db: HandleDb,
    host: String,
    prefix: String,
}

impl HandleMinter {
    /// The host and naming-authority prefix are opaque configuration values,
    /// fixed at construction.
    pub fn new(db: HandleDb, host: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            db,
            host: host.into(),
            prefix: prefix.into(),
        }
    }

    /// Return a handle that resolves to the target URI, reusing an existing
    /// binding for that exact URI or allocating and binding a new one.
    pub fn mint(&self, target: &Url) -> Result<Handle, MintError> {
        self.db.with_conn_mut(|conn| {
            // Dropped without commit on any error path below = rollback.
            let tx = conn.transaction()?;

            // Check: reuse an existing binding for this exact URI.
            if let Some(local_part) = bindings::find_by_target(&tx, target.as_str())? {
                // Read-only so far; nothing to roll back.
                tx.commit()?;
                debug!(%target, %local_part, "Reusing existing handle binding");
                return self.handle_for(&local_part);
            }

            // Allocate: fresh sequence id from the database.
            let id = bindings::allocate(&tx, target.as_str())?;

            // Bind: compose the local part and complete the same row.
            let local_part = format!("{}/{}", self.prefix, id);
            bindings::bind(&tx, id, &local_part)?;
            tx.commit()?;

            info!(%target, %local_part, "Minted new handle binding");
            self.handle_for(&local_part)
        })
    }

    /// Point an already-minted `(prefix, suffix)` local part at a new target
    /// URI. Fails if the local part is unknown; a zero-row update is never
    /// reported as success.
    pub fn rebind(&self, prefix: &str, suffix: &str, target: &Url) -> Result<(), MintError> {
        let local_part = format!("{prefix}/{suffix}");
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let affected = bindings::repoint(&tx, &local_part, target.as_str())?;
            if affected == 0 {
                return Err(MintError::UnknownLocalPart(local_part.clone()));
            }
            tx.commit()?;
            info!(%local_part, %target, "Rebound handle to new target");
            Ok(())
        })
    }

    fn handle_for(&self, local_part: &str) -> Result<Handle, MintError> {
        let (prefix, suffix) = local_part
            .split_once('/')
            .ok_or_else(|| MintError::Internal(format!("malformed local part {local_part}")))?;
        Handle::new(&self.host, prefix, suffix)
            .map_err(|e| MintError::Internal(e.to_string()))
    }
}
