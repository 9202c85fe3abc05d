//! Error types for the approval store and handle minter

use std::fmt;

use thiserror::Error;

use crate::types::{Handle, NamedIdentifier};

/// Every uniqueness violation found during a create or update, collected so
/// the caller can fix all of them in one round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictSet {
    /// Handle already bound to another aggregate, if any.
    pub handle: Option<Handle>,
    /// Identifier pairs already bound to other aggregates.
    pub identifiers: Vec<NamedIdentifier>,
}

impl ConflictSet {
    pub fn is_empty(&self) -> bool {
        self.handle.is_none() && self.identifiers.is_empty()
    }
}

impl fmt::Display for ConflictSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(handle) = &self.handle {
            parts.push(format!("handle {handle}"));
        }
        for identifier in &self.identifiers {
            parts.push(format!("identifier {identifier}"));
        }
        if parts.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Record store errors. Conflicts and integrity failures are always reported
/// to the caller, never retried here.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("approval not found")]
    NotFound,

    #[error("already bound elsewhere: {0}")]
    Conflict(ConflictSet),

    #[error("aggregate integrity violated: {0}")]
    Integrity(String),

    #[error("identifier set must not be empty")]
    EmptyIdentifiers,

    #[error("parse error: {0}")]
    Parse(String),

    /// A multi-chunk save failed after at least one chunk committed. The
    /// committed chunks remain in the store; this is distinct from a clean
    /// conflict so callers can detect the partial state.
    #[error("partial write: {committed} of {total} chunks committed before failure: {cause}")]
    PartialWrite {
        committed: usize,
        total: usize,
        #[source]
        cause: Box<StoreError>,
    },

    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Handle minting errors. Every failure carries the underlying cause and is
/// non-retryable at this layer; a blind retry of the check phase could race
/// with a separate allocation.
#[derive(Error, Debug)]
pub enum MintError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("sequence allocation returned no row: {0}")]
    Allocation(#[source] rusqlite::Error),

    #[error("no binding for local part {0}")]
    UnknownLocalPart(String),

    #[error("internal error: {0}")]
    Internal(String),
}
