//! Stored record layout for the single-table approval store
//!
//! Three record kinds share one physical tree and are told apart on read by
//! the `kind` discriminator serialized into every record body. Each record's
//! synthetic identity string is both its own primary key and the foreign-key
//! value held by sibling records, so one aggregate resolves by approval id,
//! by handle, or by any one named identifier.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::types::{Handle, NamedIdentifier};

/// Identity key for an approval record. Doubles as the cross-reference key
/// shared by every record of the aggregate.
pub fn approval_key(id: &Uuid) -> String {
    format!("Approval:{id}")
}

/// Identity key for a handle record.
pub fn handle_key(handle: &Handle) -> String {
    format!("Handle:{handle}")
}

/// Identity key for an identifier record.
///
/// `#` separates name from value, so names containing it are rejected at
/// aggregate construction and update; without that guard `("a#b", "c")` and
/// `("a", "b#c")` would share one key.
pub fn identifier_key(name: &str, value: &str) -> String {
    format!("Identifier:{name}#{value}")
}

/// The root record of an aggregate. Owns no other record; siblings point
/// back at it through its cross-reference key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approval_id: Uuid,
    pub source: Url,
}

/// The aggregate's persistent-identifier handle. Exactly one per aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRecord {
    pub handle: Handle,
    pub approval_key: String,
}

/// One named identifier bound to an aggregate. Zero-to-many per aggregate;
/// creation requires at least one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    pub name: String,
    pub value: String,
    pub approval_key: String,
}

impl IdentifierRecord {
    pub fn pair(&self) -> NamedIdentifier {
        NamedIdentifier::new(self.name.clone(), self.value.clone())
    }
}

/// One physical record. The `kind` tag is the persisted discriminator that
/// lets heterogeneous records share a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StoredRecord {
    Approval(ApprovalRecord),
    Handle(HandleRecord),
    Identifier(IdentifierRecord),
}

impl StoredRecord {
    /// The record's own primary key.
    pub fn key(&self) -> String {
        match self {
            StoredRecord::Approval(r) => approval_key(&r.approval_id),
            StoredRecord::Handle(r) => handle_key(&r.handle),
            StoredRecord::Identifier(r) => identifier_key(&r.name, &r.value),
        }
    }

    /// The cross-reference key of the aggregate this record belongs to.
    pub fn cross_key(&self) -> String {
        match self {
            StoredRecord::Approval(r) => approval_key(&r.approval_id),
            StoredRecord::Handle(r) => r.approval_key.clone(),
            StoredRecord::Identifier(r) => r.approval_key.clone(),
        }
    }
}
