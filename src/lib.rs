//! approval-store - persistence and identifier-minting core for approvals
//!
//! An approval couples an internal id, a persistent handle, and one or more
//! caller-supplied named identifiers. This crate is the layer that keeps
//! handles and identifiers globally unique:
//!
//! - **Record store** (sled): one physical tree holds Approval, Handle and
//!   Identifier records, told apart by a `kind` discriminator and
//!   cross-indexed so an aggregate resolves by its own id, by handle, or by
//!   any one named identifier. Create-once guards inside multi-record
//!   transactions enforce uniqueness.
//! - **Handle minter** (SQLite): allocates sequence-numbered local parts and
//!   binds them to target URIs inside one explicit transaction, reusing an
//!   existing binding when the same URI is minted again.
//!
//! Transport handlers, request validation and response shaping live
//! elsewhere; this crate exposes the storage operations and their typed
//! errors only, and never retries a failure internally.
//!
//! ## Storage layout
//!
//! ```text
//! <data_dir>/
//! ├── records.sled/     # record store (trees: records, by_approval)
//! └── handles.db        # handle binding database
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod minter;
pub mod records;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use db::HandleDb;
pub use error::{ConflictSet, MintError, StoreError};
pub use minter::HandleMinter;
pub use store::{ApprovalStore, BATCH_READ_LIMIT, MAX_TRANSACTION_RECORDS};
pub use types::{Approval, Handle, NamedIdentifier};
