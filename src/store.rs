//! Record store for approval aggregates
//!
//! One sled tree (`records`) holds the heterogeneous record bodies keyed by
//! their identity strings; a second tree (`by_approval`) is the secondary
//! index from an aggregate's cross-reference key to every record key that
//! belongs to it. Uniqueness is enforced by create-once guards inside
//! multi-tree transactions, never by background repair.

use std::collections::BTreeSet;
use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ConflictSet, StoreError};
use crate::records::{
    approval_key, handle_key, identifier_key, ApprovalRecord, HandleRecord, IdentifierRecord,
    StoredRecord,
};
use crate::types::{Approval, Handle, NamedIdentifier};

/// Upper bound on records written in one transaction. A `save` whose record
/// count exceeds this is split into sequential chunks, each independently
/// atomic — the write as a whole is NOT one atomic unit above this limit.
pub const MAX_TRANSACTION_RECORDS: usize = 25;

/// Upper bound on keys probed per batch in [`ApprovalStore::find_existing_identifiers`].
pub const BATCH_READ_LIMIT: usize = 80;

/// Separator between the cross-reference key and the record key in the
/// secondary index.
const INDEX_SEPARATOR: u8 = 0;

/// Durable, uniquely-keyed storage for approval aggregates, with lookups by
/// approval id, by handle, and by named identifier.
pub struct ApprovalStore {
    db: Db,
    records: Tree,
    by_approval: Tree,
}

impl ApprovalStore {
    /// Open or create the record store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        let records = db.open_tree("records")?;
        let by_approval = db.open_tree("by_approval")?;
        info!(path = %path.as_ref().display(), "Opened approval record store");
        Ok(Self {
            db,
            records,
            by_approval,
        })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Persist an aggregate as one Approval, one Handle and N Identifier
    /// records, each write guarded by "this identity does not exist yet".
    ///
    /// Collisions found up front are all reported together in the returned
    /// [`ConflictSet`]; the in-transaction guards remain authoritative
    /// against concurrent creates. Aggregates whose record count exceeds
    /// [`MAX_TRANSACTION_RECORDS`] are written in sequential chunks, each
    /// independently atomic; a failure after the first committed chunk
    /// surfaces as [`StoreError::PartialWrite`].
    pub fn save(&self, approval: &Approval) -> Result<(), StoreError> {
        let candidates: Vec<NamedIdentifier> =
            approval.identifiers().iter().cloned().collect();
        let mut conflicts = ConflictSet::default();
        for existing in self.find_existing_identifiers(&candidates)? {
            conflicts.identifiers.push(existing.pair());
        }
        if self
            .records
            .contains_key(handle_key(approval.handle()).as_bytes())?
        {
            conflicts.handle = Some(approval.handle().clone());
        }
        if !conflicts.is_empty() {
            return Err(StoreError::Conflict(conflicts));
        }

        let records = build_records(approval);
        self.write_chunks(&records)?;

        debug!(approval = %approval.id(), records = records.len(), "Saved aggregate");
        Ok(())
    }

    /// Write records in sequential chunks of [`MAX_TRANSACTION_RECORDS`].
    /// A failure after the first committed chunk leaves the committed chunks
    /// intact and is reported as [`StoreError::PartialWrite`].
    fn write_chunks(&self, records: &[StoredRecord]) -> Result<(), StoreError> {
        let total = records.len().div_ceil(MAX_TRANSACTION_RECORDS);
        for (chunk_no, chunk) in records.chunks(MAX_TRANSACTION_RECORDS).enumerate() {
            if let Err(err) = self.write_chunk(chunk) {
                if chunk_no > 0 {
                    return Err(StoreError::PartialWrite {
                        committed: chunk_no,
                        total,
                        cause: Box::new(err),
                    });
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Resolve an aggregate by its approval id.
    pub fn find_by_approval_id(&self, id: &Uuid) -> Result<Approval, StoreError> {
        self.load_aggregate(&approval_key(id))
    }

    /// Resolve an aggregate by its handle.
    pub fn find_by_handle(&self, handle: &Handle) -> Result<Approval, StoreError> {
        let key = handle_key(handle);
        let Some(body) = self.records.get(key.as_bytes())? else {
            return Err(StoreError::NotFound);
        };
        let record: StoredRecord = serde_json::from_slice(&body)?;
        let StoredRecord::Handle(handle_record) = record else {
            return Err(StoreError::Integrity(format!(
                "record {key} is not a handle record"
            )));
        };
        self.load_aggregate(&handle_record.approval_key)
    }

    /// Resolve an aggregate by any one of its named identifiers.
    pub fn find_by_named_identifier(
        &self,
        name: &str,
        value: &str,
    ) -> Result<Approval, StoreError> {
        let key = identifier_key(name, value);
        let Some(body) = self.records.get(key.as_bytes())? else {
            return Err(StoreError::NotFound);
        };
        let record: StoredRecord = serde_json::from_slice(&body)?;
        let StoredRecord::Identifier(identifier_record) = record else {
            return Err(StoreError::Integrity(format!(
                "record {key} is not an identifier record"
            )));
        };
        self.load_aggregate(&identifier_record.approval_key)
    }

    /// Return the identifier records that already exist for any of the given
    /// candidates. Empty input short-circuits; lookups run in chunks of
    /// [`BATCH_READ_LIMIT`] and the merged result is deduplicated regardless
    /// of chunk boundaries.
    pub fn find_existing_identifiers(
        &self,
        candidates: &[NamedIdentifier],
    ) -> Result<Vec<IdentifierRecord>, StoreError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut probed = BTreeSet::new();
        let mut found = Vec::new();
        for chunk in candidates.chunks(BATCH_READ_LIMIT) {
            for candidate in chunk {
                let key = identifier_key(&candidate.name, &candidate.value);
                if !probed.insert(key.clone()) {
                    continue;
                }
                let Some(body) = self.records.get(key.as_bytes())? else {
                    continue;
                };
                let record: StoredRecord = serde_json::from_slice(&body)?;
                let StoredRecord::Identifier(identifier_record) = record else {
                    return Err(StoreError::Integrity(format!(
                        "record {key} is not an identifier record"
                    )));
                };
                found.push(identifier_record);
            }
        }
        debug!(
            candidates = candidates.len(),
            existing = found.len(),
            "Probed candidate identifiers"
        );
        Ok(found)
    }

    /// Replace an approval's identifier set wholesale.
    ///
    /// Identifiers already owned by a different approval are conflicts, all
    /// reported together; re-submitting an identifier this approval already
    /// owns is not. The approval and handle records stay untouched.
    pub fn update_identifiers(
        &self,
        id: &Uuid,
        identifiers: &BTreeSet<NamedIdentifier>,
    ) -> Result<(), StoreError> {
        if identifiers.is_empty() {
            return Err(StoreError::EmptyIdentifiers);
        }
        for identifier in identifiers {
            identifier.validate()?;
        }

        let cross_key = approval_key(id);
        let current = self.load_aggregate(&cross_key)?;

        let candidates: Vec<NamedIdentifier> = identifiers.iter().cloned().collect();
        let mut conflicts = ConflictSet::default();
        for existing in self.find_existing_identifiers(&candidates)? {
            if existing.approval_key != cross_key {
                conflicts.identifiers.push(existing.pair());
            }
        }
        if !conflicts.is_empty() {
            return Err(StoreError::Conflict(conflicts));
        }

        let removals: Vec<String> = current
            .identifiers()
            .difference(identifiers)
            .map(|i| identifier_key(&i.name, &i.value))
            .collect();
        let additions = identifiers
            .difference(current.identifiers())
            .map(|i| {
                let record = StoredRecord::Identifier(IdentifierRecord {
                    name: i.name.clone(),
                    value: i.value.clone(),
                    approval_key: cross_key.clone(),
                });
                Ok((record.key(), serde_json::to_vec(&record)?, i.clone()))
            })
            .collect::<Result<Vec<(String, Vec<u8>, NamedIdentifier)>, StoreError>>()?;

        if removals.is_empty() && additions.is_empty() {
            debug!(approval = %id, "Identifier set unchanged");
            return Ok(());
        }

        let result = (&self.records, &self.by_approval).transaction(|(records, index)| {
            for key in &removals {
                records.remove(key.as_bytes())?;
                index.remove(index_key(&cross_key, key))?;
            }
            for (position, (key, body, _)) in additions.iter().enumerate() {
                if records.get(key.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(position));
                }
                records.insert(key.as_bytes(), body.clone())?;
                index.insert(index_key(&cross_key, key), key.as_bytes())?;
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(
                    approval = %id,
                    removed = removals.len(),
                    added = additions.len(),
                    "Replaced identifier set"
                );
                Ok(())
            }
            Err(TransactionError::Abort(position)) => {
                let mut set = ConflictSet::default();
                set.identifiers.push(additions[position].2.clone());
                Err(StoreError::Conflict(set))
            }
            Err(TransactionError::Storage(e)) => Err(StoreError::Database(e)),
        }
    }

    /// Write one chunk of records in a single multi-tree transaction, each
    /// record guarded by "key absent".
    fn write_chunk(&self, chunk: &[StoredRecord]) -> Result<(), StoreError> {
        let entries = chunk
            .iter()
            .map(|record| {
                Ok((
                    record.key(),
                    record.cross_key(),
                    serde_json::to_vec(record)?,
                ))
            })
            .collect::<Result<Vec<(String, String, Vec<u8>)>, StoreError>>()?;

        let result = (&self.records, &self.by_approval).transaction(|(records, index)| {
            for (position, (key, cross_key, body)) in entries.iter().enumerate() {
                if records.get(key.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(position));
                }
                records.insert(key.as_bytes(), body.clone())?;
                index.insert(index_key(cross_key, key), key.as_bytes())?;
            }
            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(position)) => {
                let mut set = ConflictSet::default();
                match &chunk[position] {
                    StoredRecord::Handle(r) => set.handle = Some(r.handle.clone()),
                    StoredRecord::Identifier(r) => set.identifiers.push(r.pair()),
                    StoredRecord::Approval(r) => {
                        return Err(StoreError::Integrity(format!(
                            "approval record {} already exists",
                            approval_key(&r.approval_id)
                        )));
                    }
                }
                Err(StoreError::Conflict(set))
            }
            Err(TransactionError::Storage(e)) => Err(StoreError::Database(e)),
        }
    }

    /// Resolve every record sharing a cross-reference key and reassemble the
    /// aggregate. An empty record set is NotFound; a non-empty set missing
    /// its Approval or Handle sibling is a data-integrity failure.
    fn load_aggregate(&self, cross_key: &str) -> Result<Approval, StoreError> {
        let mut records = Vec::new();
        for item in self.by_approval.scan_prefix(index_prefix(cross_key)) {
            let (_, record_key) = item?;
            let Some(body) = self.records.get(&record_key)? else {
                return Err(StoreError::Integrity(format!(
                    "index entry points at missing record {}",
                    String::from_utf8_lossy(&record_key)
                )));
            };
            records.push(serde_json::from_slice::<StoredRecord>(&body)?);
        }
        if records.is_empty() {
            return Err(StoreError::NotFound);
        }
        reassemble(records)
    }
}

/// Flatten an aggregate into its stored records.
fn build_records(approval: &Approval) -> Vec<StoredRecord> {
    let cross_key = approval_key(approval.id());
    let mut records = Vec::with_capacity(2 + approval.identifiers().len());
    records.push(StoredRecord::Approval(ApprovalRecord {
        approval_id: *approval.id(),
        source: approval.source().clone(),
    }));
    records.push(StoredRecord::Handle(HandleRecord {
        handle: approval.handle().clone(),
        approval_key: cross_key.clone(),
    }));
    for identifier in approval.identifiers() {
        records.push(StoredRecord::Identifier(IdentifierRecord {
            name: identifier.name.clone(),
            value: identifier.value.clone(),
            approval_key: cross_key.clone(),
        }));
    }
    records
}

/// Partition a flat record set by kind and rebuild the aggregate. Exactly
/// one Approval and one Handle record must be present.
fn reassemble(records: Vec<StoredRecord>) -> Result<Approval, StoreError> {
    let mut approval: Option<ApprovalRecord> = None;
    let mut handle: Option<HandleRecord> = None;
    let mut identifiers = BTreeSet::new();

    for record in records {
        match record {
            StoredRecord::Approval(r) => {
                if approval.replace(r).is_some() {
                    return Err(StoreError::Integrity(
                        "more than one approval record in aggregate".to_string(),
                    ));
                }
            }
            StoredRecord::Handle(r) => {
                if handle.replace(r).is_some() {
                    return Err(StoreError::Integrity(
                        "more than one handle record in aggregate".to_string(),
                    ));
                }
            }
            StoredRecord::Identifier(r) => {
                identifiers.insert(r.pair());
            }
        }
    }

    let approval = approval.ok_or_else(|| {
        StoreError::Integrity("approval record missing from aggregate".to_string())
    })?;
    let handle = handle.ok_or_else(|| {
        StoreError::Integrity("handle record missing from aggregate".to_string())
    })?;

    Ok(Approval::from_parts(
        approval.approval_id,
        approval.source,
        handle.handle,
        identifiers,
    ))
}

fn index_key(cross_key: &str, record_key: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(cross_key.len() + record_key.len() + 1);
    key.extend_from_slice(cross_key.as_bytes());
    key.push(INDEX_SEPARATOR);
    key.extend_from_slice(record_key.as_bytes());
    key
}

fn index_prefix(cross_key: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(cross_key.len() + 1);
    prefix.extend_from_slice(cross_key.as_bytes());
    prefix.push(INDEX_SEPARATOR);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    fn open_store() -> (ApprovalStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ApprovalStore::open(dir.path().join("records.sled")).unwrap();
        (store, dir)
    }

    fn approval(source: &str, suffix: &str, pairs: &[(&str, &str)]) -> Approval {
        let handle = Handle::new("hdl.handle.net", "20.500.12345", suffix).unwrap();
        let identifiers = pairs
            .iter()
            .map(|(n, v)| NamedIdentifier::new(*n, *v))
            .collect();
        Approval::new(Url::parse(source).unwrap(), handle, identifiers).unwrap()
    }

    #[test]
    fn round_trip_by_all_three_paths() {
        let (store, _dir) = open_store();
        let a = approval(
            "https://example.org/a",
            "1",
            &[("DOI", "10.1/x"), ("ISBN", "978-3-16")],
        );
        store.save(&a).unwrap();

        assert_eq!(store.find_by_approval_id(a.id()).unwrap(), a);
        assert_eq!(store.find_by_handle(a.handle()).unwrap(), a);
        assert_eq!(store.find_by_named_identifier("DOI", "10.1/x").unwrap(), a);
        assert_eq!(
            store.find_by_named_identifier("ISBN", "978-3-16").unwrap(),
            a
        );
    }

    #[test]
    fn missing_aggregate_is_not_found() {
        let (store, _dir) = open_store();
        assert!(matches!(
            store.find_by_approval_id(&Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.find_by_named_identifier("DOI", "10.1/none"),
            Err(StoreError::NotFound)
        ));
        let handle = Handle::new("hdl.handle.net", "20.500.12345", "404").unwrap();
        assert!(matches!(
            store.find_by_handle(&handle),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn duplicate_identifiers_conflict_with_every_pair_reported() {
        let (store, _dir) = open_store();
        let a = approval(
            "https://example.org/a",
            "1",
            &[("DOI", "10.1/x"), ("ISBN", "978-3-16")],
        );
        store.save(&a).unwrap();

        let b = approval(
            "https://example.org/b",
            "2",
            &[("DOI", "10.1/x"), ("ISBN", "978-3-16"), ("URN", "urn:z")],
        );
        let set = match store.save(&b).unwrap_err() {
            StoreError::Conflict(set) => set,
            other => panic!("expected conflict, got {other}"),
        };
        assert!(set.handle.is_none());
        assert_eq!(set.identifiers.len(), 2);
        assert!(set.identifiers.contains(&NamedIdentifier::new("DOI", "10.1/x")));
        assert!(set
            .identifiers
            .contains(&NamedIdentifier::new("ISBN", "978-3-16")));
    }

    #[test]
    fn duplicate_handle_conflicts() {
        let (store, _dir) = open_store();
        let a = approval("https://example.org/a", "1", &[("DOI", "10.1/x")]);
        store.save(&a).unwrap();

        let b = approval("https://example.org/b", "1", &[("DOI", "10.1/y")]);
        let set = match store.save(&b).unwrap_err() {
            StoreError::Conflict(set) => set,
            other => panic!("expected conflict, got {other}"),
        };
        assert_eq!(set.handle.as_ref(), Some(b.handle()));
        assert!(set.identifiers.is_empty());
    }

    #[test]
    fn failed_save_leaves_no_partial_aggregate() {
        let (store, _dir) = open_store();
        let a = approval("https://example.org/a", "1", &[("DOI", "10.1/x")]);
        store.save(&a).unwrap();

        let b = approval(
            "https://example.org/b",
            "2",
            &[("DOI", "10.1/x"), ("URN", "urn:z")],
        );
        assert!(store.save(&b).is_err());

        assert!(matches!(
            store.find_by_approval_id(b.id()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.find_by_handle(b.handle()),
            Err(StoreError::NotFound)
        ));
        // B's non-colliding identifier must not have been written either.
        assert!(matches!(
            store.find_by_named_identifier("URN", "urn:z"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn large_aggregate_is_chunked_and_fully_readable() {
        let (store, _dir) = open_store();
        let pairs: Vec<(String, String)> = (0..110)
            .map(|i| ("LOCAL".to_string(), format!("value-{i}")))
            .collect();
        let pair_refs: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        let a = approval("https://example.org/big", "9", &pair_refs);
        // 112 records split across five transactions.
        store.save(&a).unwrap();

        let loaded = store.find_by_approval_id(a.id()).unwrap();
        assert_eq!(loaded.identifiers().len(), 110);
        assert_eq!(loaded, a);
    }

    #[test]
    fn mid_chunk_failure_reports_partial_write_with_committed_chunks_intact() {
        let (store, _dir) = open_store();
        // Occupy the identifier key that sorts last among the 110 below, so
        // the collision lands in the final chunk.
        let planted = approval("https://example.org/other", "8", &[("LOCAL", "value-99")]);
        store.save(&planted).unwrap();

        let pairs: Vec<(String, String)> = (0..110)
            .map(|i| ("LOCAL".to_string(), format!("value-{i}")))
            .collect();
        let pair_refs: Vec<(&str, &str)> = pairs
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        let big = approval("https://example.org/big", "9", &pair_refs);

        // Drive the chunked write directly, as a racing creator that slipped
        // past the save-path precheck would.
        let records = build_records(&big);
        let (committed, total, cause) = match store.write_chunks(&records).unwrap_err() {
            StoreError::PartialWrite {
                committed,
                total,
                cause,
            } => (committed, total, cause),
            other => panic!("expected partial write, got {other}"),
        };
        assert_eq!(total, 5);
        assert_eq!(committed, 4);
        let set = match *cause {
            StoreError::Conflict(set) => set,
            other => panic!("expected conflict cause, got {other}"),
        };
        assert_eq!(set.identifiers, vec![NamedIdentifier::new("LOCAL", "value-99")]);

        // Chunks committed before the failure stay readable; the overall
        // result is still an error the caller can distinguish.
        let partial = store.find_by_approval_id(big.id()).unwrap();
        assert!(partial.identifiers().len() < 110);
        assert!(partial.identifiers().contains(&NamedIdentifier::new("LOCAL", "value-0")));
    }

    #[test]
    fn update_rejects_identifier_names_containing_the_key_separator() {
        let (store, _dir) = open_store();
        let a = approval("https://example.org/a", "1", &[("DOI", "10.1/x")]);
        store.save(&a).unwrap();

        let replacement: BTreeSet<NamedIdentifier> =
            [NamedIdentifier::new("a#b", "c")].into();
        assert!(matches!(
            store.update_identifiers(a.id(), &replacement),
            Err(StoreError::Parse(_))
        ));
    }

    #[test]
    fn find_existing_identifiers_short_circuits_on_empty_input() {
        let (store, _dir) = open_store();
        assert!(store.find_existing_identifiers(&[]).unwrap().is_empty());
    }

    #[test]
    fn find_existing_identifiers_chunks_and_deduplicates() {
        let (store, _dir) = open_store();
        let existing: Vec<(String, String)> = (0..30)
            .map(|i| ("LOCAL".to_string(), format!("known-{i}")))
            .collect();
        let pair_refs: Vec<(&str, &str)> = existing
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        let a = approval("https://example.org/a", "1", &pair_refs);
        store.save(&a).unwrap();

        // 110 candidates (beyond the 80-item batch limit): the 30 known
        // pairs twice over, plus 50 unknown ones.
        let mut candidates = Vec::new();
        for _ in 0..2 {
            for i in 0..30 {
                candidates.push(NamedIdentifier::new("LOCAL", format!("known-{i}")));
            }
        }
        for i in 0..50 {
            candidates.push(NamedIdentifier::new("LOCAL", format!("unknown-{i}")));
        }
        assert_eq!(candidates.len(), 110);

        let found = store.find_existing_identifiers(&candidates).unwrap();
        assert_eq!(found.len(), 30);
        let values: BTreeSet<String> = found.iter().map(|r| r.value.clone()).collect();
        assert_eq!(values.len(), 30);
        assert!(values.contains("known-0"));
        assert!(values.contains("known-29"));
    }

    #[test]
    fn update_allows_self_references() {
        let (store, _dir) = open_store();
        let a = approval(
            "https://example.org/a",
            "1",
            &[("DOI", "10.1/x"), ("ISBN", "978-3-16")],
        );
        store.save(&a).unwrap();

        // Re-submit one owned identifier and add a new one.
        let replacement: BTreeSet<NamedIdentifier> = [
            NamedIdentifier::new("DOI", "10.1/x"),
            NamedIdentifier::new("URN", "urn:z"),
        ]
        .into();
        store.update_identifiers(a.id(), &replacement).unwrap();

        let loaded = store.find_by_approval_id(a.id()).unwrap();
        assert_eq!(loaded.identifiers(), &replacement);
        // The removed identifier no longer resolves.
        assert!(matches!(
            store.find_by_named_identifier("ISBN", "978-3-16"),
            Err(StoreError::NotFound)
        ));
        assert_eq!(store.find_by_named_identifier("URN", "urn:z").unwrap().id(), a.id());
    }

    #[test]
    fn update_rejects_identifiers_owned_elsewhere() {
        let (store, _dir) = open_store();
        let a = approval("https://example.org/a", "1", &[("DOI", "10.1/x")]);
        let b = approval("https://example.org/b", "2", &[("DOI", "10.1/y")]);
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        let replacement: BTreeSet<NamedIdentifier> = [
            NamedIdentifier::new("DOI", "10.1/x"),
            NamedIdentifier::new("DOI", "10.1/y"),
        ]
        .into();
        let set = match store.update_identifiers(a.id(), &replacement).unwrap_err() {
            StoreError::Conflict(set) => set,
            other => panic!("expected conflict, got {other}"),
        };
        assert_eq!(set.identifiers, vec![NamedIdentifier::new("DOI", "10.1/y")]);

        // Nothing changed.
        let loaded = store.find_by_approval_id(a.id()).unwrap();
        assert_eq!(loaded.identifiers(), a.identifiers());
    }

    #[test]
    fn update_of_missing_approval_is_not_found() {
        let (store, _dir) = open_store();
        let replacement: BTreeSet<NamedIdentifier> =
            [NamedIdentifier::new("DOI", "10.1/x")].into();
        assert!(matches!(
            store.update_identifiers(&Uuid::new_v4(), &replacement),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn update_rejects_empty_replacement_set() {
        let (store, _dir) = open_store();
        let a = approval("https://example.org/a", "1", &[("DOI", "10.1/x")]);
        store.save(&a).unwrap();
        assert!(matches!(
            store.update_identifiers(a.id(), &BTreeSet::new()),
            Err(StoreError::EmptyIdentifiers)
        ));
    }

    #[test]
    fn missing_sibling_record_is_an_integrity_error() {
        let (store, _dir) = open_store();
        let a = approval("https://example.org/a", "1", &[("DOI", "10.1/x")]);
        store.save(&a).unwrap();

        // Corrupt the aggregate by dropping the handle record directly.
        let key = handle_key(a.handle());
        store.records.remove(key.as_bytes()).unwrap();
        store
            .by_approval
            .remove(index_key(&approval_key(a.id()), &key))
            .unwrap();

        let err = store.find_by_approval_id(a.id()).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)), "got {err}");
    }
}
