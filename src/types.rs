//! Aggregate types for approval records

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::StoreError;

/// A caller-supplied named identifier, e.g. `("DOI", "10.1234/5678")`.
///
/// Each `(name, value)` pair is globally unique across all aggregates; the
/// store exists to protect that invariant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamedIdentifier {
    pub name: String,
    pub value: String,
}

impl NamedIdentifier {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Names may not contain `#`: it separates name from value inside the
    /// identifier's identity key, and a name carrying it would let two
    /// distinct pairs share one key.
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.name.contains('#') {
            return Err(StoreError::Parse(format!(
                "identifier name {:?} must not contain '#'",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for NamedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.value)
    }
}

/// A persistent-identifier URI of the form `https://<host>/<prefix>/<suffix>`.
///
/// The path must consist of exactly two non-empty segments; globally unique
/// across all aggregates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle {
    host: String,
    prefix: String,
    suffix: String,
}

impl Handle {
    /// Build a handle from already-split parts. All parts must be non-empty.
    pub fn new(
        host: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let handle = Self {
            host: host.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        };
        if handle.host.is_empty() || handle.prefix.is_empty() || handle.suffix.is_empty() {
            return Err(StoreError::Parse(
                "handle host, prefix and suffix must be non-empty".to_string(),
            ));
        }
        Ok(handle)
    }

    /// Parse a handle URI, requiring exactly two non-empty path segments.
    pub fn parse(uri: &Url) -> Result<Self, StoreError> {
        let host = uri
            .host_str()
            .ok_or_else(|| StoreError::Parse(format!("handle URI {uri} has no host")))?;

        let segments: Vec<&str> = uri
            .path_segments()
            .map(|s| s.collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [prefix, suffix] if !prefix.is_empty() && !suffix.is_empty() => {
                Self::new(host, *prefix, *suffix)
            }
            _ => Err(StoreError::Parse(format!(
                "handle URI {uri} must have exactly two non-empty path segments"
            ))),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The `<prefix>/<suffix>` pair as stored in the binding database.
    pub fn local_part(&self) -> String {
        format!("{}/{}", self.prefix, self.suffix)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}/{}/{}", self.host, self.prefix, self.suffix)
    }
}

/// One approval aggregate: the Approval, its Handle, and its named
/// identifiers, treated as a single unit of consistency.
///
/// The source and handle are fixed at creation; the identifier set may later
/// be replaced wholesale through the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    id: Uuid,
    source: Url,
    handle: Handle,
    identifiers: BTreeSet<NamedIdentifier>,
}

impl Approval {
    /// Build a new aggregate with a fresh id. Creation requires at least one
    /// named identifier.
    pub fn new(
        source: Url,
        handle: Handle,
        identifiers: BTreeSet<NamedIdentifier>,
    ) -> Result<Self, StoreError> {
        if identifiers.is_empty() {
            return Err(StoreError::EmptyIdentifiers);
        }
        for identifier in &identifiers {
            identifier.validate()?;
        }
        Ok(Self {
            id: Uuid::new_v4(),
            source,
            handle,
            identifiers,
        })
    }

    /// Reassemble an aggregate from stored parts.
    pub(crate) fn from_parts(
        id: Uuid,
        source: Url,
        handle: Handle,
        identifiers: BTreeSet<NamedIdentifier>,
    ) -> Self {
        Self {
            id,
            source,
            handle,
            identifiers,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn source(&self) -> &Url {
        &self.source
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn identifiers(&self) -> &BTreeSet<NamedIdentifier> {
        &self.identifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn handle_parse_accepts_two_segments() {
        let handle = Handle::parse(&url("https://hdl.handle.net/20.500.12345/42")).unwrap();
        assert_eq!(handle.host(), "hdl.handle.net");
        assert_eq!(handle.prefix(), "20.500.12345");
        assert_eq!(handle.suffix(), "42");
        assert_eq!(
            handle.to_string(),
            "https://hdl.handle.net/20.500.12345/42"
        );
    }

    #[test]
    fn handle_parse_rejects_wrong_segment_counts() {
        assert!(Handle::parse(&url("https://hdl.handle.net/onlyprefix")).is_err());
        assert!(Handle::parse(&url("https://hdl.handle.net/a/b/c")).is_err());
        assert!(Handle::parse(&url("https://hdl.handle.net/a/")).is_err());
        assert!(Handle::parse(&url("https://hdl.handle.net/")).is_err());
    }

    #[test]
    fn approval_rejects_identifier_names_containing_the_key_separator() {
        let handle = Handle::new("hdl.handle.net", "20.500.12345", "1").unwrap();
        // `("a#b", "c")` would share an identity key with `("a", "b#c")`.
        let identifiers = [NamedIdentifier::new("a#b", "c")].into();
        let result = Approval::new(url("https://example.org/a"), handle, identifiers);
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }

    #[test]
    fn approval_requires_at_least_one_identifier() {
        let handle = Handle::new("hdl.handle.net", "20.500.12345", "1").unwrap();
        let result = Approval::new(url("https://example.org/a"), handle, BTreeSet::new());
        assert!(matches!(result, Err(StoreError::EmptyIdentifiers)));
    }
}
