//! Canonical in-memory export document.
//!
//! An [`ExportBundle`] is built fresh for every export call, optionally rewritten,
//! serialized once and dropped.

use std::fmt;

use serde_json::{Map, Value};

/// Processing semantics requested from a receiving server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleType {
    Collection,
    Transaction,
    Batch,
}

impl BundleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Transaction => "transaction",
            Self::Batch => "batch",
        }
    }

    /// Transaction and batch bundles carry a request per entry
    pub fn is_transactional(&self) -> bool {
        !matches!(self, Self::Collection)
    }
}

impl fmt::Display for BundleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Post,
    Put,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// Submission intent of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub method: HttpVerb,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Organization,
    Practitioner,
}

impl RecordKind {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Organization => "Organization",
            Self::Practitioner => "Practitioner",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

/// URI-identified integer annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub url: String,
    pub value: u64,
}

impl Extension {
    pub fn integer(url: impl Into<String>, value: u64) -> Self {
        Self {
            url: url.into(),
            value,
        }
    }
}

/// One organization or practitioner document.
///
/// `body` holds the variant-shaped fields; `resourceType` and `id` are emitted from
/// `kind` and `id` by the serializer.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: RecordKind,
    pub id: String,
    pub body: Map<String, Value>,
    pub extensions: Vec<Extension>,
}

impl Record {
    pub fn extension(&self, url: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.url == url)
    }

    /// `<Kind>/<id>`
    pub fn relative_address(&self) -> String {
        format!("{}/{}", self.kind.resource_type(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BundleEntry {
    pub full_url: String,
    pub resource: Record,
    pub request: Option<EntryRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    bundle_type: BundleType,
    entries: Vec<BundleEntry>,
}

impl ExportBundle {
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            bundle_type,
            entries: Vec::new(),
        }
    }

    pub fn bundle_type(&self) -> BundleType {
        self.bundle_type
    }

    /// Append an entry and return its index
    pub fn push(&mut self, entry: BundleEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [BundleEntry] {
        &mut self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&BundleEntry> {
        self.entries.get(index)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.entries.iter().map(|entry| &entry.resource)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record {
            kind: RecordKind::Practitioner,
            id: id.to_string(),
            body: Map::new(),
            extensions: vec![Extension::integer("urn:test", 4)],
        }
    }

    #[test]
    fn test_push_returns_index() {
        let mut bundle = ExportBundle::new(BundleType::Batch);
        for (expected, id) in ["a", "b", "c"].into_iter().enumerate() {
            let index = bundle.push(BundleEntry {
                full_url: format!("urn:uuid:{id}"),
                resource: record(id),
                request: None,
            });
            assert_eq!(index, expected);
        }

        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.entry(1).map(|e| e.resource.id.as_str()), Some("b"));
        assert_eq!(
            bundle.records().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_record_helpers() {
        let record = record("c1");
        assert_eq!(record.relative_address(), "Practitioner/c1");
        assert_eq!(record.extension("urn:test").map(|e| e.value), Some(4));
        assert!(record.extension("urn:other").is_none());
    }

    #[test]
    fn test_bundle_type_names() {
        assert_eq!(BundleType::Batch.to_string(), "batch");
        assert!(BundleType::Transaction.is_transactional());
        assert!(!BundleType::Collection.is_transactional());
    }
}
