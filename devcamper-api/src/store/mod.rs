//! Document store abstraction
//!
//! Handlers talk to collections of JSON documents through [`DocumentStore`].
//! [`MemoryStore`] is the in-process implementation used by the binary and tests.

mod error;
mod matcher;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult};
pub use matcher::{compare_for_sort, lookup, matches};
pub use memory::{MemoryStore, UniqueIndex};

use crate::query::{Filter, Projection, SortSpec};

/// A stored JSON document
pub type Document = Map<String, Value>;

/// Primary key field
pub const ID_FIELD: &str = "_id";

/// Creation timestamp field
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Generate a new document id (UUIDv7, simple hex form)
pub fn new_document_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Format a timestamp the way documents store it: RFC 3339, millisecond precision, `Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The `_id` of a document, if it has a string id
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Query against one collection: filter, projection, sort, skip and limit
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    /// Conjunction of predicates
    pub filter: Filter,
    /// Fields to return; `None` returns whole documents
    pub projection: Option<Projection>,
    /// Sort keys; `None` keeps insertion order
    pub sort: Option<SortSpec>,
    /// Documents to skip after sorting
    pub skip: u64,
    /// Maximum documents to return
    pub limit: Option<u64>,
}

impl FindQuery {
    /// Start a query from a filter
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Restrict returned fields
    #[must_use]
    pub fn select(mut self, projection: Option<Projection>) -> Self {
        self.projection = projection;
        self
    }

    /// Order results
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Skip the first `n` sorted results
    #[must_use]
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = n;
        self
    }

    /// Return at most `n` results
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Collection query capability shared by every handler
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a query and return matching documents
    async fn find(&self, collection: &str, query: FindQuery) -> RepositoryResult<Vec<Document>>;

    /// Count documents matching a filter
    async fn count(&self, collection: &str, filter: &Filter) -> RepositoryResult<u64>;

    /// Fetch a single document by `_id`
    async fn find_by_id(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>>;

    /// Insert a document, assigning `_id` and `createdAt` when absent
    async fn insert(&self, collection: &str, doc: Document) -> RepositoryResult<Document>;

    /// Replace the document with the given `_id`. Returns `None` if it does not exist.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> RepositoryResult<Option<Document>>;

    /// Delete by `_id`. Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> RepositoryResult<bool>;

    /// Delete every document matching a filter. Returns the number removed.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> RepositoryResult<u64>;

    /// First document matching a filter in insertion order
    async fn find_one(&self, collection: &str, filter: Filter) -> RepositoryResult<Option<Document>> {
        Ok(self
            .find(collection, FindQuery::new(filter).limit(1))
            .await?
            .into_iter()
            .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_has_fixed_millis() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(at), "2024-03-01T10:00:00.000Z");
    }

    #[test]
    fn test_document_ids_are_unique_hex() {
        let a = new_document_id();
        let b = new_document_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
