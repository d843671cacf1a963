//! In-process document store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    compare_for_sort, document_id, format_timestamp, lookup, matches, new_document_id, Document,
    DocumentStore, FindQuery, RepositoryError, RepositoryOperation, RepositoryResult,
    CREATED_AT_FIELD, ID_FIELD,
};
use crate::query::{Filter, Projection};

/// Unique constraint over one or more fields of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueIndex {
    collection: String,
    fields: Vec<String>,
}

impl UniqueIndex {
    /// Create an index on `fields` of `collection`
    pub fn new(collection: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            collection: collection.into(),
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    /// Values the index keys on, or `None` if any field is missing or null
    fn key_of(&self, doc: &Document) -> Option<Vec<Value>> {
        self.fields
            .iter()
            .map(|field| lookup(doc, field).filter(|v| !v.is_null()).cloned())
            .collect()
    }
}

/// Collections of documents held behind a single `RwLock`
///
/// Documents keep insertion order, so unsorted queries are stable.
///
/// ```rust
/// use devcamper_api::store::MemoryStore;
///
/// let store = MemoryStore::new().with_unique_index("users", &["email"]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    indexes: Vec<UniqueIndex>,
}

impl MemoryStore {
    /// Create an empty store without indexes
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unique index
    #[must_use]
    pub fn with_unique_index(mut self, collection: &str, fields: &[&str]) -> Self {
        self.indexes.push(UniqueIndex::new(collection, fields));
        self
    }

    fn check_unique(
        &self,
        operation: RepositoryOperation,
        collection: &str,
        existing: &[Document],
        candidate: &Document,
        skip_id: Option<&str>,
    ) -> RepositoryResult<()> {
        for index in self.indexes.iter().filter(|i| i.collection == collection) {
            let Some(key) = index.key_of(candidate) else {
                continue;
            };
            let clash = existing
                .iter()
                .filter(|doc| skip_id.is_none() || document_id(doc) != skip_id)
                .any(|doc| index.key_of(doc).as_ref() == Some(&key));
            if clash {
                return Err(RepositoryError::already_exists(
                    operation,
                    collection,
                    index.fields.join(", "),
                ));
            }
        }
        Ok(())
    }
}

fn project(doc: &Document, projection: &Projection) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in projection.fields() {
        if let Some(value) = lookup(doc, field) {
            insert_path(&mut out, field, value.clone());
        }
    }
    out
}

fn insert_path(target: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            if let Value::Object(inner) = entry {
                insert_path(inner, rest, value);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, query: FindQuery) -> RepositoryResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut selected: Vec<&Document> = docs
            .iter()
            .filter(|doc| matches(doc, &query.filter))
            .collect();
        if let Some(sort) = &query.sort {
            selected.sort_by(|a, b| compare_for_sort(a, b, sort));
        }

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = query
            .limit
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX);

        Ok(selected
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|doc| match &query.projection {
                Some(projection) => project(doc, projection),
                None => doc.clone(),
            })
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> RepositoryResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or(0, |docs| {
            docs.iter().filter(|doc| matches(doc, filter)).count() as u64
        }))
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> RepositoryResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| document_id(doc) == Some(id)))
            .cloned())
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> RepositoryResult<Document> {
        if document_id(&doc).is_none() {
            doc.insert(ID_FIELD.to_string(), Value::String(new_document_id()));
        }
        if !doc.contains_key(CREATED_AT_FIELD) {
            doc.insert(
                CREATED_AT_FIELD.to_string(),
                Value::String(format_timestamp(Utc::now())),
            );
        }

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.iter().any(|existing| document_id(existing) == document_id(&doc)) {
            return Err(RepositoryError::already_exists(
                RepositoryOperation::Insert,
                collection,
                ID_FIELD,
            ));
        }
        self.check_unique(RepositoryOperation::Insert, collection, docs, &doc, None)?;

        tracing::debug!(collection, id = ?document_id(&doc), "document inserted");
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        mut doc: Document,
    ) -> RepositoryResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(position) = docs.iter().position(|d| document_id(d) == Some(id)) else {
            return Ok(None);
        };

        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        self.check_unique(RepositoryOperation::Replace, collection, docs, &doc, Some(id))?;

        docs[position] = doc.clone();
        Ok(Some(doc))
    }

    async fn delete(&self, collection: &str, id: &str) -> RepositoryResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| document_id(doc) != Some(id));
        Ok(docs.len() < before)
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> RepositoryResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches(doc, filter));
        Ok((before - docs.len()) as u64)
    }
}
