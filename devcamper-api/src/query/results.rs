//! Advanced results: filter, select, sort, paginate and populate a collection
//!
//! Each list route owns a `const` [`AdvancedResults`] describing its collection,
//! the relation it expands and the fields it never returns. Nothing about it is
//! decided at request time except the parsed [`ListParams`].

use std::collections::HashMap;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{ListParams, PageWindow, Pagination, Projection};
use crate::store::{document_id, Document, DocumentStore, FindQuery, RepositoryResult, ID_FIELD};
use crate::query::Filter;

/// How a populated path relates to the other collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The document stores the related `_id` at `path`
    Reference,
    /// Related documents store this document's `_id` in `foreign_field`
    Virtual {
        /// Field on the related collection pointing back here
        foreign_field: &'static str,
    },
}

/// Relation expansion applied to query results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Populate {
    /// Field the expansion is written to
    pub path: &'static str,
    /// Collection holding the related documents
    pub collection: &'static str,
    /// Direction of the relation
    pub relation: Relation,
    /// Fields of the related documents to keep
    pub select: Option<&'static [&'static str]>,
}

impl Populate {
    /// Replace the id stored at `path` with the referenced document
    pub const fn reference(path: &'static str, collection: &'static str) -> Self {
        Self {
            path,
            collection,
            relation: Relation::Reference,
            select: None,
        }
    }

    /// Fill `path` with every document of `collection` whose `foreign_field` is this `_id`
    pub const fn virtual_field(
        path: &'static str,
        collection: &'static str,
        foreign_field: &'static str,
    ) -> Self {
        Self {
            path,
            collection,
            relation: Relation::Virtual { foreign_field },
            select: None,
        }
    }

    /// Keep only these fields of the related documents
    pub const fn select(mut self, fields: &'static [&'static str]) -> Self {
        self.select = Some(fields);
        self
    }

    fn related_query(&self, field: &str, ids: Vec<Value>) -> FindQuery {
        FindQuery::new(Filter::new().any_of(field, ids)).select(self.select.map(Projection::of))
    }

    /// Expand the relation in place on every document
    pub async fn apply(
        &self,
        store: &dyn DocumentStore,
        docs: &mut [Document],
    ) -> RepositoryResult<()> {
        if docs.is_empty() {
            return Ok(());
        }

        match self.relation {
            Relation::Reference => {
                let mut ids: Vec<Value> = Vec::new();
                for id in docs.iter().filter_map(|d| d.get(self.path).and_then(Value::as_str)) {
                    let id = Value::String(id.to_string());
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                let related: HashMap<String, Document> = store
                    .find(self.collection, self.related_query(ID_FIELD, ids))
                    .await?
                    .into_iter()
                    .filter_map(|doc| document_id(&doc).map(str::to_string).map(|id| (id, doc)))
                    .collect();

                for doc in docs.iter_mut() {
                    let Some(id) = doc.get(self.path).and_then(Value::as_str) else {
                        continue;
                    };
                    let expanded = related
                        .get(id)
                        .cloned()
                        .map_or(Value::Null, Value::Object);
                    doc.insert(self.path.to_string(), expanded);
                }
            }
            Relation::Virtual { foreign_field } => {
                let ids: Vec<Value> = docs
                    .iter()
                    .filter_map(document_id)
                    .map(|id| Value::String(id.to_string()))
                    .collect();
                let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
                for related in store
                    .find(self.collection, self.related_query(foreign_field, ids))
                    .await?
                {
                    if let Some(owner) = related.get(foreign_field).and_then(Value::as_str) {
                        grouped
                            .entry(owner.to_string())
                            .or_default()
                            .push(Value::Object(related));
                    }
                }

                for doc in docs.iter_mut() {
                    let children = document_id(doc)
                        .and_then(|id| grouped.remove(id))
                        .unwrap_or_default();
                    doc.insert(self.path.to_string(), Value::Array(children));
                }
            }
        }
        Ok(())
    }
}

/// Paged response body: `{success, count, pagination, data}`
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult {
    /// Always `true`
    pub success: bool,
    /// Number of documents in `data`
    pub count: usize,
    /// Links to neighbouring pages
    pub pagination: Pagination,
    /// The page of documents
    pub data: Vec<Document>,
}

impl IntoResponse for PagedResult {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// List query configuration for one collection
#[derive(Debug, Clone, Copy)]
pub struct AdvancedResults {
    collection: &'static str,
    populate: Option<Populate>,
    hidden: &'static [&'static str],
}

impl AdvancedResults {
    /// List `collection` with no relation expansion
    pub const fn new(collection: &'static str) -> Self {
        Self {
            collection,
            populate: None,
            hidden: &[],
        }
    }

    /// Expand a relation on every result
    pub const fn populate(mut self, populate: Populate) -> Self {
        self.populate = Some(populate);
        self
    }

    /// Never return these fields, even when selected
    pub const fn hide(mut self, fields: &'static [&'static str]) -> Self {
        self.hidden = fields;
        self
    }

    /// Collection this configuration lists
    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// Run the query for one page and build the response body
    pub async fn run(
        &self,
        store: &dyn DocumentStore,
        params: ListParams,
    ) -> RepositoryResult<PagedResult> {
        let window = PageWindow::new(params.page, params.limit);
        let total = store.count(self.collection, &params.filter).await?;

        let populate = self.populate.filter(|p| {
            params
                .projection
                .as_ref()
                .map_or(true, |projection| projection.includes(p.path))
        });

        let query = FindQuery::new(params.filter)
            .select(params.projection)
            .sort(params.sort)
            .skip(window.start_index())
            .limit(window.limit());
        let mut data = store.find(self.collection, query).await?;

        if let Some(populate) = populate {
            populate.apply(store, &mut data).await?;
        }
        for doc in &mut data {
            for field in self.hidden {
                doc.remove(*field);
            }
        }

        tracing::debug!(
            collection = self.collection,
            total,
            page = window.page(),
            returned = data.len(),
            "advanced results"
        );

        Ok(PagedResult {
            success: true,
            count: data.len(),
            pagination: window.pagination(total),
            data,
        })
    }
}
