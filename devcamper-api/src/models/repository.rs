//! Typed access to one collection

use std::marker::PhantomData;

use super::{from_document, to_document, Model};
use crate::error::{Error, Result};
use crate::query::Filter;
use crate::store::{DocumentStore, FindQuery, RepositoryError};

/// Model-typed wrapper over a [`DocumentStore`]
pub struct Repository<'a, M> {
    store: &'a dyn DocumentStore,
    _model: PhantomData<fn() -> M>,
}

impl<'a, M: Model> Repository<'a, M> {
    /// Borrow the store for `M`'s collection
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            _model: PhantomData,
        }
    }

    /// Fetch by id
    pub async fn find_by_id(&self, id: &str) -> Result<Option<M>> {
        self.store
            .find_by_id(M::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Fetch by id, or `NotFound` naming the model and id
    pub async fn get(&self, id: &str) -> Result<M> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(M::NAME, id).into())
    }

    /// First match for a filter
    pub async fn find_one(&self, filter: Filter) -> Result<Option<M>> {
        self.store
            .find_one(M::COLLECTION, filter)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Every match for a query
    pub async fn find(&self, query: FindQuery) -> Result<Vec<M>> {
        self.store
            .find(M::COLLECTION, query)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Whether anything matches
    pub async fn exists(&self, filter: &Filter) -> Result<bool> {
        Ok(self.store.count(M::COLLECTION, filter).await? > 0)
    }

    /// Validate and insert
    pub async fn insert(&self, model: &M) -> Result<M> {
        model.validate()?;
        let saved = self
            .store
            .insert(M::COLLECTION, to_document(model)?)
            .await?;
        from_document(saved)
    }

    /// Validate and replace the stored copy
    pub async fn save(&self, model: &M) -> Result<M> {
        model.validate()?;
        let saved = self
            .store
            .replace(M::COLLECTION, model.id(), to_document(model)?)
            .await?
            .ok_or_else(|| Error::from(RepositoryError::not_found(M::NAME, model.id())))?;
        from_document(saved)
    }

    /// Delete by id; `NotFound` if it was already gone
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(M::COLLECTION, id).await? {
            Ok(())
        } else {
            Err(RepositoryError::not_found(M::NAME, id).into())
        }
    }
}
