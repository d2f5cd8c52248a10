//! In-process JSON document store.
//!
//! Behaves like a collection-per-entity REST store kept in memory: documents
//! are held as JSON values in insertion order and identifiers are UUIDs.
//! Failures can be scheduled per `(collection, operation)`; each scheduled
//! failure is consumed by the next matching call. An optional latency makes
//! every call suspend on the tokio timer before it is answered.

use super::{
    encode_with_id, stored_id, CollectionGateway, GatewayError, GatewayOperation, GatewayResult,
    ListFilter,
};
use crate::model::{Collection, Document, EntityId};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    collections: RefCell<BTreeMap<Collection, Vec<Value>>>,
    pending_failures: RefCell<BTreeSet<(Collection, GatewayOperation)>>,
    write_calls: RefCell<BTreeMap<Collection, usize>>,
    latency: Cell<Duration>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores documents directly, assigning identifiers where missing.
    ///
    /// Seeding does not count as a write call.
    pub fn seed<D: Document>(&self, documents: impl IntoIterator<Item = D>) -> GatewayResult<Vec<D>> {
        documents
            .into_iter()
            .map(|document| self.insert(&document))
            .collect()
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency.set(latency);
    }

    /// Makes the next `operation` on `collection` fail.
    pub fn fail_next(&self, collection: Collection, operation: GatewayOperation) {
        self.pending_failures
            .borrow_mut()
            .insert((collection, operation));
    }

    /// Number of create/replace/remove calls received for `collection`.
    pub fn write_calls(&self, collection: Collection) -> usize {
        self.write_calls
            .borrow()
            .get(&collection)
            .copied()
            .unwrap_or(0)
    }

    /// Number of documents currently stored in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .borrow()
            .get(&collection)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    async fn check(&self, collection: Collection, operation: GatewayOperation) -> GatewayResult<()> {
        let latency = self.latency.get();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if matches!(
            operation,
            GatewayOperation::Create | GatewayOperation::Replace | GatewayOperation::Remove
        ) {
            *self.write_calls.borrow_mut().entry(collection).or_default() += 1;
        }
        if self
            .pending_failures
            .borrow_mut()
            .remove(&(collection, operation))
        {
            return Err(GatewayError::Injected {
                collection,
                operation,
            });
        }
        Ok(())
    }

    fn insert<D: Document>(&self, document: &D) -> GatewayResult<D> {
        let id = document.id().cloned().unwrap_or_else(EntityId::generate);
        let value = encode_with_id(document, &id)?;
        let stored = serde_json::from_value(value.clone())?;
        self.collections
            .borrow_mut()
            .entry(D::COLLECTION)
            .or_default()
            .push(value);
        Ok(stored)
    }
}

impl<D: Document> CollectionGateway<D> for InMemoryGateway {
    async fn list(&self, filter: &ListFilter) -> GatewayResult<Vec<D>> {
        self.check(D::COLLECTION, GatewayOperation::List).await?;
        let collections = self.collections.borrow();
        let Some(values) = collections.get(&D::COLLECTION) else {
            return Ok(Vec::new());
        };

        let mut documents = Vec::with_capacity(values.len());
        for value in values {
            let document: D = serde_json::from_value(value.clone())?;
            if filter.accepts(&document) {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    async fn create(&self, document: &D) -> GatewayResult<D> {
        self.check(D::COLLECTION, GatewayOperation::Create).await?;
        self.insert(document)
    }

    async fn replace(&self, id: &EntityId, document: &D) -> GatewayResult<D> {
        self.check(D::COLLECTION, GatewayOperation::Replace).await?;
        let value = encode_with_id(document, id)?;
        let stored: D = serde_json::from_value(value.clone())?;

        let mut collections = self.collections.borrow_mut();
        let slot = collections
            .get_mut(&D::COLLECTION)
            .and_then(|values| {
                values
                    .iter_mut()
                    .find(|existing| stored_id(existing).as_ref() == Some(id))
            })
            .ok_or_else(|| GatewayError::MissingRecord {
                collection: D::COLLECTION,
                id: id.clone(),
            })?;
        *slot = value;
        Ok(stored)
    }

    async fn remove(&self, id: &EntityId) -> GatewayResult<()> {
        self.check(D::COLLECTION, GatewayOperation::Remove).await?;
        let mut collections = self.collections.borrow_mut();
        let values = collections.entry(D::COLLECTION).or_default();
        let before = values.len();
        values.retain(|existing| stored_id(existing).as_ref() != Some(id));
        if values.len() == before {
            return Err(GatewayError::MissingRecord {
                collection: D::COLLECTION,
                id: id.clone(),
            });
        }
        Ok(())
    }
}
