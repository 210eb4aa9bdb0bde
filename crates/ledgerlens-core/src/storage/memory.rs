//! In-memory vector store.

use super::{prepare_record, StoreError, VectorStore};
use crate::config::CollectionSchema;
use crate::search::{execute_plan, Candidate, CollectionSnapshot, IndexRecord, QueryPlan};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, instrument};

/// In-memory store of copy-on-write collection snapshots.
///
/// A query clones the `Arc` of the current snapshot and evaluates against it
/// without holding the lock; an upsert that races with it swaps in a new
/// snapshot and leaves the reader's view intact. Nothing is persisted.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Arc<CollectionSnapshot>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot of a collection.
    pub fn snapshot(&self, name: &str) -> Result<Arc<CollectionSnapshot>, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }
}

#[async_trait::async_trait(?Send)]
impl VectorStore for InMemoryVectorStore {
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        Ok(collections.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        collections
            .entry(schema.name.clone())
            .or_insert_with(|| Arc::new(CollectionSnapshot::new(schema.clone())));
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        if collections.remove(name).is_some() {
            debug!("Deleted collection '{}'", name);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(collection = collection, records = records.len()))]
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))?;
        let snapshot = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        // Validate the whole batch before touching the snapshot
        let prepared = records
            .iter()
            .map(|r| prepare_record(&snapshot.schema, r))
            .collect::<Result<Vec<_>, _>>()?;

        let points = &mut Arc::make_mut(snapshot).points;
        for record in prepared {
            points.insert(record.id, record);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        plan: &QueryPlan,
    ) -> Result<Vec<Candidate>, StoreError> {
        let snapshot = self.snapshot(collection)?;
        execute_plan(&snapshot, plan)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.snapshot(collection)?.len())
    }
}
