//! Vector storage engines.
//!
//! The [`VectorStore`] trait is the storage-engine contract used by the
//! indexer and the query planner: collection provisioning with declared
//! metrics, batch upsert of [`IndexRecord`]s, and evaluation of a nested
//! [`QueryPlan`].
//!
//! # Implementations
//!
//! - [`InMemoryVectorStore`] - copy-on-write snapshots, for tests and one-shot runs
//! - [`RedbVectorStore`] - embedded on-disk collections (`redb-store` feature)
//! - [`QdrantStore`] - remote Qdrant over REST (`qdrant` feature)
//!
//! Local engines evaluate plans with [`execute_plan`](crate::search::execute_plan);
//! the remote engine translates the plan into its own nested query.

mod memory;

#[cfg(feature = "qdrant")]
mod qdrant;
#[cfg(feature = "redb-store")]
mod redb_store;

pub use memory::InMemoryVectorStore;

#[cfg(feature = "qdrant")]
pub use qdrant::{plan_to_request, QdrantStore};
#[cfg(feature = "redb-store")]
pub use redb_store::RedbVectorStore;

use crate::config::{CollectionSchema, ProvisionPolicy};
use crate::error::QueryStage;
use crate::search::{Candidate, IndexRecord, QueryPlan};
use thiserror::Error;

/// Errors that can occur during vector store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Collection has not been provisioned
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Storage engine could not be reached (connection refused, timeout)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// I/O error (filesystem)
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Database error (redb, remote engine rejected the request)
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A vector does not match the dimension declared for its space
    #[error("Dimension mismatch in space '{space}': expected {expected}, got {actual}")]
    DimensionMismatch {
        space: String,
        expected: usize,
        actual: usize,
    },

    /// Plan evaluation failed at a specific stage
    #[error("Plan execution failed during {stage}: {message}")]
    Execution { stage: QueryStage, message: String },
}

/// Storage engine holding named collections of multi-representation points.
///
/// Reads are snapshot-consistent for the duration of one [`query`](Self::query)
/// call. Writes to one collection are expected to be serialized by the caller.
#[async_trait::async_trait(?Send)]
pub trait VectorStore {
    /// Returns whether a collection exists.
    #[must_use = "Store failures should be handled"]
    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Creates an empty collection with the given spaces.
    ///
    /// Idempotent: an existing collection is left untouched.
    #[must_use = "Store failures should be handled"]
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError>;

    /// Deletes a collection and all of its points.
    ///
    /// Returns `Ok(())` even if the collection didn't exist.
    #[must_use = "Store failures should be handled"]
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Inserts or replaces a batch of points.
    ///
    /// Fails without writing anything when a record does not fit the
    /// collection's spaces.
    #[must_use = "Store failures should be handled"]
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<(), StoreError>;

    /// Evaluates a query plan, returning best-first candidates.
    #[must_use = "Store failures should be handled"]
    async fn query(&self, collection: &str, plan: &QueryPlan)
        -> Result<Vec<Candidate>, StoreError>;

    /// Returns the number of points in a collection.
    #[must_use = "Store failures should be handled"]
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// Ensures a collection exists according to `policy`.
    ///
    /// [`ProvisionPolicy::Recreate`] deletes any existing collection first and
    /// discards its points; [`ProvisionPolicy::ReuseExisting`] keeps them.
    /// Both are safe to repeat.
    async fn provision(
        &self,
        schema: &CollectionSchema,
        policy: ProvisionPolicy,
    ) -> Result<(), StoreError> {
        if policy == ProvisionPolicy::Recreate {
            self.delete_collection(&schema.name).await?;
        }
        self.create_collection(schema).await
    }
}

/// Checks a record against the schema and normalizes its cosine vectors.
///
/// Local engines store unit vectors so that dot product equals cosine, the
/// same contract a remote engine applies for cosine spaces.
pub(crate) fn prepare_record(
    schema: &CollectionSchema,
    record: &IndexRecord,
) -> Result<IndexRecord, StoreError> {
    use crate::embedding::types::l2_normalize;

    let dense = &record.vectors.dense;
    if dense.len() != schema.dense.dim {
        return Err(StoreError::DimensionMismatch {
            space: schema.dense.name.clone(),
            expected: schema.dense.dim,
            actual: dense.len(),
        });
    }
    if let Some(bad) = record
        .vectors
        .late_interaction
        .iter()
        .find(|t| t.len() != schema.late_interaction.dim)
    {
        return Err(StoreError::DimensionMismatch {
            space: schema.late_interaction.name.clone(),
            expected: schema.late_interaction.dim,
            actual: bad.len(),
        });
    }

    let mut prepared = record.clone();
    l2_normalize(&mut prepared.vectors.dense);
    for token in prepared.vectors.late_interaction.iter_mut() {
        l2_normalize(token);
    }
    Ok(prepared)
}
