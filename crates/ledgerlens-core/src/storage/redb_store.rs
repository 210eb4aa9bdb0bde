//! Redb-backed vector store for on-disk collections.
//!
//! Uses [redb](https://github.com/cberner/redb) - a pure Rust, ACID-compliant,
//! embedded B-tree database. Plans are evaluated locally inside a single read
//! transaction, which gives each query a consistent snapshot.
//!
//! # Tables
//!
//! - `collections`: collection name (string) -> CollectionSchema (JSON)
//! - `{collection}::payloads`: ChunkId (u128) -> Payload (JSON)
//! - `{collection}::dense`: ChunkId (u128) -> `Vec<f32>` (raw bytes, little-endian)
//! - `{collection}::sparse`: ChunkId (u128) -> SparseVector (JSON)
//! - `{collection}::colbert`: ChunkId (u128) -> token matrix (header + little-endian f32)

use super::{prepare_record, StoreError, VectorStore};
use crate::config::CollectionSchema;
use crate::embedding::{RepresentationSet, SparseVector};
use crate::search::{
    execute_plan, Candidate, ChunkId, CollectionSnapshot, IndexRecord, Payload, QueryPlan,
};
use redb::{
    Database, ReadTransaction, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const COLLECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

// Per-collection table suffixes
const PAYLOADS: &str = "payloads";
const DENSE: &str = "dense";
const SPARSE: &str = "sparse";
const TOKENS: &str = "colbert";
const POINT_TABLES: [&str; 4] = [PAYLOADS, DENSE, SPARSE, TOKENS];

fn table_name(collection: &str, suffix: &str) -> String {
    format!("{}::{}", collection, suffix)
}

fn db_err<E: Display>(context: &'static str) -> impl Fn(E) -> StoreError {
    move |e| StoreError::DatabaseError(format!("Failed to {}: {}", context, e))
}

/// Redb-backed vector store for native platforms.
///
/// # Example
///
/// ```ignore
/// use ledgerlens_core::storage::{RedbVectorStore, VectorStore};
///
/// let store = RedbVectorStore::open("./data/ledgerlens.redb")?;
/// store.provision(&CollectionSchema::default(), ProvisionPolicy::Recreate).await?;
/// store.upsert("financial", &records).await?;
/// ```
pub struct RedbVectorStore {
    db: Arc<Database>,
}

impl RedbVectorStore {
    /// Opens or creates a redb database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::IoError(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let db = Database::create(path.as_ref()).map_err(db_err("open database"))?;

        // Create the catalog table if it doesn't exist
        {
            let write_txn = db.begin_write().map_err(db_err("begin write transaction"))?;
            write_txn
                .open_table(COLLECTIONS_TABLE)
                .map_err(db_err("create collections table"))?;
            write_txn.commit().map_err(db_err("commit table creation"))?;
        }

        info!("Opened vector store at {}", path.as_ref().display());
        Ok(Self { db: Arc::new(db) })
    }

    fn read_schema(txn: &ReadTransaction, name: &str) -> Result<CollectionSchema, StoreError> {
        let table = txn
            .open_table(COLLECTIONS_TABLE)
            .map_err(db_err("open collections table"))?;
        let guard = table
            .get(name)
            .map_err(db_err("read collection schema"))?
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        serde_json::from_slice(guard.value()).map_err(|e| {
            StoreError::SerializationError(format!("Failed to deserialize schema: {}", e))
        })
    }

    fn existing_schema(txn: &WriteTransaction, name: &str) -> Result<Option<CollectionSchema>, StoreError> {
        let table = txn
            .open_table(COLLECTIONS_TABLE)
            .map_err(db_err("open collections table"))?;
        let schema = match table.get(name).map_err(db_err("read collection schema"))? {
            Some(guard) => Some(serde_json::from_slice(guard.value()).map_err(|e| {
                StoreError::SerializationError(format!("Failed to deserialize schema: {}", e))
            })?),
            None => None,
        };
        Ok(schema)
    }

    /// Loads every point of a collection within one read transaction.
    fn load_snapshot(&self, name: &str) -> Result<CollectionSnapshot, StoreError> {
        let txn = self.db.begin_read().map_err(db_err("begin read transaction"))?;
        let schema = Self::read_schema(&txn, name)?;

        let payload_name = table_name(name, PAYLOADS);
        let dense_name = table_name(name, DENSE);
        let sparse_name = table_name(name, SPARSE);
        let tokens_name = table_name(name, TOKENS);

        let payloads = txn
            .open_table(TableDefinition::<u128, &[u8]>::new(&payload_name))
            .map_err(db_err("open payloads table"))?;
        let dense = txn
            .open_table(TableDefinition::<u128, &[u8]>::new(&dense_name))
            .map_err(db_err("open dense table"))?;
        let sparse = txn
            .open_table(TableDefinition::<u128, &[u8]>::new(&sparse_name))
            .map_err(db_err("open sparse table"))?;
        let tokens = txn
            .open_table(TableDefinition::<u128, &[u8]>::new(&tokens_name))
            .map_err(db_err("open token table"))?;

        let mut snapshot = CollectionSnapshot::new(schema);
        for entry in payloads.iter().map_err(db_err("iterate payloads"))? {
            let (key, value) = entry.map_err(db_err("read payload"))?;
            let raw_id = key.value();
            let payload: Payload = serde_json::from_slice(value.value()).map_err(|e| {
                StoreError::SerializationError(format!("Failed to deserialize payload: {}", e))
            })?;

            let missing = |space: &str| {
                StoreError::DatabaseError(format!(
                    "Point {} has no '{}' vector",
                    ChunkId::from_u128(raw_id),
                    space
                ))
            };
            let dense_vec = dense
                .get(raw_id)
                .map_err(db_err("read dense vector"))?
                .map(|g| deserialize_embedding(g.value()))
                .ok_or_else(|| missing(DENSE))?;
            let sparse_vec: SparseVector = match sparse.get(raw_id).map_err(db_err("read sparse vector"))? {
                Some(g) => serde_json::from_slice(g.value()).map_err(|e| {
                    StoreError::SerializationError(format!(
                        "Failed to deserialize sparse vector: {}",
                        e
                    ))
                })?,
                None => return Err(missing(SPARSE)),
            };
            let token_vecs = match tokens.get(raw_id).map_err(db_err("read token vectors"))? {
                Some(g) => deserialize_tokens(g.value())?,
                None => return Err(missing(TOKENS)),
            };

            let id = ChunkId::from_u128(raw_id);
            snapshot.points.insert(
                id,
                IndexRecord {
                    id,
                    vectors: RepresentationSet {
                        dense: dense_vec,
                        sparse: sparse_vec,
                        late_interaction: token_vecs,
                    },
                    payload,
                },
            );
        }

        debug!("Loaded {} points from '{}'", snapshot.len(), name);
        Ok(snapshot)
    }
}

/// Serializes an embedding to raw bytes.
///
/// Format: Little-endian f32 values packed sequentially (4 bytes per value).
fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        bytes.extend_from_slice(&val.to_le_bytes());
    }
    bytes
}

/// Deserializes an embedding from raw bytes. See `serialize_embedding()`.
fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Serializes token vectors: `u32` token count, `u32` dimension, then the
/// rows as little-endian f32.
fn serialize_tokens(tokens: &[Vec<f32>]) -> Vec<u8> {
    let dim = tokens.first().map_or(0, Vec::len);
    let mut bytes = Vec::with_capacity(8 + tokens.len() * dim * 4);
    bytes.extend_from_slice(&(tokens.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&(dim as u32).to_le_bytes());
    for token in tokens {
        bytes.extend_from_slice(&serialize_embedding(token));
    }
    bytes
}

fn deserialize_tokens(bytes: &[u8]) -> Result<Vec<Vec<f32>>, StoreError> {
    let header = |offset: usize| -> Result<usize, StoreError> {
        bytes
            .get(offset..offset + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            .ok_or_else(|| {
                StoreError::SerializationError("Token matrix header truncated".to_string())
            })
    };
    let count = header(0)?;
    let dim = header(4)?;
    let body = &bytes[8..];
    if body.len() != count * dim * 4 {
        return Err(StoreError::SerializationError(format!(
            "Token matrix has {} bytes, expected {}x{} floats",
            body.len(),
            count,
            dim
        )));
    }
    if dim == 0 {
        return Ok(vec![Vec::new(); count]);
    }
    Ok(body
        .chunks_exact(dim * 4)
        .map(deserialize_embedding)
        .collect())
}

#[async_trait::async_trait(?Send)]
impl VectorStore for RedbVectorStore {
    // =========================================================================
    // Collection Operations
    // =========================================================================

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin_read().map_err(db_err("begin read transaction"))?;
        match Self::read_schema(&txn, name) {
            Ok(_) => Ok(true),
            Err(StoreError::CollectionNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(db_err("begin write transaction"))?;

        if Self::existing_schema(&write_txn, &schema.name)?.is_some() {
            return Ok(());
        }

        let bytes = serde_json::to_vec(schema).map_err(|e| {
            StoreError::SerializationError(format!("Failed to serialize schema: {}", e))
        })?;
        {
            let mut table = write_txn
                .open_table(COLLECTIONS_TABLE)
                .map_err(db_err("open collections table"))?;
            table
                .insert(schema.name.as_str(), bytes.as_slice())
                .map_err(db_err("insert collection schema"))?;

            for suffix in POINT_TABLES {
                let name = table_name(&schema.name, suffix);
                write_txn
                    .open_table(TableDefinition::<u128, &[u8]>::new(&name))
                    .map_err(db_err("create point table"))?;
            }
        }

        write_txn.commit().map_err(db_err("commit collection creation"))?;
        info!("Created collection '{}'", schema.name);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(db_err("begin write transaction"))?;

        {
            let mut table = write_txn
                .open_table(COLLECTIONS_TABLE)
                .map_err(db_err("open collections table"))?;
            // Remove returns Ok(None) if the collection didn't exist, which is fine
            table.remove(name).map_err(db_err("remove collection schema"))?;
        }
        for suffix in POINT_TABLES {
            let table = table_name(name, suffix);
            write_txn
                .delete_table(TableDefinition::<u128, &[u8]>::new(&table))
                .map_err(db_err("delete point table"))?;
        }

        write_txn.commit().map_err(db_err("commit collection deletion"))?;
        debug!("Deleted collection '{}'", name);
        Ok(())
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    #[instrument(skip_all, fields(collection = collection, records = records.len()))]
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(db_err("begin write transaction"))?;
        let schema = Self::existing_schema(&write_txn, collection)?
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let prepared = records
            .iter()
            .map(|r| prepare_record(&schema, r))
            .collect::<Result<Vec<_>, _>>()?;

        {
            let payload_name = table_name(collection, PAYLOADS);
            let dense_name = table_name(collection, DENSE);
            let sparse_name = table_name(collection, SPARSE);
            let tokens_name = table_name(collection, TOKENS);

            let mut payloads = write_txn
                .open_table(TableDefinition::<u128, &[u8]>::new(&payload_name))
                .map_err(db_err("open payloads table"))?;
            let mut dense = write_txn
                .open_table(TableDefinition::<u128, &[u8]>::new(&dense_name))
                .map_err(db_err("open dense table"))?;
            let mut sparse = write_txn
                .open_table(TableDefinition::<u128, &[u8]>::new(&sparse_name))
                .map_err(db_err("open sparse table"))?;
            let mut tokens = write_txn
                .open_table(TableDefinition::<u128, &[u8]>::new(&tokens_name))
                .map_err(db_err("open token table"))?;

            for record in &prepared {
                let key = record.id.as_u128();
                let payload = serde_json::to_vec(&record.payload).map_err(|e| {
                    StoreError::SerializationError(format!("Failed to serialize payload: {}", e))
                })?;
                let sparse_bytes = serde_json::to_vec(&record.vectors.sparse).map_err(|e| {
                    StoreError::SerializationError(format!(
                        "Failed to serialize sparse vector: {}",
                        e
                    ))
                })?;

                payloads
                    .insert(key, payload.as_slice())
                    .map_err(db_err("insert payload"))?;
                dense
                    .insert(key, serialize_embedding(&record.vectors.dense).as_slice())
                    .map_err(db_err("insert dense vector"))?;
                sparse
                    .insert(key, sparse_bytes.as_slice())
                    .map_err(db_err("insert sparse vector"))?;
                tokens
                    .insert(key, serialize_tokens(&record.vectors.late_interaction).as_slice())
                    .map_err(db_err("insert token vectors"))?;
            }
        }

        write_txn.commit().map_err(db_err("commit upsert"))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        plan: &QueryPlan,
    ) -> Result<Vec<Candidate>, StoreError> {
        let snapshot = self.load_snapshot(collection)?;
        execute_plan(&snapshot, plan)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let txn = self.db.begin_read().map_err(db_err("begin read transaction"))?;
        Self::read_schema(&txn, collection)?;

        let name = table_name(collection, PAYLOADS);
        let table = txn
            .open_table(TableDefinition::<u128, &[u8]>::new(&name))
            .map_err(db_err("open payloads table"))?;
        let count = table.len().map_err(db_err("get point count"))?;

        Ok(count as usize)
    }
}
