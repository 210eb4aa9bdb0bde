//! Chunk indexer: text chunks in, multi-representation records out.

use super::progress::{IndexingProgress, ProgressTimer};
use crate::chunking::TextChunk;
use crate::config::{CollectionSchema, ProvisionPolicy, UPSERT_BATCH_SIZE};
use crate::embedding::EmbeddingAdapter;
use crate::error::{EncodingError, IndexingError};
use crate::search::{ChunkId, IndexRecord, Payload};
use crate::storage::VectorStore;
use std::ops::Range;
use tracing::{debug, info, instrument, warn};

/// A chunk that was rejected because one of its encodings failed.
#[derive(Debug, Clone)]
pub struct ChunkFailure {
    /// Position of the chunk in its document
    pub index: usize,
    /// Byte span of the chunk in the source text
    pub span: Range<usize>,
    /// Filing section of the chunk, when the source had headings
    pub section: Option<String>,
    /// The encoding error that rejected it
    pub error: EncodingError,
}

/// Outcome of an indexing run.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    /// Records written to the store
    pub written: usize,
    /// Chunks rejected during encoding, in document order
    pub failures: Vec<ChunkFailure>,
}

impl IndexReport {
    /// Returns true if every chunk was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total chunks seen, written or rejected.
    pub fn attempted(&self) -> usize {
        self.written + self.failures.len()
    }
}

/// Encodes chunks three ways and writes them to a collection.
///
/// Every chunk gets a fresh random id. A chunk whose dense, sparse, or
/// late-interaction encoding fails is skipped as a whole and reported in
/// [`IndexReport::failures`]; the run carries on with the rest. Store
/// failures abort the run.
///
/// # Example
///
/// ```ignore
/// let indexer = ChunkIndexer::new(&adapter, &store, CollectionSchema::default());
/// indexer.provision(ProvisionPolicy::Recreate).await?;
/// let report = indexer.index(&chunks, "AAPL-10-K").await?;
/// println!("{} written, {} rejected", report.written, report.failures.len());
/// ```
pub struct ChunkIndexer<'a, S: VectorStore + ?Sized> {
    adapter: &'a EmbeddingAdapter,
    store: &'a S,
    schema: CollectionSchema,
    batch_size: usize,
}

impl<'a, S: VectorStore + ?Sized> ChunkIndexer<'a, S> {
    pub fn new(adapter: &'a EmbeddingAdapter, store: &'a S, schema: CollectionSchema) -> Self {
        Self {
            adapter,
            store,
            schema,
            batch_size: UPSERT_BATCH_SIZE,
        }
    }

    /// Sets the number of records per upsert call (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Provisions the target collection.
    ///
    /// `Recreate` discards existing points; `ReuseExisting` keeps them.
    pub async fn provision(&self, policy: ProvisionPolicy) -> Result<(), IndexingError> {
        info!(
            "Provisioning collection '{}' ({:?})",
            self.schema.name, policy
        );
        self.store
            .provision(&self.schema, policy)
            .await
            .map_err(|source| IndexingError::Provision {
                collection: self.schema.name.clone(),
                source,
            })
    }

    /// Indexes chunks from one source document.
    pub async fn index(
        &self,
        chunks: &[TextChunk],
        source_id: &str,
    ) -> Result<IndexReport, IndexingError> {
        self.index_with_progress(chunks, source_id, |_| {}).await
    }

    /// Indexes chunks, reporting progress after each one.
    ///
    /// Chunks are encoded inline between upserts, so each poll of this future
    /// may run model inference. Drive it where blocking is acceptable.
    ///
    /// Creates the collection if it does not exist yet; existing points are
    /// kept.
    #[instrument(skip_all, fields(collection = %self.schema.name, source = source_id, chunks = chunks.len()))]
    pub async fn index_with_progress<F>(
        &self,
        chunks: &[TextChunk],
        source_id: &str,
        mut on_progress: F,
    ) -> Result<IndexReport, IndexingError>
    where
        F: FnMut(IndexingProgress),
    {
        let timer = ProgressTimer::new();
        self.provision(ProvisionPolicy::ReuseExisting).await?;

        let total = chunks.len();
        let mut report = IndexReport::default();
        let mut pending: Vec<IndexRecord> = Vec::with_capacity(self.batch_size.min(total));

        let mut progress = IndexingProgress::started(total);
        on_progress(progress);

        for chunk in chunks {
            match self.encode_chunk(chunk, source_id) {
                Ok(record) => {
                    pending.push(record);
                    progress.chunks_encoded += 1;
                }
                Err(error) => {
                    warn!(
                        "Skipping chunk {} ({}): {}",
                        chunk.index,
                        chunk.locator(),
                        error
                    );
                    report.failures.push(ChunkFailure {
                        index: chunk.index,
                        span: chunk.span(),
                        section: chunk.section.clone(),
                        error,
                    });
                    progress.chunks_rejected += 1;
                }
            }

            if pending.len() >= self.batch_size {
                self.flush(&mut pending, &mut report).await?;
            }

            progress.points_written = report.written;
            progress.elapsed_ms = timer.elapsed_ms();
            on_progress(progress);
        }

        if !pending.is_empty() {
            self.flush(&mut pending, &mut report).await?;
            progress.points_written = report.written;
            progress.elapsed_ms = timer.elapsed_ms();
            on_progress(progress);
        }

        info!(
            "Indexed {} of {} chunks from '{}' in {}ms",
            report.written,
            total,
            source_id,
            timer.elapsed_ms()
        );
        Ok(report)
    }

    fn encode_chunk(&self, chunk: &TextChunk, source_id: &str) -> Result<IndexRecord, EncodingError> {
        let vectors = self.adapter.encode_passage_set(&chunk.text)?;
        vectors.validate(&self.schema)?;

        Ok(IndexRecord {
            id: ChunkId::new(),
            vectors,
            payload: Payload {
                text: chunk.text.clone(),
                source: source_id.to_string(),
            },
        })
    }

    async fn flush(
        &self,
        pending: &mut Vec<IndexRecord>,
        report: &mut IndexReport,
    ) -> Result<(), IndexingError> {
        if pending.is_empty() {
            return Ok(());
        }

        let batch = std::mem::take(pending);
        self.store
            .upsert(&self.schema.name, &batch)
            .await
            .map_err(|source| IndexingError::Upsert {
                written: report.written,
                attempted: report.written + batch.len(),
                source,
            })?;

        report.written += batch.len();
        debug!("Upserted batch of {} (total {})", batch.len(), report.written);
        Ok(())
    }
}
