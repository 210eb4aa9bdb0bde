//! Indexing pipeline: chunk a document, then hand the chunks to the indexer.

use super::indexer::{ChunkIndexer, IndexReport};
use super::progress::IndexingProgress;
use crate::chunking::ChunkingStrategy;
use crate::error::IndexingError;
use crate::storage::VectorStore;
use tracing::debug;

/// Coordinates chunking and indexing for whole documents.
///
/// # Example
///
/// ```ignore
/// use ledgerlens_core::chunking::{create_chunker, FileType, TokenizerSizer};
/// use ledgerlens_core::indexing::{ChunkIndexer, IndexingPipeline};
///
/// let chunker = create_chunker(FileType::Markdown, MAX_CHUNK_TOKENS, sizer)?;
/// let pipeline = IndexingPipeline::new(chunker, ChunkIndexer::new(&adapter, &store, schema));
///
/// let report = pipeline
///     .index_text(&filing.combined_text(), "AAPL-10-K", |p| {
///         println!("{:.0}%", p.percent_complete())
///     })
///     .await?;
/// ```
pub struct IndexingPipeline<'a, S: VectorStore + ?Sized> {
    chunker: Box<dyn ChunkingStrategy>,
    indexer: ChunkIndexer<'a, S>,
}

impl<'a, S: VectorStore + ?Sized> IndexingPipeline<'a, S> {
    pub fn new(chunker: Box<dyn ChunkingStrategy>, indexer: ChunkIndexer<'a, S>) -> Self {
        Self { chunker, indexer }
    }

    pub fn indexer(&self) -> &ChunkIndexer<'a, S> {
        &self.indexer
    }

    /// Chunks `content` and indexes every chunk under `source_id`.
    ///
    /// Blank content writes nothing and returns an empty report.
    pub async fn index_text<F>(
        &self,
        content: &str,
        source_id: &str,
        on_progress: F,
    ) -> Result<IndexReport, IndexingError>
    where
        F: FnMut(IndexingProgress),
    {
        let chunks = self.chunker.chunk(content)?;
        debug!(
            "{} chunker produced {} chunks from {} bytes",
            self.chunker.name(),
            chunks.len(),
            content.len()
        );

        if chunks.is_empty() {
            return Ok(IndexReport::default());
        }

        self.indexer
            .index_with_progress(&chunks, source_id, on_progress)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{create_chunker, FileType, WordSizer};
    use crate::config::CollectionSchema;
    use crate::embedding::{
        Bm25SparseEncoder, EmbeddingAdapter, HashedDenseEncoder, HashedTokenEncoder,
    };
    use crate::storage::InMemoryVectorStore;
    use std::sync::Arc;

    fn adapter() -> EmbeddingAdapter {
        EmbeddingAdapter::new(
            Arc::new(HashedDenseEncoder::new(384)),
            Arc::new(Bm25SparseEncoder::new()),
            Arc::new(HashedTokenEncoder::new(128)),
        )
        .unwrap()
    }

    const FILING: &str = "## Item 1A\n\n\
        Liquidity risk is the risk that the company cannot meet its obligations.\n\n\
        ## Item 7\n\n\
        Market volatility affects the fair value of our investments.";

    #[tokio::test]
    async fn test_index_markdown_document() {
        let adapter = adapter();
        let store = InMemoryVectorStore::new();
        let chunker = create_chunker(FileType::Markdown, 16, WordSizer).unwrap();
        let pipeline = IndexingPipeline::new(
            chunker,
            ChunkIndexer::new(&adapter, &store, CollectionSchema::named("filings")),
        );

        let report = pipeline.index_text(FILING, "ACME-10-K", |_| {}).await.unwrap();

        assert!(report.is_complete());
        assert!(report.written >= 2);
        assert_eq!(store.count("filings").await.unwrap(), report.written);
    }

    #[tokio::test]
    async fn test_blank_document_writes_nothing() {
        let adapter = adapter();
        let store = InMemoryVectorStore::new();
        let chunker = create_chunker(FileType::Text, 300, WordSizer).unwrap();
        let pipeline = IndexingPipeline::new(
            chunker,
            ChunkIndexer::new(&adapter, &store, CollectionSchema::named("filings")),
        );

        let report = pipeline.index_text("  \n\n ", "empty", |_| {}).await.unwrap();

        assert_eq!(report.written, 0);
        assert!(!store.collection_exists("filings").await.unwrap());
    }
}
