//! Chunk indexing.
//!
//! - [`ChunkIndexer`]: encodes chunks with the [`EmbeddingAdapter`](crate::embedding::EmbeddingAdapter)
//!   and upserts them in batches, skipping (and reporting) chunks that fail to encode
//! - [`IndexingPipeline`]: chunker + indexer for raw documents
//! - [`IndexingProgress`]: progress callbacks with ETA

mod indexer;
mod pipeline;
mod progress;

pub use indexer::{ChunkFailure, ChunkIndexer, IndexReport};
pub use pipeline::IndexingPipeline;
pub use progress::IndexingProgress;
