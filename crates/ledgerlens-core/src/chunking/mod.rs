//! Text chunking strategies for document processing.
//!
//! This module provides semantic chunking that splits documents into coherent
//! pieces before they are encoded and indexed.
//!
//! # Strategy Selection by File Type
//!
//! - **Text documents**: Semantic sentence-based chunking (via text-splitter)
//! - **Markdown**: Header-based hierarchy, each chunk tagged with its heading
//!
//! # Sizing
//!
//! Chunk budgets are measured by a [`ChunkSizer`]: [`TokenizerSizer`] counts
//! model tokens, [`WordSizer`] counts whitespace-separated words when no
//! tokenizer is loaded. The reference budget is
//! [`MAX_CHUNK_TOKENS`](crate::config::MAX_CHUNK_TOKENS) (300).
//!
//! # Guarantees
//!
//! Chunks are non-overlapping, ordered by position in the source, trimmed, and
//! carry byte spans into the original text (`&text[chunk.span()] == chunk.text`).

mod sizer;
mod splitter;
mod types;

use crate::error::ChunkingError;
use std::path::Path;

pub use sizer::{TokenizerSizer, WordSizer};
pub use splitter::{FilingSplitter, Layout};
pub use text_splitter::ChunkSizer;
pub use types::TextChunk;

/// Trait for text chunking strategies.
///
/// Implementations define how to split text into coherent chunks suitable
/// for embedding.
pub trait ChunkingStrategy: Send + Sync {
    /// Splits text into chunks according to this strategy.
    ///
    /// Chunks are ordered by their position in the source document
    /// (ascending `start`). Blank input yields no chunks.
    fn chunk(&self, text: &str) -> Result<Vec<TextChunk>, ChunkingError>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &'static str;

    /// Returns the maximum target tokens per chunk.
    fn max_tokens(&self) -> usize;
}

/// File type for chunking strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Markdown files (*.md, *.markdown)
    Markdown,
    /// Plain text files (everything else)
    Text,
}

/// Creates a chunker appropriate for the given file type.
///
/// # Errors
///
/// Returns `ChunkingError::InvalidConfig` for a zero token budget.
pub fn create_chunker<Z>(
    file_type: FileType,
    max_tokens: usize,
    sizer: Z,
) -> Result<Box<dyn ChunkingStrategy>, ChunkingError>
where
    Z: ChunkSizer + Clone + Send + Sync + 'static,
{
    if max_tokens == 0 {
        return Err(ChunkingError::InvalidConfig(
            "max_tokens must be at least 1".to_string(),
        ));
    }

    let layout = match file_type {
        FileType::Markdown => Layout::Markdown,
        FileType::Text => Layout::Plain,
    };
    Ok(Box::new(FilingSplitter::new(layout, max_tokens, sizer)))
}

/// Detects file type from filename or path.
///
/// - `.md`, `.markdown` -> FileType::Markdown
/// - Everything else -> FileType::Text
pub fn detect_file_type<P: AsRef<Path>>(filename: P) -> FileType {
    let path = filename.as_ref();

    if let Some(ext) = path.extension() {
        let ext_str = ext.to_string_lossy().to_lowercase();
        if matches!(ext_str.as_str(), "md" | "markdown") {
            return FileType::Markdown;
        }
    }

    FileType::Text
}
