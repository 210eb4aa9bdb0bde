//! Chunk sizers for text-splitter integration.

use std::sync::Arc;
use text_splitter::ChunkSizer;
use tokenizers::Tokenizer;

/// ChunkSizer implementation for HuggingFace Tokenizer.
///
/// The tokenizer used for sizing should be the one the dense encoder uses,
/// so the chunk budget predicts the encoder's token count.
#[derive(Clone)]
pub struct TokenizerSizer {
    tokenizer: Arc<Tokenizer>,
}

impl TokenizerSizer {
    pub fn new(tokenizer: Arc<Tokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl ChunkSizer for TokenizerSizer {
    /// Returns the token count for the given text chunk, without special tokens.
    fn size(&self, chunk: &str) -> usize {
        self.tokenizer
            .encode(chunk, false)
            .map(|encoding| encoding.len())
            .unwrap_or(0)
    }
}

/// Counts whitespace-separated words.
///
/// Used when no model tokenizer is loaded (hashed encoders). Subword
/// tokenizers produce more tokens than words, so pair it with a smaller
/// budget when switching to model encoders later.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordSizer;

impl ChunkSizer for WordSizer {
    fn size(&self, chunk: &str) -> usize {
        chunk.split_whitespace().count()
    }
}
