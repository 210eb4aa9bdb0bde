//! BM25 sparse encoder backed by the `bm25` crate's embedder.
//!
//! Text is tokenized with English stemming and stop-word removal; each
//! surviving term is hashed to a `u32` index.
//!
//! - **Passage mode**: the BM25 term-frequency saturation
//!   `tf * (k1 + 1) / (tf + k1 * (1 - b + b * len / avgdl))`
//! - **Query mode**: weight `1.0` for each distinct term
//!
//! The dot product of a query and a passage is then the sum of the passage's
//! BM25 weights over the query terms it contains.

use super::traits::RepresentationEncoder;
use super::types::{Representation, RepresentationKind, SparseVector};
use crate::config::{BM25_AVG_DOC_LEN, SPARSE_MODEL_ID};
use crate::error::EncodingError;
use bm25::{Embedder, EmbedderBuilder, Language};

/// Sparse lexical encoder.
pub struct Bm25SparseEncoder {
    embedder: Embedder,
}

impl Bm25SparseEncoder {
    /// Creates an encoder with the reference average document length.
    pub fn new() -> Self {
        Self::with_avgdl(BM25_AVG_DOC_LEN)
    }

    /// Creates an encoder with a custom average document length.
    pub fn with_avgdl(avgdl: f32) -> Self {
        let embedder: Embedder = EmbedderBuilder::with_avgdl(avgdl)
            .language_mode(Language::English)
            .build();
        Self { embedder }
    }

    fn term_weights(&self, text: &str) -> Vec<(u32, f32)> {
        self.embedder
            .embed(text)
            .0
            .into_iter()
            .map(|token| (token.index, token.value))
            .collect()
    }
}

impl Default for Bm25SparseEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RepresentationEncoder for Bm25SparseEncoder {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::Sparse
    }

    fn model_id(&self) -> &str {
        SPARSE_MODEL_ID
    }

    fn encode_passage(&self, text: &str) -> Result<Representation, EncodingError> {
        Ok(Representation::Sparse(SparseVector::from_pairs(
            self.term_weights(text),
        )))
    }

    fn encode_query(&self, text: &str) -> Result<Representation, EncodingError> {
        let presence = self
            .term_weights(text)
            .into_iter()
            .map(|(index, _)| (index, 1.0));
        Ok(Representation::Sparse(SparseVector::from_pairs(presence)))
    }
}
