//! Production configuration constants and retrieval settings.
//!
//! Constants here describe the reference deployment: the three embedding
//! models, their output dimensions, the chunk budget, and the default
//! retrieval funnel (10 + 10 recall, fused to 20, reranked to 3).
//!
//! # Usage
//!
//! ```
//! use ledgerlens_core::config::{CollectionSchema, RetrievalConfig, DENSE_DIM};
//!
//! let schema = CollectionSchema::default();
//! assert_eq!(schema.dense.dim, DENSE_DIM);
//!
//! let retrieval = RetrievalConfig::default();
//! assert_eq!(retrieval.rrf_k, 60);
//! ```

use crate::embedding::RepresentationKind;
use serde::{Deserialize, Serialize};

// =============================================================================
// Embedding Models
// =============================================================================

/// Dense sentence encoder.
pub const DENSE_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Dense vector dimension (MiniLM-L6 hidden size).
pub const DENSE_DIM: usize = 384;

/// Sparse lexical weighting scheme.
pub const SPARSE_MODEL_ID: &str = "Qdrant/bm25";

/// Average document length assumed by the BM25 length normalization.
pub const BM25_AVG_DOC_LEN: f32 = 256.0;

/// Late-interaction encoder.
pub const LATE_INTERACTION_MODEL_ID: &str = "colbert-ir/colbertv2.0";

/// Per-token vector dimension of the ColBERT projection layer.
pub const LATE_INTERACTION_DIM: usize = 128;

/// Fixed query length for ColBERT query augmentation (marker included).
pub const COLBERT_QUERY_TOKENS: usize = 32;

/// Maximum sequence length fed to either BERT encoder.
pub const MAX_SEQUENCE_TOKENS: usize = 512;

// =============================================================================
// Text Chunking Configuration
// =============================================================================

/// Maximum tokens per chunk.
///
/// Kept well under `MAX_SEQUENCE_TOKENS` so that the ColBERT document marker
/// and special tokens never push a chunk into truncation.
pub const MAX_CHUNK_TOKENS: usize = 300;

/// Number of records sent to the store per upsert call.
pub const UPSERT_BATCH_SIZE: usize = 64;

// =============================================================================
// Retrieval Funnel
// =============================================================================

/// Reciprocal rank fusion constant.
pub const RRF_K: usize = 60;

/// Candidates fetched by each Stage A recall channel.
pub const INNER_LIMIT: usize = 10;

/// Candidates kept after Stage A fusion and handed to the reranker.
pub const OUTER_LIMIT: usize = 20;

/// Results returned after Stage B.
pub const DEFAULT_FINAL_LIMIT: usize = 3;

// =============================================================================
// Collection Layout
// =============================================================================

/// Default collection name.
pub const COLLECTION_NAME: &str = "financial";

/// Named vector space holding dense vectors.
pub const DENSE_SPACE: &str = "dense";

/// Named vector space holding sparse vectors.
pub const SPARSE_SPACE: &str = "sparse";

/// Named vector space holding late-interaction token vectors.
pub const LATE_INTERACTION_SPACE: &str = "colbert";

/// Similarity metric declared for a vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Cosine similarity (vectors normalized on insert)
    Cosine,
    /// Plain dot product over shared sparse indices
    Dot,
    /// Sum over query tokens of the best-matching document token (cosine)
    MaxSim,
}

/// One named vector space of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// Space name as seen by the storage engine
    pub name: String,
    /// Vector dimension; `0` for sparse spaces
    pub dim: usize,
    /// Similarity metric
    pub metric: Metric,
}

/// Layout of a collection: one space per representation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub dense: SpaceConfig,
    pub sparse: SpaceConfig,
    pub late_interaction: SpaceConfig,
}

impl CollectionSchema {
    /// Creates the reference layout under a custom collection name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the space that stores the given representation kind.
    pub fn space(&self, kind: RepresentationKind) -> &SpaceConfig {
        match kind {
            RepresentationKind::Dense => &self.dense,
            RepresentationKind::Sparse => &self.sparse,
            RepresentationKind::LateInteraction => &self.late_interaction,
        }
    }
}

impl Default for CollectionSchema {
    fn default() -> Self {
        Self {
            name: COLLECTION_NAME.to_string(),
            dense: SpaceConfig {
                name: DENSE_SPACE.to_string(),
                dim: DENSE_DIM,
                metric: Metric::Cosine,
            },
            sparse: SpaceConfig {
                name: SPARSE_SPACE.to_string(),
                dim: 0,
                metric: Metric::Dot,
            },
            late_interaction: SpaceConfig {
                name: LATE_INTERACTION_SPACE.to_string(),
                dim: LATE_INTERACTION_DIM,
                metric: Metric::MaxSim,
            },
        }
    }
}

/// Whether provisioning may destroy an existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionPolicy {
    /// Delete the collection (if present) and create it empty
    Recreate,
    /// Keep an existing collection and its points; create it if missing
    ReuseExisting,
}

/// Tunables for the two-stage retrieval funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF constant `k` in `1 / (k + rank)`
    pub rrf_k: usize,
    /// Limit for each Stage A recall channel
    pub inner_limit: usize,
    /// Limit after Stage A fusion
    pub outer_limit: usize,
    /// Default number of final results
    pub final_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: RRF_K,
            inner_limit: INNER_LIMIT,
            outer_limit: OUTER_LIMIT,
            final_limit: DEFAULT_FINAL_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_spaces() {
        let schema = CollectionSchema::default();
        assert_eq!(schema.name, "financial");
        assert_eq!(schema.space(RepresentationKind::Dense).metric, Metric::Cosine);
        assert_eq!(schema.space(RepresentationKind::Sparse).metric, Metric::Dot);
        assert_eq!(
            schema.space(RepresentationKind::LateInteraction).name,
            "colbert"
        );
        assert_eq!(schema.late_interaction.dim, 128);
    }

    #[test]
    fn test_named_schema_keeps_layout() {
        let schema = CollectionSchema::named("filings-test");
        assert_eq!(schema.name, "filings-test");
        assert_eq!(schema.dense, CollectionSchema::default().dense);
    }

    #[test]
    fn test_retrieval_config_partial_toml_style_json() {
        // Missing fields fall back to defaults
        let cfg: RetrievalConfig = serde_json::from_str(r#"{"final_limit": 5}"#).unwrap();
        assert_eq!(cfg.final_limit, 5);
        assert_eq!(cfg.rrf_k, 60);
        assert_eq!(cfg.inner_limit, 10);
        assert_eq!(cfg.outer_limit, 20);
    }

    #[test]
    fn test_chunk_budget_fits_sequence() {
        let budget = MAX_CHUNK_TOKENS;
        assert!(budget < MAX_SEQUENCE_TOKENS);
    }
}
