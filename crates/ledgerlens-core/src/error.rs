//! Error types for ledgerlens-core.
//!
//! Each stage of the pipeline owns one error enum: encoding, chunking,
//! indexing, querying, and filing retrieval. Storage errors live with the
//! [`VectorStore`](crate::storage::VectorStore) trait in
//! [`storage`](crate::storage) and convert into the stage errors here.

use crate::embedding::RepresentationKind;
use crate::storage::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors produced while turning text into a representation.
///
/// Every variant names the representation kind that failed so that callers
/// can tell a dense-model outage from a sparse tokenizer problem.
#[derive(Debug, Clone, Error)]
pub enum EncodingError {
    /// Input text was empty or whitespace-only
    #[error("{kind} encoding rejected empty input")]
    EmptyInput { kind: RepresentationKind },
    /// Model produced no usable output (e.g. zero token vectors)
    #[error("{kind} encoding produced no output: {reason}")]
    EmptyOutput {
        kind: RepresentationKind,
        reason: String,
    },
    /// Output dimension does not match the collection schema
    #[error("{kind} encoding has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        kind: RepresentationKind,
        expected: usize,
        actual: usize,
    },
    /// Encoder returned a representation of the wrong kind
    #[error("encoder registered for {expected} returned {actual}")]
    KindMismatch {
        expected: RepresentationKind,
        actual: RepresentationKind,
    },
    /// Failed to load model weights or configuration
    #[error("{kind} model failed to load: {reason}")]
    ModelLoad {
        kind: RepresentationKind,
        reason: String,
    },
    /// Failed to tokenize text
    #[error("{kind} tokenization failed: {reason}")]
    TokenizationFailed {
        kind: RepresentationKind,
        reason: String,
    },
    /// Forward pass or pooling failed
    #[error("{kind} inference failed: {reason}")]
    InferenceFailed {
        kind: RepresentationKind,
        reason: String,
    },
}

impl EncodingError {
    /// Returns the representation kind this error belongs to.
    pub fn kind(&self) -> RepresentationKind {
        match self {
            EncodingError::EmptyInput { kind }
            | EncodingError::EmptyOutput { kind, .. }
            | EncodingError::DimensionMismatch { kind, .. }
            | EncodingError::ModelLoad { kind, .. }
            | EncodingError::TokenizationFailed { kind, .. }
            | EncodingError::InferenceFailed { kind, .. } => *kind,
            EncodingError::KindMismatch { expected, .. } => *expected,
        }
    }
}

/// Errors that can occur during asset loading.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    /// Failed to load asset from source
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),
    /// Asset not found at expected location
    #[error("Asset not found: {0}")]
    NotFound(String),
    /// Asset data is invalid or corrupted
    #[error("Invalid asset data: {0}")]
    InvalidData(String),
}

/// Errors that can occur during text chunking.
#[derive(Debug, Clone, Error)]
pub enum ChunkingError {
    /// Failed to chunk text
    #[error("Failed to chunk text: {0}")]
    ChunkFailed(String),
    /// Invalid chunking configuration
    #[error("Invalid chunking config: {0}")]
    InvalidConfig(String),
    /// Tokenizer error during chunk sizing
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),
}

/// Errors that abort an indexing run.
///
/// Per-chunk encoding failures do not abort a run; they are reported in
/// [`IndexReport::failures`](crate::indexing::IndexReport).
#[derive(Debug, Error)]
pub enum IndexingError {
    /// Collection could not be created, deleted, or inspected
    #[error("Failed to provision collection '{collection}': {source}")]
    Provision {
        collection: String,
        #[source]
        source: StoreError,
    },
    /// A batch upsert failed after `written` of `attempted` records were stored
    #[error("Upsert failed after {written} of {attempted} records were written: {source}")]
    Upsert {
        written: usize,
        attempted: usize,
        #[source]
        source: StoreError,
    },
    /// Chunker rejected the input
    #[error("Chunking failed: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Stage of query evaluation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    /// Encoding the query into its three representations
    Encoding,
    /// Stage A nearest-neighbour or lexical recall
    Recall,
    /// Stage A reciprocal rank fusion
    Fusion,
    /// Stage B late-interaction rerank
    Rerank,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStage::Encoding => "encoding",
            QueryStage::Recall => "recall",
            QueryStage::Fusion => "fusion",
            QueryStage::Rerank => "rerank",
        };
        f.write_str(name)
    }
}

/// Errors returned by the query planner.
///
/// An empty result set is never an error: callers get `Ok(vec![])`.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Query text is empty or the limits are unusable
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The query could not be encoded
    #[error("Query encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    /// The storage engine rejected part of the plan
    #[error("Query failed during {stage}: {message}")]
    Stage { stage: QueryStage, message: String },
    /// The target collection has not been provisioned
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The storage engine could not be reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl QueryError {
    /// Returns the stage that failed, when the error is stage-specific.
    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            QueryError::Encoding(_) => Some(QueryStage::Encoding),
            QueryError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CollectionNotFound(name) => QueryError::CollectionNotFound(name),
            StoreError::Unavailable(msg) => QueryError::StorageUnavailable(msg),
            StoreError::Execution { stage, message } => QueryError::Stage { stage, message },
            other => QueryError::Stage {
                stage: QueryStage::Recall,
                message: other.to_string(),
            },
        }
    }
}

/// Errors from the filing source.
#[derive(Debug, Error)]
pub enum FilingError {
    /// Ticker, filing, or document is absent upstream
    #[error("Not found: {0}")]
    NotFound(String),
    /// Requested form type has no item layout
    #[error("Unsupported form type '{0}' (expected 10-K or 10-Q)")]
    UnsupportedForm(String),
    /// Identity (contact e-mail) missing or malformed
    #[error("Invalid EDGAR identity: {0}")]
    InvalidIdentity(String),
    /// Transport failure talking to the filing service
    #[error("Request failed: {0}")]
    Request(String),
    /// Upstream payload could not be parsed
    #[error("Malformed response: {0}")]
    Malformed(String),
}
