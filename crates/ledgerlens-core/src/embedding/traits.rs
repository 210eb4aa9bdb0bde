//! Traits for encoder backends and model asset loading.
//!
//! These traits let model-backed encoders, hashed test encoders, and remote
//! endpoints be swapped without changing the indexer or the planner.

use super::types::{Representation, RepresentationKind};
use crate::error::{AssetError, EncodingError};
use async_trait::async_trait;

/// Trait for loading the files that make up one BERT-family model.
///
/// Implementations decide where bytes come from:
/// - **CLI**: a model directory on disk
/// - **Tests**: in-memory fixtures
///
/// # Examples
///
/// ```ignore
/// struct DirAssetLoader { dir: PathBuf }
///
/// #[async_trait(?Send)]
/// impl AssetLoader for DirAssetLoader {
///     async fn load_model_bytes(&self) -> Result<Vec<u8>, AssetError> {
///         tokio::fs::read(self.dir.join("model.safetensors")).await
///             .map_err(|e| AssetError::LoadFailed(e.to_string()))
///     }
///     // ...
/// }
/// ```
#[async_trait(?Send)]
pub trait AssetLoader: Send + Sync {
    /// Load the HuggingFace `config.json` as raw bytes.
    async fn load_config_bytes(&self) -> Result<Vec<u8>, AssetError>;

    /// Load model weights as raw bytes (safetensors format).
    async fn load_model_bytes(&self) -> Result<Vec<u8>, AssetError>;

    /// Load tokenizer configuration as raw bytes (JSON format).
    async fn load_tokenizer_bytes(&self) -> Result<Vec<u8>, AssetError>;
}

/// A backend that encodes text into exactly one kind of representation.
///
/// Passage and query encodings of the same text may differ (ColBERT uses
/// different markers and query augmentation; BM25 weights documents by term
/// frequency but queries by presence).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the
/// [`EmbeddingAdapter`](super::EmbeddingAdapter) runs the three encoders of a
/// text on separate scoped threads.
pub trait RepresentationEncoder: Send + Sync {
    /// The kind of representation this encoder produces.
    fn kind(&self) -> RepresentationKind;

    /// Identifier of the underlying model (for logs and diagnostics).
    fn model_id(&self) -> &str;

    /// Encodes a document passage for indexing.
    fn encode_passage(&self, text: &str) -> Result<Representation, EncodingError>;

    /// Encodes a search query.
    fn encode_query(&self, text: &str) -> Result<Representation, EncodingError>;
}
