//! Construction of encoders, chunkers, and stores from resolved settings.

use crate::config::{
    find_model_dir, Backend, FileAssetLoader, Settings, COLBERT_MODEL_DIR, DENSE_MODEL_DIR,
};
use anyhow::{anyhow, Context, Result};
use ledgerlens_core::chunking::{
    create_chunker, ChunkingStrategy, FileType, TokenizerSizer, WordSizer,
};
use ledgerlens_core::config::{CollectionSchema, DENSE_DIM, LATE_INTERACTION_DIM};
use ledgerlens_core::embedding::{
    BertDenseEncoder, Bm25SparseEncoder, ColbertEncoder, EmbeddingAdapter, HashedDenseEncoder,
    HashedTokenEncoder, ModelAssets,
};
use ledgerlens_core::storage::{QdrantStore, RedbVectorStore, VectorStore};
use std::future::Future;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::info;

/// Encoders plus the tokenizer used for chunk sizing, when one is loaded.
pub struct Encoders {
    pub adapter: EmbeddingAdapter,
    pub tokenizer: Option<Arc<Tokenizer>>,
}

/// Builds the embedding adapter.
///
/// With `hashed` set, deterministic hashed encoders stand in for the two
/// neural models and no model files are read.
pub async fn build_encoders(settings: &Settings) -> Result<Encoders> {
    if settings.hashed {
        info!("Using hashed encoders");
        let adapter = EmbeddingAdapter::new(
            Arc::new(HashedDenseEncoder::new(DENSE_DIM)),
            Arc::new(Bm25SparseEncoder::new()),
            Arc::new(HashedTokenEncoder::new(LATE_INTERACTION_DIM)),
        )?;
        return Ok(Encoders {
            adapter,
            tokenizer: None,
        });
    }

    let dense_dir = find_model_dir(settings.model_dir.as_deref(), DENSE_MODEL_DIR)?;
    let colbert_dir = find_model_dir(settings.model_dir.as_deref(), COLBERT_MODEL_DIR)?;

    info!("Loading models from {}", dense_dir.display());
    let dense_assets = ModelAssets::load(&FileAssetLoader::new(dense_dir))
        .await
        .map_err(|e| anyhow!("Failed to load dense model files: {}", e))?;
    let colbert_assets = ModelAssets::load(&FileAssetLoader::new(colbert_dir))
        .await
        .map_err(|e| anyhow!("Failed to load ColBERT model files: {}", e))?;

    let dense = BertDenseEncoder::from_assets(&dense_assets)?;
    let tokenizer = dense.tokenizer().shared();
    let colbert = ColbertEncoder::from_assets(&colbert_assets)?;

    let adapter = EmbeddingAdapter::new(
        Arc::new(dense),
        Arc::new(Bm25SparseEncoder::new()),
        Arc::new(colbert),
    )?;
    info!("Models loaded successfully");

    Ok(Encoders {
        adapter,
        tokenizer: Some(tokenizer),
    })
}

/// Builds a chunker sized by model tokens, or by words without a tokenizer.
pub fn build_chunker(
    file_type: FileType,
    max_tokens: usize,
    tokenizer: Option<Arc<Tokenizer>>,
) -> Result<Box<dyn ChunkingStrategy>> {
    let chunker = match tokenizer {
        Some(tokenizer) => create_chunker(file_type, max_tokens, TokenizerSizer::new(tokenizer)),
        None => create_chunker(file_type, max_tokens, WordSizer),
    };
    chunker.context("Failed to create chunker")
}

/// Opens the configured storage backend.
pub fn open_store(settings: &Settings) -> Result<Box<dyn VectorStore>> {
    match settings.backend {
        Backend::Redb => {
            let path = settings.database_path();
            info!("Opening database: {}", path.display());
            let store = RedbVectorStore::open(&path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?;
            Ok(Box::new(store))
        }
        Backend::Qdrant => {
            let url = settings
                .qdrant_url
                .as_deref()
                .ok_or_else(|| anyhow!("QDRANT_URL is not set"))?;
            let store = QdrantStore::new(url, settings.qdrant_api_key.clone())
                .context("Failed to configure Qdrant client")?;
            Ok(Box::new(store))
        }
    }
}

/// Schema of the configured collection.
pub fn collection_schema(settings: &Settings) -> CollectionSchema {
    CollectionSchema::named(settings.collection.clone())
}

// ============================================================================
// Encoding off the async workers
// ============================================================================

fn on_multi_thread_runtime() -> bool {
    Handle::try_current()
        .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
        .unwrap_or(false)
}

/// Runs synchronous encoding work (query encoding, model inference).
///
/// On a multi-thread runtime the current worker hands its other tasks off
/// for the duration; elsewhere the closure simply runs inline.
pub fn encode_blocking<T>(work: impl FnOnce() -> T) -> T {
    if on_multi_thread_runtime() {
        tokio::task::block_in_place(work)
    } else {
        work()
    }
}

/// Drives a future whose polls encode chunks inline (the indexing pipeline).
///
/// The core store traits are `?Send`, so the future cannot move to the
/// blocking pool; it is driven in place instead, as in [`encode_blocking`].
pub async fn drive_encoding<F: Future>(work: F) -> F::Output {
    if on_multi_thread_runtime() {
        tokio::task::block_in_place(|| Handle::current().block_on(work))
    } else {
        work.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvConfig, FileConfig, Overrides};

    fn hashed_settings(dir: &std::path::Path) -> Settings {
        let overrides = Overrides {
            data_dir: Some(dir.to_path_buf()),
            hashed: true,
            ..Overrides::default()
        };
        Settings::merge(&overrides, &EnvConfig::default(), FileConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_hashed_encoders_match_schema() {
        let dir = tempfile::tempdir().unwrap();
        let settings = hashed_settings(dir.path());

        let encoders = build_encoders(&settings).await.unwrap();
        assert!(encoders.tokenizer.is_none());

        let set = encoders
            .adapter
            .encode_passage_set("Liquidity risk is the risk of unmet obligations.")
            .unwrap();
        set.validate(&collection_schema(&settings)).unwrap();
    }

    #[tokio::test]
    async fn test_open_redb_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings = hashed_settings(dir.path());

        let store = open_store(&settings).unwrap();
        assert!(!store.collection_exists("financial").await.unwrap());
        assert!(settings.database_path().exists());
    }

    #[test]
    fn test_word_sized_chunker() {
        let chunker = build_chunker(FileType::Markdown, 300, None).unwrap();
        assert_eq!(chunker.name(), "markdown");
    }

    #[test]
    fn test_encode_blocking_outside_runtime() {
        assert_eq!(encode_blocking(|| 2 + 2), 4);
    }

    #[tokio::test]
    async fn test_encoding_helpers_on_current_thread_runtime() {
        assert_eq!(encode_blocking(|| "risk".len()), 4);
        assert_eq!(drive_encoding(async { 7 }).await, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_encoding_helpers_on_multi_thread_runtime() {
        let ticker = tokio::spawn(async {
            tokio::task::yield_now().await;
            1
        });

        let encoded = encode_blocking(|| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            "liquidity".len()
        });
        let driven = drive_encoding(async {
            tokio::task::yield_now().await;
            encoded * 2
        })
        .await;

        assert_eq!(encoded, 9);
        assert_eq!(driven, 18);
        assert_eq!(ticker.await.unwrap(), 1);
    }
}
