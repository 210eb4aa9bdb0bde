//! Candle-backed BERT dense encoder and shared model plumbing.
//!
//! [`BertDenseEncoder`] runs a sentence-transformers BERT checkpoint
//! (`all-MiniLM-L6-v2` by default): mean pooling over the final hidden
//! states followed by L2 normalization. Device selection, asset loading, and
//! the tensor helpers here are shared with the ColBERT encoder.

use super::tokenizer::TokenizerHandle;
use super::traits::{AssetLoader, RepresentationEncoder};
use super::types::{Representation, RepresentationKind};
use crate::config::{DENSE_MODEL_ID, MAX_SEQUENCE_TOKENS};
use crate::error::{AssetError, EncodingError};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use tracing::info;

/// Raw files that make up one BERT-family model.
#[derive(Clone)]
pub struct ModelAssets {
    /// HuggingFace `config.json`
    pub config: Vec<u8>,
    /// Safetensors weights
    pub weights: Vec<u8>,
    /// `tokenizer.json`
    pub tokenizer: Vec<u8>,
}

impl ModelAssets {
    /// Loads all three files through an [`AssetLoader`].
    pub async fn load(loader: &dyn AssetLoader) -> Result<Self, AssetError> {
        Ok(Self {
            config: loader.load_config_bytes().await?,
            weights: loader.load_model_bytes().await?,
            tokenizer: loader.load_tokenizer_bytes().await?,
        })
    }
}

/// Selects the best available compute device.
///
/// Tries CUDA, then Metal, then falls back to CPU. GPU devices are only
/// available when the matching `candle-*` feature is enabled.
pub fn select_device() -> Device {
    if let Ok(cuda_device) = Device::new_cuda(0) {
        info!("Using CUDA GPU");
        return cuda_device;
    }

    if let Ok(metal_device) = Device::new_metal(0) {
        info!("Using Metal GPU");
        return metal_device;
    }

    info!("Using CPU");
    Device::Cpu
}

/// Parses a BERT config and builds the encoder stack from safetensors bytes.
pub(crate) fn load_bert(
    assets: &ModelAssets,
    device: &Device,
    kind: RepresentationKind,
) -> Result<(BertModel, Config, VarBuilder<'static>), EncodingError> {
    let config: Config =
        serde_json::from_slice(&assets.config).map_err(|e| EncodingError::ModelLoad {
            kind,
            reason: format!("Invalid config.json: {}", e),
        })?;

    if assets.weights.len() < 8 {
        return Err(EncodingError::ModelLoad {
            kind,
            reason: "Model file too small".to_string(),
        });
    }

    info!(
        "Loading {} weights ({:.2}MB)",
        kind,
        assets.weights.len() as f64 / 1_000_000.0
    );

    let vb = VarBuilder::from_buffered_safetensors(assets.weights.clone(), DType::F32, device)
        .map_err(|e| EncodingError::ModelLoad {
            kind,
            reason: format!("Failed to create VarBuilder: {}", e),
        })?;

    let model = BertModel::load(vb.clone(), &config).map_err(|e| EncodingError::ModelLoad {
        kind,
        reason: format!("Failed to create BertModel: {}", e),
    })?;

    Ok((model, config, vb))
}

/// Maps a candle error into an inference failure for `kind`.
pub(crate) fn inference_error(
    kind: RepresentationKind,
    step: &'static str,
) -> impl Fn(candle_core::Error) -> EncodingError {
    move |e| EncodingError::InferenceFailed {
        kind,
        reason: format!("Failed to {}: {}", step, e),
    }
}

/// Runs the encoder over one sequence: `[seq]` ids in, `[1, seq, hidden]` out.
pub(crate) fn forward_ids(
    model: &BertModel,
    ids: &[u32],
    device: &Device,
    kind: RepresentationKind,
) -> Result<Tensor, EncodingError> {
    let input_ids = Tensor::new(ids, device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(inference_error(kind, "create input tensor"))?;
    let token_type_ids = input_ids
        .zeros_like()
        .map_err(inference_error(kind, "create token type ids"))?;
    let attention_mask = input_ids
        .ones_like()
        .map_err(inference_error(kind, "create attention mask"))?;

    model
        .forward(&input_ids, &token_type_ids, Some(&attention_mask))
        .map_err(inference_error(kind, "run forward pass"))
}

/// Divides each row of a 2-D tensor by its L2 norm.
pub(crate) fn normalize_rows(v: &Tensor, kind: RepresentationKind) -> Result<Tensor, EncodingError> {
    let norms = v
        .sqr()
        .and_then(|t| t.sum_keepdim(1))
        .and_then(|t| t.sqrt())
        .map_err(inference_error(kind, "compute norms"))?;
    v.broadcast_div(&norms)
        .map_err(inference_error(kind, "normalize"))
}

/// Sentence-transformers dense encoder.
///
/// Passage and query encodings are identical for this model family.
pub struct BertDenseEncoder {
    model: BertModel,
    tokenizer: TokenizerHandle,
    device: Device,
    model_id: String,
}

impl BertDenseEncoder {
    /// Builds the encoder from raw model files on the best available device.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError::ModelLoad` tagged `dense` when the config,
    /// weights, or tokenizer cannot be loaded.
    pub fn from_assets(assets: &ModelAssets) -> Result<Self, EncodingError> {
        let kind = RepresentationKind::Dense;
        info!("Loading dense model '{}'", DENSE_MODEL_ID);

        let device = select_device();
        let (model, _config, _vb) = load_bert(assets, &device, kind)?;
        let tokenizer =
            TokenizerHandle::from_bytes(assets.tokenizer.clone(), MAX_SEQUENCE_TOKENS, kind)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: DENSE_MODEL_ID.to_string(),
        })
    }

    /// Returns the tokenizer, e.g. for token-accurate chunk sizing.
    pub fn tokenizer(&self) -> &TokenizerHandle {
        &self.tokenizer
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EncodingError> {
        let kind = RepresentationKind::Dense;
        let ids = self.tokenizer.tokenize(text)?;

        // [1, seq_len, hidden] -> mean over tokens -> [1, hidden]
        let hidden = forward_ids(&self.model, &ids, &self.device, kind)?;
        let (_batch, n_tokens, _hidden) = hidden.dims3().map_err(inference_error(kind, "get dims"))?;
        let pooled = hidden
            .sum(1)
            .and_then(|t| t.affine(1.0 / n_tokens as f64, 0.0))
            .map_err(inference_error(kind, "mean pool"))?;

        normalize_rows(&pooled, kind)?
            .squeeze(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(inference_error(kind, "convert to vec"))
    }
}

impl RepresentationEncoder for BertDenseEncoder {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::Dense
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn encode_passage(&self, text: &str) -> Result<Representation, EncodingError> {
        self.embed(text).map(Representation::Dense)
    }

    fn encode_query(&self, text: &str) -> Result<Representation, EncodingError> {
        self.embed(text).map(Representation::Dense)
    }
}
