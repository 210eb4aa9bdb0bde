//! ColBERT late-interaction encoder on Candle.
//!
//! A BERT encoder followed by a bias-free linear projection to 128 dims; every
//! output token vector is L2 normalized.
//!
//! - **Query mode**: `[CLS] [unused0] tokens... [SEP]`, padded with `[MASK]`
//!   to a fixed 32 tokens (query augmentation). Mask tokens are attended to
//!   and emit vectors.
//! - **Passage mode**: `[CLS] [unused1] tokens... [SEP]`; vectors for
//!   punctuation tokens are dropped.

use super::model::{forward_ids, inference_error, load_bert, normalize_rows, select_device, ModelAssets};
use super::tokenizer::TokenizerHandle;
use super::traits::RepresentationEncoder;
use super::types::{Representation, RepresentationKind};
use crate::config::{
    COLBERT_QUERY_TOKENS, LATE_INTERACTION_DIM, LATE_INTERACTION_MODEL_ID, MAX_SEQUENCE_TOKENS,
};
use crate::error::EncodingError;
use candle_core::{Device, Module};
use candle_nn::{linear_no_bias, Linear};
use candle_transformers::models::bert::BertModel;
use tracing::info;

const QUERY_MARKER: &str = "[unused0]";
const DOCUMENT_MARKER: &str = "[unused1]";
const MASK_TOKEN: &str = "[MASK]";

/// Special token ids resolved from the tokenizer vocabulary.
#[derive(Debug, Clone, Copy)]
struct MarkerIds {
    query: u32,
    document: u32,
    mask: u32,
    sep: u32,
}

impl MarkerIds {
    fn resolve(tokenizer: &TokenizerHandle) -> Result<Self, EncodingError> {
        let lookup = |token: &str| {
            tokenizer
                .token_id(token)
                .ok_or_else(|| EncodingError::ModelLoad {
                    kind: RepresentationKind::LateInteraction,
                    reason: format!("Tokenizer has no '{}' token", token),
                })
        };
        Ok(Self {
            query: lookup(QUERY_MARKER)?,
            document: lookup(DOCUMENT_MARKER)?,
            mask: lookup(MASK_TOKEN)?,
            sep: lookup("[SEP]")?,
        })
    }
}

/// Builds the query id sequence: marker after [CLS], truncate to fit, pad
/// with [MASK] up to `len`.
fn query_ids(mut ids: Vec<u32>, markers: MarkerIds, len: usize) -> Vec<u32> {
    // Room for the marker; keep the trailing [SEP]
    if ids.len() > len - 1 {
        ids.truncate(len - 2);
        ids.push(markers.sep);
    }
    ids.insert(1.min(ids.len()), markers.query);
    ids.resize(len, markers.mask);
    ids
}

/// Builds the document id sequence and a keep-mask that drops punctuation.
fn document_ids(ids: &[u32], tokens: &[String], markers: MarkerIds) -> (Vec<u32>, Vec<bool>) {
    let mut out = Vec::with_capacity(ids.len() + 1);
    let mut keep = Vec::with_capacity(ids.len() + 1);
    for (i, (&id, token)) in ids.iter().zip(tokens).enumerate() {
        if i == 1 {
            out.push(markers.document);
            keep.push(true);
        }
        out.push(id);
        keep.push(!is_punctuation(token));
    }
    if ids.len() == 1 {
        out.push(markers.document);
        keep.push(true);
    }
    (out, keep)
}

fn is_punctuation(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_punctuation())
}

/// ColBERT v2 encoder producing one normalized vector per token.
pub struct ColbertEncoder {
    model: BertModel,
    projection: Linear,
    tokenizer: TokenizerHandle,
    markers: MarkerIds,
    device: Device,
    model_id: String,
}

impl ColbertEncoder {
    /// Builds the encoder from a ColBERT checkpoint (`bert.*` + `linear.weight`).
    pub fn from_assets(assets: &ModelAssets) -> Result<Self, EncodingError> {
        let kind = RepresentationKind::LateInteraction;
        info!("Loading late-interaction model '{}'", LATE_INTERACTION_MODEL_ID);

        let device = select_device();
        let (model, config, vb) = load_bert(assets, &device, kind)?;
        let projection = linear_no_bias(config.hidden_size, LATE_INTERACTION_DIM, vb.pp("linear"))
            .map_err(|e| EncodingError::ModelLoad {
                kind,
                reason: format!("Failed to load projection layer: {}", e),
            })?;

        // One slot is reserved for the marker token
        let tokenizer =
            TokenizerHandle::from_bytes(assets.tokenizer.clone(), MAX_SEQUENCE_TOKENS - 1, kind)?;
        let markers = MarkerIds::resolve(&tokenizer)?;

        Ok(Self {
            model,
            projection,
            tokenizer,
            markers,
            device,
            model_id: LATE_INTERACTION_MODEL_ID.to_string(),
        })
    }

    /// Encodes ids and returns `[seq, 128]` normalized rows.
    fn token_vectors(&self, ids: &[u32]) -> Result<Vec<Vec<f32>>, EncodingError> {
        let kind = RepresentationKind::LateInteraction;
        let hidden = forward_ids(&self.model, ids, &self.device, kind)?;
        let projected = self
            .projection
            .forward(&hidden)
            .and_then(|t| t.squeeze(0))
            .map_err(inference_error(kind, "project token vectors"))?;

        normalize_rows(&projected, kind)?
            .to_vec2::<f32>()
            .map_err(inference_error(kind, "convert to vec"))
    }
}

impl RepresentationEncoder for ColbertEncoder {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::LateInteraction
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn encode_passage(&self, text: &str) -> Result<Representation, EncodingError> {
        let encoding = self.tokenizer.encode(text)?;
        let (ids, keep) = document_ids(encoding.get_ids(), encoding.get_tokens(), self.markers);

        let vectors: Vec<Vec<f32>> = self
            .token_vectors(&ids)?
            .into_iter()
            .zip(keep)
            .filter_map(|(v, keep)| keep.then_some(v))
            .collect();

        Ok(Representation::LateInteraction(vectors))
    }

    fn encode_query(&self, text: &str) -> Result<Representation, EncodingError> {
        let ids = query_ids(
            self.tokenizer.tokenize(text)?,
            self.markers,
            COLBERT_QUERY_TOKENS,
        );
        self.token_vectors(&ids).map(Representation::LateInteraction)
    }
}
