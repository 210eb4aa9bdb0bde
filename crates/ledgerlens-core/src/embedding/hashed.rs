//! FNV-1a feature-hashing encoders.
//!
//! Deterministic, model-free stand-ins for the dense and late-interaction
//! backends. They need no downloads, so tests, benchmarks, and `--hashed`
//! CLI runs exercise the whole pipeline offline. Lexically similar texts get
//! similar vectors; there is no semantic generalization.

use super::traits::RepresentationEncoder;
use super::types::{l2_normalize, Representation, RepresentationKind};
use crate::error::EncodingError;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Adds one signed feature to `vector`.
fn add_feature(vector: &mut [f32], feature: &str, weight: f32) {
    let h = fnv1a(feature.as_bytes());
    let bucket = (h as usize) % vector.len();
    let sign = if (h >> 32) & 1 == 0 { 1.0f32 } else { -1.0f32 };
    vector[bucket] += sign * weight;
}

/// Lowercased alphanumeric words in source order.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn char_ngrams(word: &str, n: usize) -> Vec<String> {
    let padded: Vec<char> = format!("<{}>", word).chars().collect();
    if padded.len() < n {
        return vec![padded.iter().collect()];
    }
    padded.windows(n).map(|w| w.iter().collect()).collect()
}

/// Dense encoder hashing word unigrams and character trigrams.
#[derive(Debug, Clone)]
pub struct HashedDenseEncoder {
    dimension: usize,
    model_id: String,
}

impl HashedDenseEncoder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be > 0");
        Self {
            dimension,
            model_id: format!("fnv1a-dense-{}", dimension),
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in words(text) {
            add_feature(&mut vector, &format!("w:{}", word), 1.0);
            for gram in char_ngrams(&word, 3) {
                add_feature(&mut vector, &format!("c:{}", gram), 0.5);
            }
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl RepresentationEncoder for HashedDenseEncoder {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::Dense
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn encode_passage(&self, text: &str) -> Result<Representation, EncodingError> {
        Ok(Representation::Dense(self.embed(text)))
    }

    fn encode_query(&self, text: &str) -> Result<Representation, EncodingError> {
        Ok(Representation::Dense(self.embed(text)))
    }
}

/// Late-interaction encoder emitting one hashed vector per word.
#[derive(Debug, Clone)]
pub struct HashedTokenEncoder {
    dimension: usize,
    model_id: String,
}

impl HashedTokenEncoder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be > 0");
        Self {
            dimension,
            model_id: format!("fnv1a-tokens-{}", dimension),
        }
    }

    fn embed_tokens(&self, text: &str) -> Result<Vec<Vec<f32>>, EncodingError> {
        let tokens: Vec<Vec<f32>> = words(text)
            .map(|word| {
                let mut vector = vec![0.0f32; self.dimension];
                add_feature(&mut vector, &format!("w:{}", word), 2.0);
                for gram in char_ngrams(&word, 3) {
                    add_feature(&mut vector, &format!("c:{}", gram), 0.5);
                }
                l2_normalize(&mut vector);
                vector
            })
            .collect();

        if tokens.is_empty() {
            return Err(EncodingError::EmptyOutput {
                kind: RepresentationKind::LateInteraction,
                reason: "text contains no word tokens".to_string(),
            });
        }
        Ok(tokens)
    }
}

impl RepresentationEncoder for HashedTokenEncoder {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::LateInteraction
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn encode_passage(&self, text: &str) -> Result<Representation, EncodingError> {
        self.embed_tokens(text).map(Representation::LateInteraction)
    }

    fn encode_query(&self, text: &str) -> Result<Representation, EncodingError> {
        self.embed_tokens(text).map(Representation::LateInteraction)
    }
}
