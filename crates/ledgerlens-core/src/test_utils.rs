//! Test utilities for ledgerlens-core.
//!
//! Provides a tiny word-level BERT-style tokenizer so that chunking and
//! tokenizer tests run without downloading model assets.
//! Only compiled when running tests.

use crate::embedding::tokenizer::TokenizerHandle;
use crate::embedding::RepresentationKind;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokenizers::Tokenizer;

/// Vocabulary of the test tokenizer; ids follow array order.
const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "[unused0]", "[unused1]", ".", ",", "?", "the",
    "is", "a", "of", "and", "to", "risk", "liquidity", "market", "volatility", "company",
    "interest", "rate", "first", "second", "third", "sentence", "this", "longer", "piece", "text",
    "that", "should", "be", "split", "into", "multiple", "chunks", "heading", "paragraph",
];

/// Serialized tokenizer JSON: whitespace/punctuation pre-tokenizer, word-level
/// model, BERT post-processing with [CLS]/[SEP].
pub fn tiny_tokenizer_json() -> Vec<u8> {
    let vocab: serde_json::Map<String, serde_json::Value> = VOCAB
        .iter()
        .enumerate()
        .map(|(id, token)| (token.to_string(), serde_json::Value::from(id as u32)))
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    })
    .to_string()
    .into_bytes()
}

/// Loads the raw test tokenizer (singleton, thread-safe).
///
/// # Panics
///
/// Panics if the fixture cannot be parsed.
pub fn load_test_tokenizer() -> Arc<Tokenizer> {
    static TOKENIZER: OnceCell<Arc<Tokenizer>> = OnceCell::new();

    TOKENIZER
        .get_or_init(|| {
            Arc::new(Tokenizer::from_bytes(tiny_tokenizer_json()).expect("Failed to load tokenizer"))
        })
        .clone()
}

/// Creates a TokenizerHandle configured with the specified max_length.
pub fn create_test_tokenizer_handle(max_length: usize) -> TokenizerHandle {
    TokenizerHandle::from_bytes(tiny_tokenizer_json(), max_length, RepresentationKind::Dense)
        .expect("Failed to create TokenizerHandle")
}
