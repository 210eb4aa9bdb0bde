//! Tokenization utilities for the BERT-family encoders.
//!
//! This module provides the `TokenizerHandle` type for managing HuggingFace
//! tokenizers with truncation configured for the encoder that owns them.

use super::types::RepresentationKind;
use crate::error::EncodingError;
use std::sync::Arc;
use tokenizers::tokenizer::{
    Encoding, Tokenizer, TruncationDirection, TruncationParams, TruncationStrategy,
};

/// Handle for a configured tokenizer.
///
/// Errors are tagged with the representation kind of the encoder that owns
/// the handle. The inner tokenizer is shared behind an `Arc` so the chunker
/// can size chunks with exactly the tokenizer used for encoding.
///
/// # Examples
///
/// ```ignore
/// let bytes = std::fs::read("tokenizer.json")?;
/// let handle = TokenizerHandle::from_bytes(bytes, 512, RepresentationKind::Dense)?;
///
/// let ids = handle.tokenize("Liquidity risk")?;
/// ```
#[derive(Clone)]
pub struct TokenizerHandle {
    tokenizer: Arc<Tokenizer>,
    max_length: usize,
    kind: RepresentationKind,
}

impl TokenizerHandle {
    /// Creates a tokenizer from JSON bytes with truncation configured.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError::ModelLoad` if the JSON cannot be deserialized
    /// or truncation cannot be configured.
    pub fn from_bytes(
        tokenizer_bytes: Vec<u8>,
        max_length: usize,
        kind: RepresentationKind,
    ) -> Result<Self, EncodingError> {
        let mut tokenizer = Tokenizer::from_bytes(tokenizer_bytes).map_err(|e| {
            EncodingError::ModelLoad {
                kind,
                reason: format!("Failed to deserialize tokenizer: {}", e),
            }
        })?;

        configure_truncation(&mut tokenizer, max_length, kind)?;

        Ok(Self {
            tokenizer: Arc::new(tokenizer),
            max_length,
            kind,
        })
    }

    /// Returns the configured maximum length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns a reference to the underlying tokenizer.
    pub fn inner(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Returns a shared handle to the tokenizer, for chunk sizing.
    pub fn shared(&self) -> Arc<Tokenizer> {
        Arc::clone(&self.tokenizer)
    }

    /// Encodes text, including special tokens ([CLS], [SEP]).
    pub fn encode(&self, text: &str) -> Result<Encoding, EncodingError> {
        let encoding =
            self.tokenizer
                .encode(text, true)
                .map_err(|e| EncodingError::TokenizationFailed {
                    kind: self.kind,
                    reason: format!("Encoding failed: {}", e),
                })?;

        if encoding.get_ids().is_empty() {
            return Err(EncodingError::TokenizationFailed {
                kind: self.kind,
                reason: "Tokenizer returned no tokens".to_string(),
            });
        }
        Ok(encoding)
    }

    /// Tokenizes text into token IDs.
    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>, EncodingError> {
        self.encode(text).map(|encoding| encoding.get_ids().to_vec())
    }

    /// Looks up the id of a special or vocabulary token.
    pub fn token_id(&self, token: &str) -> Option<u32> {
        self.tokenizer.token_to_id(token)
    }

    /// Returns the vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

/// Configures tokenizer with truncation settings.
fn configure_truncation(
    tokenizer: &mut Tokenizer,
    max_length: usize,
    kind: RepresentationKind,
) -> Result<(), EncodingError> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            stride: 0,
            strategy: TruncationStrategy::OnlyFirst,
            direction: TruncationDirection::Right,
        }))
        .map_err(|e| EncodingError::ModelLoad {
            kind,
            reason: format!("Failed to configure tokenizer truncation: {}", e),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_tokenizer_handle;

    #[test]
    fn test_tokenize_adds_special_tokens() {
        let handle = create_test_tokenizer_handle(64);
        let ids = handle.tokenize("liquidity risk").unwrap();

        assert_eq!(ids.first(), handle.token_id("[CLS]").as_ref());
        assert_eq!(ids.last(), handle.token_id("[SEP]").as_ref());
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_truncation() {
        let handle = create_test_tokenizer_handle(6);
        let ids = handle.tokenize(&"risk ".repeat(50)).unwrap();
        assert!(ids.len() <= 6, "Expected <= 6 tokens, got {}", ids.len());
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let handle = create_test_tokenizer_handle(64);
        let ids = handle.tokenize("zebra").unwrap();
        assert_eq!(ids[1], handle.token_id("[UNK]").unwrap());
    }

    #[test]
    fn test_invalid_bytes_name_kind() {
        let result = TokenizerHandle::from_bytes(
            b"not json".to_vec(),
            16,
            RepresentationKind::LateInteraction,
        );
        let err = result.err().unwrap();
        assert_eq!(err.kind(), RepresentationKind::LateInteraction);
    }

    #[test]
    fn test_clone_shares_tokenizer() {
        let handle = create_test_tokenizer_handle(64);
        let cloned = handle.clone();
        assert!(Arc::ptr_eq(&handle.shared(), &cloned.shared()));
        assert_eq!(handle.vocab_size(), cloned.vocab_size());
    }
}
