//! Uniform access to the dense, sparse, and late-interaction encoders.

use super::traits::RepresentationEncoder;
use super::types::{Representation, RepresentationKind, RepresentationSet, SparseVector};
use crate::config::CollectionSchema;
use crate::error::EncodingError;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone, Copy)]
enum Mode {
    Passage,
    Query,
}

/// Wraps the three encoders behind one "text in, representation out" contract.
///
/// The adapter owns no model state of its own; it validates inputs, routes to
/// the right backend, and checks that each backend returned the kind it was
/// registered for.
///
/// # Example
///
/// ```ignore
/// let adapter = EmbeddingAdapter::new(
///     Arc::new(dense),
///     Arc::new(Bm25SparseEncoder::new()),
///     Arc::new(colbert),
/// )?;
///
/// let chunk = adapter.encode_passage_set("Liquidity risk is ...")?;
/// let query = adapter.encode_query_set("What is the liquidity risk?")?;
/// ```
#[derive(Clone)]
pub struct EmbeddingAdapter {
    dense: Arc<dyn RepresentationEncoder>,
    sparse: Arc<dyn RepresentationEncoder>,
    late_interaction: Arc<dyn RepresentationEncoder>,
}

impl EmbeddingAdapter {
    /// Creates an adapter, checking that each encoder reports the kind of the
    /// slot it is placed in.
    pub fn new(
        dense: Arc<dyn RepresentationEncoder>,
        sparse: Arc<dyn RepresentationEncoder>,
        late_interaction: Arc<dyn RepresentationEncoder>,
    ) -> Result<Self, EncodingError> {
        for (expected, encoder) in [
            (RepresentationKind::Dense, &dense),
            (RepresentationKind::Sparse, &sparse),
            (RepresentationKind::LateInteraction, &late_interaction),
        ] {
            if encoder.kind() != expected {
                return Err(EncodingError::KindMismatch {
                    expected,
                    actual: encoder.kind(),
                });
            }
        }

        Ok(Self {
            dense,
            sparse,
            late_interaction,
        })
    }

    /// Returns the encoder registered for `kind`.
    pub fn encoder(&self, kind: RepresentationKind) -> &dyn RepresentationEncoder {
        match kind {
            RepresentationKind::Dense => self.dense.as_ref(),
            RepresentationKind::Sparse => self.sparse.as_ref(),
            RepresentationKind::LateInteraction => self.late_interaction.as_ref(),
        }
    }

    /// Encodes a passage with one backend.
    pub fn encode_passage(
        &self,
        kind: RepresentationKind,
        text: &str,
    ) -> Result<Representation, EncodingError> {
        self.encode_one(kind, text, Mode::Passage)
    }

    /// Encodes a query with one backend.
    pub fn encode_query(
        &self,
        kind: RepresentationKind,
        text: &str,
    ) -> Result<Representation, EncodingError> {
        self.encode_one(kind, text, Mode::Query)
    }

    /// Encodes a passage with all three backends concurrently.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn encode_passage_set(&self, text: &str) -> Result<RepresentationSet, EncodingError> {
        self.encode_set(text, Mode::Passage)
    }

    /// Encodes a query with all three backends concurrently.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn encode_query_set(&self, text: &str) -> Result<RepresentationSet, EncodingError> {
        self.encode_set(text, Mode::Query)
    }

    fn encode_one(
        &self,
        kind: RepresentationKind,
        text: &str,
        mode: Mode,
    ) -> Result<Representation, EncodingError> {
        if text.trim().is_empty() {
            return Err(EncodingError::EmptyInput { kind });
        }

        let encoder = self.encoder(kind);
        let representation = match mode {
            Mode::Passage => encoder.encode_passage(text)?,
            Mode::Query => encoder.encode_query(text)?,
        };

        if representation.kind() != kind {
            return Err(EncodingError::KindMismatch {
                expected: kind,
                actual: representation.kind(),
            });
        }
        if let Representation::LateInteraction(tokens) = &representation {
            if tokens.is_empty() {
                return Err(EncodingError::EmptyOutput {
                    kind,
                    reason: "no token vectors".to_string(),
                });
            }
        }

        Ok(representation)
    }

    fn encode_set(&self, text: &str, mode: Mode) -> Result<RepresentationSet, EncodingError> {
        // The three backends share nothing, so run them side by side
        let (dense, sparse, late) = std::thread::scope(|s| {
            let dense = s.spawn(|| self.encode_one(RepresentationKind::Dense, text, mode));
            let sparse = s.spawn(|| self.encode_one(RepresentationKind::Sparse, text, mode));
            let late = self.encode_one(RepresentationKind::LateInteraction, text, mode);
            (
                join_encoder(dense, RepresentationKind::Dense),
                join_encoder(sparse, RepresentationKind::Sparse),
                late,
            )
        });

        let set = RepresentationSet {
            dense: into_dense(dense?)?,
            sparse: into_sparse(sparse?)?,
            late_interaction: into_late(late?)?,
        };

        debug!(
            dense_dim = set.dense.len(),
            sparse_terms = set.sparse.len(),
            tokens = set.late_interaction.len(),
            "encoded text"
        );
        Ok(set)
    }
}

impl RepresentationSet {
    /// Checks dimensions against a collection schema.
    pub fn validate(&self, schema: &CollectionSchema) -> Result<(), EncodingError> {
        if self.dense.len() != schema.dense.dim {
            return Err(EncodingError::DimensionMismatch {
                kind: RepresentationKind::Dense,
                expected: schema.dense.dim,
                actual: self.dense.len(),
            });
        }
        let expected = schema.late_interaction.dim;
        if let Some(bad) = self.late_interaction.iter().find(|t| t.len() != expected) {
            return Err(EncodingError::DimensionMismatch {
                kind: RepresentationKind::LateInteraction,
                expected,
                actual: bad.len(),
            });
        }
        Ok(())
    }
}

fn join_encoder(
    handle: std::thread::ScopedJoinHandle<'_, Result<Representation, EncodingError>>,
    kind: RepresentationKind,
) -> Result<Representation, EncodingError> {
    handle.join().unwrap_or_else(|_| {
        Err(EncodingError::InferenceFailed {
            kind,
            reason: "encoder thread panicked".to_string(),
        })
    })
}

fn into_dense(rep: Representation) -> Result<Vec<f32>, EncodingError> {
    match rep {
        Representation::Dense(v) => Ok(v),
        other => Err(EncodingError::KindMismatch {
            expected: RepresentationKind::Dense,
            actual: other.kind(),
        }),
    }
}

fn into_sparse(rep: Representation) -> Result<SparseVector, EncodingError> {
    match rep {
        Representation::Sparse(v) => Ok(v),
        other => Err(EncodingError::KindMismatch {
            expected: RepresentationKind::Sparse,
            actual: other.kind(),
        }),
    }
}

fn into_late(rep: Representation) -> Result<Vec<Vec<f32>>, EncodingError> {
    match rep {
        Representation::LateInteraction(v) => Ok(v),
        other => Err(EncodingError::KindMismatch {
            expected: RepresentationKind::LateInteraction,
            actual: other.kind(),
        }),
    }
}
