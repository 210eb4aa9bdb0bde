//! Representation types and their similarity functions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three complementary encodings of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentationKind {
    Dense,
    Sparse,
    LateInteraction,
}

impl RepresentationKind {
    /// All kinds in canonical order.
    pub const ALL: [RepresentationKind; 3] = [
        RepresentationKind::Dense,
        RepresentationKind::Sparse,
        RepresentationKind::LateInteraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepresentationKind::Dense => "dense",
            RepresentationKind::Sparse => "sparse",
            RepresentationKind::LateInteraction => "late_interaction",
        }
    }
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sparse term-weight vector (non-zero entries only).
///
/// Indices are kept sorted ascending and unique so that the dot product is a
/// linear merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Builds a sparse vector from arbitrary (index, weight) pairs.
    ///
    /// Duplicate indices keep the first weight seen; zero weights are dropped.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, f32)>,
    {
        let mut entries: Vec<(u32, f32)> =
            pairs.into_iter().filter(|(_, value)| *value != 0.0).collect();
        // Stable sort, so dedup keeps the first weight per index
        entries.sort_by_key(|(i, _)| *i);
        entries.dedup_by_key(|(i, _)| *i);

        let (indices, values) = entries.into_iter().unzip();
        Self { indices, values }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sparse dot product. Returns `None` when no index is shared.
    pub fn dot(&self, other: &SparseVector) -> Option<f32> {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        let mut overlap = false;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    overlap = true;
                    i += 1;
                    j += 1;
                }
            }
        }
        overlap.then_some(sum)
    }
}

/// One encoding of a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "vector", rename_all = "snake_case")]
pub enum Representation {
    /// Fixed-length real vector, compared by cosine similarity
    Dense(Vec<f32>),
    /// Term weights, compared by sparse dot product
    Sparse(SparseVector),
    /// Ordered token vectors, compared by MaxSim
    LateInteraction(Vec<Vec<f32>>),
}

impl Representation {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            Representation::Dense(_) => RepresentationKind::Dense,
            Representation::Sparse(_) => RepresentationKind::Sparse,
            Representation::LateInteraction(_) => RepresentationKind::LateInteraction,
        }
    }

    /// Scores `other` against `self` with the comparator of this kind.
    ///
    /// Returns `None` for mismatched kinds and for sparse vectors without a
    /// shared term.
    pub fn similarity(&self, other: &Representation) -> Option<f32> {
        match (self, other) {
            (Representation::Dense(a), Representation::Dense(b)) => Some(cosine(a, b)),
            (Representation::Sparse(a), Representation::Sparse(b)) => a.dot(b),
            (Representation::LateInteraction(q), Representation::LateInteraction(d)) => {
                Some(maxsim(q, d))
            }
            _ => None,
        }
    }

    /// Short human-readable shape, e.g. `384 dims` or `32 tokens`.
    pub fn shape(&self) -> String {
        match self {
            Representation::Dense(v) => format!("{} dims", v.len()),
            Representation::Sparse(s) => format!("{} terms", s.len()),
            Representation::LateInteraction(t) => format!("{} tokens", t.len()),
        }
    }
}

/// Exactly one representation of each kind, for a chunk or a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentationSet {
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
    pub late_interaction: Vec<Vec<f32>>,
}

impl RepresentationSet {
    /// Returns the representation of the requested kind as a tagged value.
    pub fn get(&self, kind: RepresentationKind) -> Representation {
        match kind {
            RepresentationKind::Dense => Representation::Dense(self.dense.clone()),
            RepresentationKind::Sparse => Representation::Sparse(self.sparse.clone()),
            RepresentationKind::LateInteraction => {
                Representation::LateInteraction(self.late_interaction.clone())
            }
        }
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity; zero vectors score `0.0`.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Late-interaction score: for each query token take the best dot product
/// against any document token, then sum over query tokens.
///
/// Independent of document token order. An empty document scores `0.0`.
pub fn maxsim(query_tokens: &[Vec<f32>], doc_tokens: &[Vec<f32>]) -> f32 {
    if doc_tokens.is_empty() {
        return 0.0;
    }
    query_tokens
        .iter()
        .map(|q| {
            doc_tokens
                .iter()
                .map(|d| dot(q, d))
                .fold(f32::NEG_INFINITY, f32::max)
        })
        .sum()
}

/// Scales a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = dot(v, v).sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
