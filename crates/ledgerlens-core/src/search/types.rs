use crate::embedding::RepresentationSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique chunk identifier.
///
/// A random 128-bit (UUID v4) value assigned once at index time. It is the
/// only join key between candidates, stored vectors, and payloads. Ordering
/// is by the 128-bit value and is used to break score ties.
///
/// # Examples
///
/// ```
/// use ledgerlens_core::search::ChunkId;
///
/// let id = ChunkId::new();
/// assert_ne!(id, ChunkId::new());
/// assert_eq!(ChunkId::from_u128(id.as_u128()), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(Uuid);

impl ChunkId {
    /// Generates a new random identifier.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an ID from a raw 128-bit value (storage keys, tests).
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Returns the raw 128-bit value.
    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ChunkId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Data stored alongside the vectors of a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Chunk text
    pub text: String,
    /// Originating document (path, URL, or filing id)
    pub source: String,
}

/// One point in the index: identifier, all three representations, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: ChunkId,
    pub vectors: RepresentationSet,
    pub payload: Payload,
}

/// A scored hit produced while evaluating one query. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: ChunkId,
    pub score: f32,
    pub payload: Payload,
}

/// Sorts best-first: score descending, ties by identifier ascending.
pub fn sort_best_first<T>(items: &mut [T], key: impl Fn(&T) -> (f32, ChunkId)) {
    items.sort_by(|a, b| {
        let (score_a, id_a) = key(a);
        let (score_b, id_b) = key(b);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| id_a.cmp(&id_b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_ordering_follows_value() {
        assert!(ChunkId::from_u128(1) < ChunkId::from_u128(2));
        assert!(ChunkId::from_u128(u128::MAX) > ChunkId::from_u128(1 << 64));
    }

    #[test]
    fn test_chunk_id_serializes_as_uuid_string() {
        let id = ChunkId::from_u128(0x1234);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000001234\"");
        let back: ChunkId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_sort_best_first_breaks_ties_by_id() {
        let mut items = vec![
            (ChunkId::from_u128(3), 0.5),
            (ChunkId::from_u128(1), 0.5),
            (ChunkId::from_u128(2), 0.9),
        ];
        sort_best_first(&mut items, |(id, s)| (*s, *id));
        let ids: Vec<u128> = items.iter().map(|(id, _)| id.as_u128()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
