//! Presentation of final ranked results.

use super::types::{Candidate, ChunkId};
use serde::Serialize;

/// A final result with its score normalized into `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub id: ChunkId,
    /// Score relative to the best result; the top result is exactly `1.0`
    pub normalized_score: f32,
    pub text: String,
    pub source: String,
}

impl RankedResult {
    /// First `max_chars` characters of the text, with `...` when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            self.text.clone()
        } else {
            let prefix: String = self.text.chars().take(max_chars).collect();
            format!("{}...", prefix)
        }
    }
}

/// Normalizes best-first candidates against the top score.
///
/// With a positive top score each result reports `score / max`; results at
/// or below zero are clamped to `f32::MIN_POSITIVE` so every score stays in
/// `(0, 1]`. When no score is positive the set is mapped with
/// `1 / (1 + (max - score))`, which keeps order and pins the top at `1.0`.
/// An empty input yields an empty output.
pub fn normalize_scores(candidates: &[Candidate]) -> Vec<RankedResult> {
    let Some(max) = candidates
        .iter()
        .map(|c| c.score)
        .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |m| m.max(s))))
    else {
        return Vec::new();
    };

    let scale = |score: f32| -> f32 {
        if max > 0.0 {
            (score / max).max(f32::MIN_POSITIVE)
        } else {
            1.0 / (1.0 + (max - score))
        }
    };

    candidates
        .iter()
        .map(|c| RankedResult {
            id: c.id,
            normalized_score: scale(c.score),
            text: c.payload.text.clone(),
            source: c.payload.source.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::Payload;

    fn candidate(id: u128, score: f32) -> Candidate {
        Candidate {
            id: ChunkId::from_u128(id),
            score,
            payload: Payload {
                text: "Liquidity risk is the risk that the company cannot meet obligations."
                    .to_string(),
                source: "10-K".to_string(),
            },
        }
    }

    #[test]
    fn test_normalize_divides_by_max() {
        let results = normalize_scores(&[candidate(1, 20.0), candidate(2, 15.0), candidate(3, 5.0)]);
        assert_eq!(results[0].normalized_score, 1.0);
        assert!((results[1].normalized_score - 0.75).abs() < 1e-6);
        assert!((results[2].normalized_score - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_score_keeps_ratio_for_others() {
        let results = normalize_scores(&[candidate(1, 20.0), candidate(2, 15.0), candidate(3, 0.0)]);
        assert_eq!(results[0].normalized_score, 1.0);
        assert!((results[1].normalized_score - 0.75).abs() < 1e-6);
        assert!(results[2].normalized_score > 0.0);
        assert!(results[2].normalized_score < 1e-6);
    }

    #[test]
    fn test_normalize_all_non_positive() {
        let results = normalize_scores(&[candidate(1, -0.5), candidate(2, -1.5)]);
        assert_eq!(results[0].normalized_score, 1.0);
        assert!((results[1].normalized_score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_normalize_single_result_is_one() {
        let results = normalize_scores(&[candidate(1, 3.2)]);
        assert_eq!(results[0].normalized_score, 1.0);
    }

    #[test]
    fn test_normalize_non_positive_scores_stay_in_range() {
        let results = normalize_scores(&[candidate(1, 0.4), candidate(2, 0.0), candidate(3, -1.5)]);
        assert_eq!(results[0].normalized_score, 1.0);
        for pair in results.windows(2) {
            assert!(pair[0].normalized_score >= pair[1].normalized_score);
        }
        for r in &results {
            assert!(r.normalized_score > 0.0 && r.normalized_score <= 1.0);
        }
    }

    #[test]
    fn test_excerpt() {
        let result = &normalize_scores(&[candidate(1, 1.0)])[0];
        assert_eq!(result.excerpt(9), "Liquidity...");
        assert_eq!(result.excerpt(500), result.text);
    }
}
