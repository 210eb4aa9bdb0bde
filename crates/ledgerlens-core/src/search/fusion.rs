// Reciprocal Rank Fusion (RRF) algorithm

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Standard RRF k parameter value from academic literature.
///
/// This constant (60) is the recommended value from the original RRF paper:
/// "Reciprocal Rank Fusion outperforms Condorcet and individual Rank Learning Methods"
/// by Cormack, Clarke, and Buettcher (SIGIR 2009).
///
/// - Smaller k → more emphasis on top results
/// - Larger k → more uniform weighting across ranks
pub use crate::config::RRF_K;

/// Merges any number of best-first ranked lists using RRF.
///
/// RRF Formula: RRF_score(d) = sum_{r} 1 / (k + rank_r(d))
///
/// Where:
/// - d is an item appearing in at least one list
/// - rank_r(d) is the 1-indexed position of d in list r
/// - lists that do not contain d contribute nothing
///
/// Only ranks are used; the channels' own scores never enter the formula. If
/// an item repeats within one list, its first position counts. The output is
/// sorted by fused score descending with ties broken by ascending item order,
/// so the result does not depend on the order of `lists`.
pub fn rrf_merge<T: Clone + Eq + Hash + Ord>(lists: &[Vec<T>], k: usize) -> Vec<(T, f32)> {
    let k_param = k as f64;

    // Accumulate in f64 so that summation order does not leak into the result
    let mut rrf_scores: HashMap<T, f64> = HashMap::new();

    for list in lists {
        let mut seen: HashSet<&T> = HashSet::with_capacity(list.len());
        for (rank, item) in list.iter().enumerate() {
            if !seen.insert(item) {
                continue;
            }
            let rank_position = (rank + 1) as f64; // 1-indexed
            *rrf_scores.entry(item.clone()).or_insert(0.0) += 1.0 / (k_param + rank_position);
        }
    }

    let mut combined: Vec<(T, f32)> = rrf_scores
        .into_iter()
        .map(|(item, score)| (item, score as f32))
        .collect();
    combined.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn score_of(fused: &[(i32, f32)], id: i32) -> f32 {
        fused
            .iter()
            .find(|(item, _)| *item == id)
            .map(|(_, s)| *s)
            .unwrap()
    }

    #[test]
    fn test_rrf() {
        // Dense and sparse channels
        let dense = vec![1, 2, 3];
        let sparse = vec![3, 1, 4];

        let fused = rrf_merge(&[dense, sparse], RRF_K);

        // Doc 1 (ranks 1, 2) and doc 3 (ranks 3, 1) appear in both lists
        assert_eq!(fused.len(), 4);
        let top_ids: Vec<i32> = fused.iter().take(2).map(|(id, _)| *id).collect();
        assert!(top_ids.contains(&1));
        assert!(top_ids.contains(&3));
    }

    #[test]
    fn test_rrf_exact_score() {
        // Ranks 1 and 2 with k=60
        let fused = rrf_merge(&[vec![7, 8], vec![8, 7]], 60);
        let expected = (1.0f64 / 61.0 + 1.0 / 62.0) as f32;
        assert_eq!(score_of(&fused, 7), expected);
        assert_eq!(score_of(&fused, 8), expected);
    }

    #[test]
    fn test_rrf_single_list_contribution() {
        let fused = rrf_merge(&[vec![5, 6, 9]], 60);
        assert_eq!(score_of(&fused, 9), (1.0f64 / 63.0) as f32);
    }

    #[test]
    fn test_rrf_empty_inputs() {
        let fused = rrf_merge(&[vec![], vec![1, 2]], RRF_K);

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].0, 1);
    }

    #[test]
    fn test_rrf_both_empty() {
        let fused: Vec<(i32, f32)> = rrf_merge(&[vec![], vec![]], RRF_K);
        assert!(fused.is_empty());

        let none: Vec<(i32, f32)> = rrf_merge(&[], RRF_K);
        assert!(none.is_empty());
    }

    #[test]
    fn test_rrf_single_ranker() {
        let fused = rrf_merge(&[vec![1, 2, 3]], RRF_K);

        // With only one ranker, should preserve original order
        let ids: Vec<i32> = fused.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rrf_ties_broken_by_id() {
        // Swapped ranks give identical scores
        let fused = rrf_merge(&[vec![9, 4], vec![4, 9]], RRF_K);
        let ids: Vec<i32> = fused.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn test_rrf_absent_ids_excluded() {
        let fused = rrf_merge(&[vec![1, 3], vec![3, 5]], RRF_K);
        let ids: Vec<i32> = fused.iter().map(|(id, _)| *id).collect();
        assert!(!ids.contains(&2));
        assert!(!ids.contains(&4));
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_rrf_duplicate_in_list_counts_once() {
        let fused = rrf_merge(&[vec![1, 1, 2]], 60);
        assert_eq!(score_of(&fused, 1), (1.0f64 / 61.0) as f32);
        assert_eq!(score_of(&fused, 2), (1.0f64 / 63.0) as f32);
    }

    #[test]
    fn test_rrf_k_parameter_impact() {
        let lists = [vec![1, 2], vec![1, 3]];

        let small_k = rrf_merge(&lists, 1);
        let large_k = rrf_merge(&lists, 100);

        // Smaller k widens the gap between rank 1 and rank 2
        let gap = |fused: &[(i32, f32)]| score_of(fused, 1) - score_of(fused, 2);
        assert!(gap(&small_k) > gap(&large_k));
    }

    proptest! {
        #[test]
        fn prop_rrf_commutative_in_channel_order(
            a in proptest::collection::vec(0u8..40, 0..15),
            b in proptest::collection::vec(0u8..40, 0..15),
        ) {
            let ab = rrf_merge(&[a.clone(), b.clone()], RRF_K);
            let ba = rrf_merge(&[b, a], RRF_K);
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn prop_rrf_only_listed_ids(
            a in proptest::collection::vec(0u8..40, 0..15),
            b in proptest::collection::vec(0u8..40, 0..15),
        ) {
            let fused = rrf_merge(&[a.clone(), b.clone()], RRF_K);
            for (id, score) in &fused {
                prop_assert!(a.contains(id) || b.contains(id));
                prop_assert!(*score > 0.0);
            }
        }
    }
}
