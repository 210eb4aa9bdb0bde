// Late-interaction (MaxSim) rerank of a fused candidate set

use super::types::{sort_best_first, Candidate, ChunkId};
use crate::embedding::maxsim;
use tracing::debug;

/// Re-scores candidates by MaxSim against the query's token vectors.
///
/// `doc_tokens` resolves a candidate id to its stored token vectors. The
/// MaxSim score replaces the fused score and is authoritative. Candidates
/// whose token vectors cannot be resolved are dropped. The result is sorted
/// by score descending with ties broken by ascending id.
///
/// # Example
///
/// ```ignore
/// let tokens: HashMap<ChunkId, Vec<Vec<f32>>> = load_tokens(&candidates);
/// let reranked = maxsim_rerank(candidates, &query_tokens, |id| {
///     tokens.get(id).map(Vec::as_slice)
/// });
/// ```
pub fn maxsim_rerank<'a, F>(
    candidates: Vec<Candidate>,
    query_tokens: &[Vec<f32>],
    doc_tokens: F,
) -> Vec<Candidate>
where
    F: Fn(&ChunkId) -> Option<&'a [Vec<f32>]>,
{
    let mut rescored: Vec<Candidate> = candidates
        .into_iter()
        .filter_map(|mut candidate| match doc_tokens(&candidate.id) {
            Some(tokens) => {
                candidate.score = maxsim(query_tokens, tokens);
                Some(candidate)
            }
            None => {
                debug!("Dropping candidate {} without token vectors", candidate.id);
                None
            }
        })
        .collect();

    sort_best_first(&mut rescored, |c| (c.score, c.id));
    rescored
}
