//! Local evaluation of query plans over a collection snapshot.
//!
//! Recall nodes are exact scans (every point is scored), so a channel's
//! ranking is the true best-first order under its metric. Fusion children
//! run on scoped threads; they share only the immutable snapshot.

use super::fusion::rrf_merge;
use super::plan::{FusionMethod, PlanNode, QueryPlan};
use super::rerank::maxsim_rerank;
use super::types::{sort_best_first, Candidate, ChunkId, IndexRecord};
use crate::config::CollectionSchema;
use crate::embedding::{cosine, maxsim, Representation, RepresentationKind, RepresentationSet};
use crate::error::QueryStage;
use crate::storage::StoreError;
use std::collections::BTreeMap;
use tracing::debug;

/// Immutable view of one collection's points.
///
/// Stores hand out a snapshot per query so Stage A and Stage B see the same
/// points even while indexing continues.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub schema: CollectionSchema,
    pub points: BTreeMap<ChunkId, IndexRecord>,
}

impl CollectionSnapshot {
    pub fn new(schema: CollectionSchema) -> Self {
        Self {
            schema,
            points: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn candidate(&self, id: ChunkId, score: f32) -> Option<Candidate> {
        self.points.get(&id).map(|record| Candidate {
            id,
            score,
            payload: record.payload.clone(),
        })
    }
}

/// Evaluates a plan against a snapshot, returning best-first candidates.
pub fn execute_plan(
    snapshot: &CollectionSnapshot,
    plan: &QueryPlan,
) -> Result<Vec<Candidate>, StoreError> {
    evaluate(snapshot, &plan.root)
}

fn evaluate(snapshot: &CollectionSnapshot, node: &PlanNode) -> Result<Vec<Candidate>, StoreError> {
    match node {
        PlanNode::Recall {
            using,
            query,
            limit,
        } => recall(snapshot, *using, query, *limit),
        PlanNode::Fuse {
            inputs,
            method,
            limit,
        } => fuse(snapshot, inputs, *method, *limit),
        PlanNode::Rerank {
            input,
            using,
            query,
            limit,
        } => {
            let candidates = evaluate(snapshot, input)?;
            if candidates.is_empty() {
                debug!("Rerank input is empty, skipping");
                return Ok(candidates);
            }
            rerank(snapshot, candidates, *using, query, *limit)
        }
    }
}

/// Checks that the query matches the space it is sent to.
fn check_query(
    schema: &CollectionSchema,
    using: RepresentationKind,
    query: &Representation,
    stage: QueryStage,
) -> Result<(), StoreError> {
    if query.kind() != using {
        return Err(StoreError::Execution {
            stage,
            message: format!("{} query sent to the {} space", query.kind(), using),
        });
    }

    let expected = schema.space(using).dim;
    let actual = match query {
        Representation::Dense(v) => Some(v.len()),
        Representation::Sparse(_) => None,
        Representation::LateInteraction(tokens) => tokens
            .iter()
            .map(Vec::len)
            .find(|&len| len != expected)
            .or(Some(expected)),
    };

    match actual {
        Some(actual) if actual != expected => Err(StoreError::Execution {
            stage,
            message: format!(
                "{} query has dimension {}, space '{}' expects {}",
                using,
                actual,
                schema.space(using).name,
                expected
            ),
        }),
        _ => Ok(()),
    }
}

/// Scores one point under the query's comparator.
fn score_point(query: &Representation, vectors: &RepresentationSet) -> Option<f32> {
    match query {
        Representation::Dense(q) => Some(cosine(q, &vectors.dense)),
        Representation::Sparse(q) => q.dot(&vectors.sparse),
        Representation::LateInteraction(q) => Some(maxsim(q, &vectors.late_interaction)),
    }
}

fn recall(
    snapshot: &CollectionSnapshot,
    using: RepresentationKind,
    query: &Representation,
    limit: usize,
) -> Result<Vec<Candidate>, StoreError> {
    check_query(&snapshot.schema, using, query, QueryStage::Recall)?;

    let mut scored: Vec<(ChunkId, f32)> = snapshot
        .points
        .iter()
        .filter_map(|(id, record)| score_point(query, &record.vectors).map(|s| (*id, s)))
        .collect();
    sort_best_first(&mut scored, |(id, score)| (*score, *id));
    scored.truncate(limit);

    debug!("Recall using={} returned {} candidates", using, scored.len());

    Ok(scored
        .into_iter()
        .filter_map(|(id, score)| snapshot.candidate(id, score))
        .collect())
}

fn fuse(
    snapshot: &CollectionSnapshot,
    inputs: &[PlanNode],
    method: FusionMethod,
    limit: usize,
) -> Result<Vec<Candidate>, StoreError> {
    // Channels are independent reads of the same snapshot
    let rankings: Vec<Result<Vec<Candidate>, StoreError>> = std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|input| s.spawn(move || evaluate(snapshot, input)))
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(StoreError::Execution {
                        stage: QueryStage::Fusion,
                        message: "Recall channel panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let lists: Vec<Vec<ChunkId>> = rankings
        .into_iter()
        .map(|ranking| ranking.map(|candidates| candidates.into_iter().map(|c| c.id).collect()))
        .collect::<Result<_, _>>()?;

    let FusionMethod::Rrf { k } = method;
    let mut fused = rrf_merge(&lists, k);
    fused.truncate(limit);

    Ok(fused
        .into_iter()
        .filter_map(|(id, score)| snapshot.candidate(id, score))
        .collect())
}

fn rerank(
    snapshot: &CollectionSnapshot,
    candidates: Vec<Candidate>,
    using: RepresentationKind,
    query: &Representation,
    limit: usize,
) -> Result<Vec<Candidate>, StoreError> {
    check_query(&snapshot.schema, using, query, QueryStage::Rerank)?;

    let mut reranked = match query {
        Representation::LateInteraction(query_tokens) => {
            maxsim_rerank(candidates, query_tokens, |id| {
                snapshot
                    .points
                    .get(id)
                    .map(|record| record.vectors.late_interaction.as_slice())
            })
        }
        _ => {
            let mut rescored: Vec<Candidate> = candidates
                .into_iter()
                .filter_map(|mut c| {
                    let record = snapshot.points.get(&c.id)?;
                    c.score = score_point(query, &record.vectors)?;
                    Some(c)
                })
                .collect();
            sort_best_first(&mut rescored, |c| (c.score, c.id));
            rescored
        }
    };

    reranked.truncate(limit);
    Ok(reranked)
}
