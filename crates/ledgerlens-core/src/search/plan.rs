//! Query plan tree.
//!
//! A plan is built fresh for every query and never mutated afterwards. The
//! reference shape is a two-stage funnel:
//!
//! ```text
//! rerank using=late_interaction limit=3
//!   fuse rrf(k=60) limit=20
//!     recall using=dense limit=10
//!     recall using=sparse limit=10
//! ```
//!
//! Stores either evaluate the tree locally ([`execute_plan`](super::execute_plan))
//! or translate it into their own nested query language.

use crate::config::RetrievalConfig;
use crate::embedding::{Representation, RepresentationKind, RepresentationSet};
use serde::Serialize;
use std::fmt::Write;

/// How child rankings are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FusionMethod {
    /// Reciprocal rank fusion with constant `k`
    Rrf { k: usize },
}

/// One node of the plan tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum PlanNode {
    /// Best-first search of one representation space over the whole collection
    Recall {
        using: RepresentationKind,
        query: Representation,
        limit: usize,
    },
    /// Rank fusion of independent child rankings
    Fuse {
        inputs: Vec<PlanNode>,
        method: FusionMethod,
        limit: usize,
    },
    /// Re-scoring of the input candidates in another space
    Rerank {
        input: Box<PlanNode>,
        using: RepresentationKind,
        query: Representation,
        limit: usize,
    },
}

impl PlanNode {
    /// Result limit of this node.
    pub fn limit(&self) -> usize {
        match self {
            PlanNode::Recall { limit, .. }
            | PlanNode::Fuse { limit, .. }
            | PlanNode::Rerank { limit, .. } => *limit,
        }
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        // Writing to a String cannot fail
        let _ = match self {
            PlanNode::Recall {
                using,
                query,
                limit,
            } => writeln!(out, "{}recall using={} limit={} ({})", indent, using, limit, query.shape()),
            PlanNode::Fuse { method, limit, .. } => match method {
                FusionMethod::Rrf { k } => writeln!(out, "{}fuse rrf(k={}) limit={}", indent, k, limit),
            },
            PlanNode::Rerank {
                using,
                query,
                limit,
                ..
            } => writeln!(out, "{}rerank using={} limit={} ({})", indent, using, limit, query.shape()),
        };

        match self {
            PlanNode::Recall { .. } => {}
            PlanNode::Fuse { inputs, .. } => {
                for input in inputs {
                    input.write_outline(out, depth + 1);
                }
            }
            PlanNode::Rerank { input, .. } => input.write_outline(out, depth + 1),
        }
    }
}

/// An immutable, serializable retrieval plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub root: PlanNode,
}

impl QueryPlan {
    /// Builds the two-stage hybrid plan for an encoded query.
    ///
    /// Stage A recalls `inner_limit` candidates from the dense and sparse
    /// spaces and fuses them with RRF down to `outer_limit`; Stage B reranks
    /// the fused set by late interaction and keeps `final_limit`.
    pub fn two_stage(query: RepresentationSet, config: &RetrievalConfig, final_limit: usize) -> Self {
        let RepresentationSet {
            dense,
            sparse,
            late_interaction,
        } = query;

        let recall = |using, query| PlanNode::Recall {
            using,
            query,
            limit: config.inner_limit,
        };

        let fused = PlanNode::Fuse {
            inputs: vec![
                recall(RepresentationKind::Dense, Representation::Dense(dense)),
                recall(RepresentationKind::Sparse, Representation::Sparse(sparse)),
            ],
            method: FusionMethod::Rrf { k: config.rrf_k },
            limit: config.outer_limit,
        };

        Self {
            root: PlanNode::Rerank {
                input: Box::new(fused),
                using: RepresentationKind::LateInteraction,
                query: Representation::LateInteraction(late_interaction),
                limit: final_limit,
            },
        }
    }

    /// Indented one-line-per-node description, for `--explain` and logs.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.root.write_outline(&mut out, 0);
        out
    }
}
