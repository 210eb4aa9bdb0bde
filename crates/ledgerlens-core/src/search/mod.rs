//! Hybrid retrieval: query planning, fusion, and late-interaction rerank.
//!
//! A query runs through a two-stage funnel:
//!
//! - **Stage A (recall)**: dense nearest-neighbour search and sparse lexical
//!   search, each returning its own best-first list
//! - **Stage A fusion**: Reciprocal Rank Fusion, `score = Σ 1 / (k + rank)`
//!   with k=60, merging the two lists without score normalization
//! - **Stage B (rerank)**: the fused set is re-scored by MaxSim over
//!   ColBERT token vectors; this score is final
//!
//! Final scores are divided by the best score for presentation.
//!
//! # Architecture
//!
//! - `types`: Core types (ChunkId, Payload, IndexRecord, Candidate)
//! - `plan`: Tagged plan tree (recall, fuse, rerank) and the two-stage builder
//! - `planner`: HybridQueryPlanner (encode query, build plan, hand to the store)
//! - `executor`: Local plan evaluation over a collection snapshot
//! - `fusion`: Reciprocal Rank Fusion
//! - `rerank`: MaxSim rerank
//! - `presenter`: Score normalization and RankedResult
//!
//! # Usage
//!
//! ```ignore
//! use ledgerlens_core::search::HybridQueryPlanner;
//! use ledgerlens_core::storage::InMemoryVectorStore;
//!
//! let store = InMemoryVectorStore::new();
//! // ... index chunks with ChunkIndexer ...
//! let planner = HybridQueryPlanner::new(&adapter, &store, "financial");
//! let results = planner.search("What is the liquidity risk?", 3).await?;
//! ```

pub mod types;

mod executor;
mod plan;
mod planner;
mod presenter;

// Scoring math, callable on its own for testing and benchmarking
pub mod fusion;
pub mod rerank;

pub use executor::{execute_plan, CollectionSnapshot};
pub use fusion::{rrf_merge, RRF_K};
pub use plan::{FusionMethod, PlanNode, QueryPlan};
pub use planner::HybridQueryPlanner;
pub use presenter::{normalize_scores, RankedResult};
pub use rerank::maxsim_rerank;
pub use types::{Candidate, ChunkId, IndexRecord, Payload};
