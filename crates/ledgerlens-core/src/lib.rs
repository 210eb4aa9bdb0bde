//! # LedgerLens Core
//!
//! Multi-representation indexing and hybrid retrieval over financial filings.
//!
//! Every chunk of a document is stored with three representations: a dense
//! sentence embedding, a sparse BM25 term vector, and a set of ColBERT token
//! vectors. A query recalls candidates with dense and sparse search, fuses the
//! two lists with Reciprocal Rank Fusion, then reranks the fused set by MaxSim
//! over the token vectors.
//!
//! ## Modules
//!
//! - [`embedding`] - Encoders and the adapter that unifies them
//! - [`chunking`] - Text and markdown chunking (text-splitter)
//! - [`indexing`] - Chunk indexer and document pipeline
//! - [`search`] - Query plans, fusion, rerank, and result presentation
//! - [`storage`] - Vector store trait and engines (memory, redb, Qdrant)
//! - [`filings`] - SEC EDGAR 10-K / 10-Q retrieval
//! - [`config`] - Production constants, collection schema, retrieval limits
//! - [`error`] - Error types for each stage

#![forbid(unsafe_code)]

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod filings;
pub mod indexing;
pub mod search;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_utils;
