//! Embedding backends and the adapter that unifies them.
//!
//! Every chunk and every query is encoded three ways:
//!
//! | Kind | Backend | Comparator |
//! |------|---------|------------|
//! | Dense | [`BertDenseEncoder`] (MiniLM, 384-d) | cosine |
//! | Sparse | [`Bm25SparseEncoder`] | sparse dot product |
//! | Late interaction | [`ColbertEncoder`] (128-d per token) | MaxSim |
//!
//! ## Core Traits
//!
//! - [`RepresentationEncoder`] - one backend, passage and query mode
//! - [`AssetLoader`] - loading model config, weights, and tokenizer bytes
//!
//! ## Offline Encoders
//!
//! [`HashedDenseEncoder`] and [`HashedTokenEncoder`] are deterministic
//! feature-hashing stand-ins for the two neural backends, used in tests and
//! for `--hashed` CLI runs.
//!
//! ## Example
//!
//! ```ignore
//! use ledgerlens_core::embedding::*;
//!
//! let dense = BertDenseEncoder::from_assets(&ModelAssets::load(&minilm_loader).await?)?;
//! let colbert = ColbertEncoder::from_assets(&ModelAssets::load(&colbert_loader).await?)?;
//!
//! let adapter = EmbeddingAdapter::new(
//!     Arc::new(dense),
//!     Arc::new(Bm25SparseEncoder::new()),
//!     Arc::new(colbert),
//! )?;
//! let query = adapter.encode_query_set("What are the main financial risks?")?;
//! ```

mod adapter;
mod colbert;
mod hashed;
mod sparse;
mod traits;

pub mod model;
pub mod tokenizer;
pub mod types;

pub use adapter::EmbeddingAdapter;
pub use colbert::ColbertEncoder;
pub use hashed::{HashedDenseEncoder, HashedTokenEncoder};
pub use model::{select_device, BertDenseEncoder, ModelAssets};
pub use sparse::Bm25SparseEncoder;
pub use tokenizer::TokenizerHandle;
pub use traits::{AssetLoader, RepresentationEncoder};
pub use types::{
    cosine, maxsim, Representation, RepresentationKind, RepresentationSet, SparseVector,
};
