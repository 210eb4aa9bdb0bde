//! Hybrid query planner: encode, plan, execute.

use super::plan::QueryPlan;
use super::presenter::{normalize_scores, RankedResult};
use super::types::Candidate;
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingAdapter;
use crate::error::QueryError;
use crate::storage::VectorStore;
use instant::Instant;
use tracing::{debug, info, instrument};

/// Builds and runs the two-stage hybrid retrieval plan.
///
/// The planner holds references to explicitly constructed services (adapter
/// and store), so tests can substitute hashed encoders and the in-memory
/// store.
///
/// # Example
///
/// ```ignore
/// let planner = HybridQueryPlanner::new(&adapter, &store, "financial");
/// let results = planner.search("What are the main financial risks?", 3).await?;
/// for r in results {
///     println!("{:.3} {}", r.normalized_score, r.excerpt(100));
/// }
/// ```
pub struct HybridQueryPlanner<'a, S: VectorStore + ?Sized> {
    adapter: &'a EmbeddingAdapter,
    store: &'a S,
    collection: String,
    config: RetrievalConfig,
}

impl<'a, S: VectorStore + ?Sized> HybridQueryPlanner<'a, S> {
    /// Creates a planner with the default retrieval configuration.
    pub fn new(adapter: &'a EmbeddingAdapter, store: &'a S, collection: impl Into<String>) -> Self {
        Self {
            adapter,
            store,
            collection: collection.into(),
            config: RetrievalConfig::default(),
        }
    }

    /// Overrides RRF `k` and the stage limits.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Encodes the query and builds its plan without touching the store.
    ///
    /// Encoding is synchronous CPU work; async callers should run it off
    /// their executor's worker threads.
    ///
    /// # Errors
    ///
    /// `QueryError::InvalidQuery` for blank text or a zero `final_limit`;
    /// `QueryError::Encoding` if any of the three encodings fails.
    #[instrument(skip_all, fields(final_limit = final_limit))]
    pub fn plan(&self, query_text: &str, final_limit: usize) -> Result<QueryPlan, QueryError> {
        if query_text.trim().is_empty() {
            return Err(QueryError::InvalidQuery("query text is empty".to_string()));
        }
        if final_limit == 0 {
            return Err(QueryError::InvalidQuery(
                "final_limit must be at least 1".to_string(),
            ));
        }

        let encoded = self.adapter.encode_query_set(query_text)?;
        let plan = QueryPlan::two_stage(encoded, &self.config, final_limit);
        debug!("Query plan:\n{}", plan.outline());
        Ok(plan)
    }

    /// Runs a previously built plan against the collection.
    pub async fn execute(&self, plan: &QueryPlan) -> Result<Vec<Candidate>, QueryError> {
        Ok(self.store.query(&self.collection, plan).await?)
    }

    /// Plans and executes a query, returning best-first candidates.
    ///
    /// An empty collection yields `Ok(vec![])`.
    #[instrument(skip_all, fields(collection = %self.collection, final_limit = final_limit))]
    pub async fn plan_and_execute(
        &self,
        query_text: &str,
        final_limit: usize,
    ) -> Result<Vec<Candidate>, QueryError> {
        let start = Instant::now();
        let plan = self.plan(query_text, final_limit)?;
        let candidates = self.execute(&plan).await?;

        info!(
            "Query returned {} results in {:.1}ms",
            candidates.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(candidates)
    }

    /// Like [`plan_and_execute`](Self::plan_and_execute), with scores
    /// normalized for presentation.
    pub async fn search(
        &self,
        query_text: &str,
        final_limit: usize,
    ) -> Result<Vec<RankedResult>, QueryError> {
        let candidates = self.plan_and_execute(query_text, final_limit).await?;
        Ok(normalize_scores(&candidates))
    }
}
