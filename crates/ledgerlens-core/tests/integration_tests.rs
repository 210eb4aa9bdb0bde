//! End-to-end tests for the indexing and hybrid query pipeline.
//!
//! These tests exercise the full workflow:
//! 1. Indexing: chunking → three-way encoding → upsert
//! 2. Search: query encoding → dense + sparse recall → RRF → MaxSim rerank →
//!    score normalization
//!
//! They run offline with the hashed encoders and the in-memory store; the
//! redb round trip is covered when the `redb-store` feature is enabled.

use ledgerlens_core::chunking::{create_chunker, FileType, TextChunk, WordSizer};
use ledgerlens_core::config::{CollectionSchema, ProvisionPolicy, RetrievalConfig};
use ledgerlens_core::embedding::{
    Bm25SparseEncoder, EmbeddingAdapter, HashedDenseEncoder, HashedTokenEncoder, Representation,
    RepresentationEncoder, RepresentationKind,
};
use ledgerlens_core::error::{EncodingError, QueryError};
use ledgerlens_core::indexing::{ChunkIndexer, IndexingPipeline};
use ledgerlens_core::search::{execute_plan, HybridQueryPlanner, PlanNode, QueryPlan};
use ledgerlens_core::storage::{InMemoryVectorStore, VectorStore};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

const COLLECTION: &str = "financial";

const RISK_FACTORS: &[&str] = &[
    "Liquidity risk is the risk that the company cannot meet its short-term obligations when they come due.",
    "Market risk arises from changes in interest rates and foreign currency exchange rates.",
    "Credit risk is the possibility of loss from a counterparty failing to meet contractual obligations.",
    "The company designs, manufactures and markets smartphones and personal computers.",
    "Revenue increased eight percent, driven by growth in services.",
];

fn hashed_adapter() -> EmbeddingAdapter {
    EmbeddingAdapter::new(
        Arc::new(HashedDenseEncoder::new(384)),
        Arc::new(Bm25SparseEncoder::new()),
        Arc::new(HashedTokenEncoder::new(128)),
    )
    .expect("hashed encoders fit their slots")
}

/// Lays texts out as consecutive chunks of one document.
fn chunks(texts: &[&str]) -> Vec<TextChunk> {
    let mut start = 0;
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let chunk = TextChunk {
                index,
                text: text.to_string(),
                start,
                end: start + text.len(),
                section: None,
            };
            start = chunk.end + 2;
            chunk
        })
        .collect()
}

async fn indexed_store(adapter: &EmbeddingAdapter) -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new();
    let indexer = ChunkIndexer::new(adapter, &store, CollectionSchema::named(COLLECTION));
    indexer.provision(ProvisionPolicy::Recreate).await.unwrap();
    let report = indexer.index(&chunks(RISK_FACTORS), "AAPL_10-K.md").await.unwrap();
    assert_eq!(report.written, RISK_FACTORS.len());
    store
}

/// Late-interaction encoder that fails on passages containing a marker.
struct FailingTokenEncoder {
    inner: HashedTokenEncoder,
    marker: &'static str,
}

impl RepresentationEncoder for FailingTokenEncoder {
    fn kind(&self) -> RepresentationKind {
        RepresentationKind::LateInteraction
    }

    fn model_id(&self) -> &str {
        "failing-tokens"
    }

    fn encode_passage(&self, text: &str) -> Result<Representation, EncodingError> {
        if text.contains(self.marker) {
            return Err(EncodingError::InferenceFailed {
                kind: RepresentationKind::LateInteraction,
                reason: "simulated backend outage".to_string(),
            });
        }
        self.inner.encode_passage(text)
    }

    fn encode_query(&self, text: &str) -> Result<Representation, EncodingError> {
        self.inner.encode_query(text)
    }
}

// ============================================================================
// Retrieval
// ============================================================================

#[tokio::test]
async fn test_liquidity_query_ranks_liquidity_chunk_first() {
    let adapter = hashed_adapter();
    let store = indexed_store(&adapter).await;
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);

    let results = planner.search("What is the liquidity risk?", 3).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].text.starts_with("Liquidity risk"));
    assert_eq!(results[0].normalized_score, 1.0);
    assert_eq!(results[0].source, "AAPL_10-K.md");
    assert!(results
        .windows(2)
        .all(|w| w[0].normalized_score >= w[1].normalized_score));
    assert!(results
        .iter()
        .all(|r| r.normalized_score > 0.0 && r.normalized_score <= 1.0));
}

#[tokio::test]
async fn test_liquidity_chunk_survives_fusion_and_outranks_unrelated() {
    let texts = [
        "Liquidity risk is the risk that the company cannot meet its short-term obligations when they come due.",
        "Market volatility can cause sharp swings in the value of our investment portfolio.",
        "The company designs and sells consumer electronics through retail stores.",
    ];
    let adapter = hashed_adapter();
    let store = InMemoryVectorStore::new();
    let indexer = ChunkIndexer::new(&adapter, &store, CollectionSchema::named(COLLECTION));
    indexer.provision(ProvisionPolicy::Recreate).await.unwrap();
    indexer.index(&chunks(&texts), "ACME-10-K").await.unwrap();

    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION).with_config(
        RetrievalConfig {
            outer_limit: 2,
            ..RetrievalConfig::default()
        },
    );
    let plan = planner.plan("What is the liquidity risk?", 3).unwrap();

    // Evaluate Stage A on its own
    let fused_node = match &plan.root {
        PlanNode::Rerank { input, .. } => input.as_ref().clone(),
        other => panic!("expected rerank root, got {:?}", other),
    };
    assert!(matches!(fused_node, PlanNode::Fuse { limit: 2, .. }));
    let snapshot = store.snapshot(COLLECTION).unwrap();
    let fused = execute_plan(&snapshot, &QueryPlan { root: fused_node }).unwrap();

    assert_eq!(fused.len(), 2);
    let liquidity_id = fused
        .iter()
        .find(|c| c.payload.text == texts[0])
        .map(|c| c.id)
        .expect("liquidity chunk in the fused set");

    let ranked = planner.execute(&plan).await.unwrap();
    let position = |text: &str| ranked.iter().position(|c| c.payload.text == text);
    assert_eq!(ranked[0].id, liquidity_id);
    if let Some(unrelated) = position(texts[2]) {
        assert!(position(texts[0]).unwrap() < unrelated);
    }
}

#[tokio::test]
async fn test_empty_collection_returns_no_results() {
    let adapter = hashed_adapter();
    let store = InMemoryVectorStore::new();
    store
        .provision(&CollectionSchema::named(COLLECTION), ProvisionPolicy::Recreate)
        .await
        .unwrap();
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);

    let results = planner.search("What are the main financial risks?", 3).await.unwrap();

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_missing_collection_is_reported() {
    let adapter = hashed_adapter();
    let store = InMemoryVectorStore::new();
    let planner = HybridQueryPlanner::new(&adapter, &store, "nope");

    let err = planner.search("liquidity", 3).await.unwrap_err();

    assert!(matches!(err, QueryError::CollectionNotFound(_)));
}

#[tokio::test]
async fn test_final_limit_larger_than_candidates_returns_all() {
    let adapter = hashed_adapter();
    let store = indexed_store(&adapter).await;
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);

    let results = planner.search("risk", 50).await.unwrap();

    // Five points, all reachable through dense recall
    assert_eq!(results.len(), RISK_FACTORS.len());
}

#[tokio::test]
async fn test_repeated_queries_are_identical() {
    let adapter = hashed_adapter();
    let store = indexed_store(&adapter).await;
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);

    let first = planner.plan_and_execute("interest rate exposure", 3).await.unwrap();
    let second = planner.plan_and_execute("interest rate exposure", 3).await.unwrap();

    let key = |c: &ledgerlens_core::search::Candidate| (c.id, c.score.to_bits());
    assert_eq!(
        first.iter().map(key).collect::<Vec<_>>(),
        second.iter().map(key).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_narrow_recall_limits_candidates() {
    let adapter = hashed_adapter();
    let store = indexed_store(&adapter).await;
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION).with_config(
        RetrievalConfig {
            inner_limit: 1,
            ..RetrievalConfig::default()
        },
    );

    // One dense hit plus at most one sparse hit survive Stage A
    let results = planner.search("liquidity risk", 10).await.unwrap();

    assert!(!results.is_empty() && results.len() <= 2);
}

#[tokio::test]
async fn test_blank_query_is_invalid() {
    let adapter = hashed_adapter();
    let store = indexed_store(&adapter).await;
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);

    assert!(matches!(
        planner.search("  \t ", 3).await,
        Err(QueryError::InvalidQuery(_))
    ));
}

// ============================================================================
// Indexing
// ============================================================================

#[tokio::test]
async fn test_failed_chunk_is_reported_with_span() {
    let adapter = EmbeddingAdapter::new(
        Arc::new(HashedDenseEncoder::new(384)),
        Arc::new(Bm25SparseEncoder::new()),
        Arc::new(FailingTokenEncoder {
            inner: HashedTokenEncoder::new(128),
            marker: "Credit risk",
        }),
    )
    .unwrap();
    let store = InMemoryVectorStore::new();
    let indexer = ChunkIndexer::new(&adapter, &store, CollectionSchema::named(COLLECTION));
    let input = chunks(RISK_FACTORS);

    let report = indexer.index(&input, "AAPL_10-K.md").await.unwrap();

    assert_eq!(report.written, 4);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.index, 2);
    assert_eq!(failure.span, input[2].span());
    assert_eq!(failure.error.kind(), RepresentationKind::LateInteraction);
    assert_eq!(store.count(COLLECTION).await.unwrap(), 4);

    // The rejected chunk is never returned
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);
    let results = planner.search("credit risk counterparty", 10).await.unwrap();
    assert!(results.iter().all(|r| !r.text.starts_with("Credit risk")));
}

#[tokio::test]
async fn test_failed_markdown_chunk_names_its_item() {
    let adapter = EmbeddingAdapter::new(
        Arc::new(HashedDenseEncoder::new(384)),
        Arc::new(Bm25SparseEncoder::new()),
        Arc::new(FailingTokenEncoder {
            inner: HashedTokenEncoder::new(128),
            marker: "Revenue increased",
        }),
    )
    .unwrap();
    let store = InMemoryVectorStore::new();
    let filing = format!(
        "## Item 1A\n\n{}\n\n## Item 7\n\n{}",
        RISK_FACTORS[0], RISK_FACTORS[4]
    );
    let pipeline = IndexingPipeline::new(
        create_chunker(FileType::Markdown, 25, WordSizer).unwrap(),
        ChunkIndexer::new(&adapter, &store, CollectionSchema::named(COLLECTION)),
    );

    let report = pipeline.index_text(&filing, "ACME-10-K", |_| {}).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.section.as_deref(), Some("Item 7"));
    assert!(filing[failure.span.clone()].contains("Revenue increased"));
    assert_eq!(report.written, report.attempted() - 1);
}

#[tokio::test]
async fn test_reprovisioning_is_idempotent() {
    let adapter = hashed_adapter();
    let store = indexed_store(&adapter).await;
    let schema = CollectionSchema::named(COLLECTION);

    store
        .provision(&schema, ProvisionPolicy::ReuseExisting)
        .await
        .unwrap();
    store
        .provision(&schema, ProvisionPolicy::ReuseExisting)
        .await
        .unwrap();
    assert_eq!(store.count(COLLECTION).await.unwrap(), RISK_FACTORS.len());

    store.provision(&schema, ProvisionPolicy::Recreate).await.unwrap();
    store.provision(&schema, ProvisionPolicy::Recreate).await.unwrap();
    assert_eq!(store.count(COLLECTION).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reindexing_into_reset_collection_matches_first_index() {
    let adapter = hashed_adapter();
    let store = InMemoryVectorStore::new();
    let indexer = ChunkIndexer::new(&adapter, &store, CollectionSchema::named(COLLECTION));
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);
    let input = chunks(RISK_FACTORS);

    let mut runs = Vec::new();
    for _ in 0..2 {
        indexer.provision(ProvisionPolicy::Recreate).await.unwrap();
        indexer.index(&input, "AAPL_10-K.md").await.unwrap();
        let results = planner.search("liquidity obligations", 5).await.unwrap();
        // Identifiers are fresh per run; text and score are not
        runs.push(
            results
                .into_iter()
                .map(|r| (r.text, r.normalized_score.to_bits()))
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(store.count(COLLECTION).await.unwrap(), RISK_FACTORS.len());
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_pipeline_indexes_markdown_filing() {
    let adapter = hashed_adapter();
    let store = InMemoryVectorStore::new();
    let filing = format!(
        "## Item 1A\n\n{}\n\n{}\n\n## Item 7\n\n{}",
        RISK_FACTORS[0], RISK_FACTORS[1], RISK_FACTORS[4]
    );

    let pipeline = IndexingPipeline::new(
        create_chunker(FileType::Markdown, 40, WordSizer).unwrap(),
        ChunkIndexer::new(&adapter, &store, CollectionSchema::named(COLLECTION)),
    );
    let report = pipeline.index_text(&filing, "ACME-10-K", |_| {}).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(store.count(COLLECTION).await.unwrap(), report.written);

    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);
    let top = planner.search("liquidity obligations", 1).await.unwrap();
    assert!(top[0].text.contains("Liquidity risk"));
}

#[cfg(feature = "redb-store")]
#[tokio::test]
async fn test_redb_round_trip() {
    use ledgerlens_core::storage::RedbVectorStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledgerlens.redb");
    let adapter = hashed_adapter();

    {
        let store = RedbVectorStore::open(&path).unwrap();
        let indexer = ChunkIndexer::new(&adapter, &store, CollectionSchema::named(COLLECTION));
        indexer.provision(ProvisionPolicy::Recreate).await.unwrap();
        indexer
            .index(&chunks(RISK_FACTORS), "AAPL_10-K.md")
            .await
            .unwrap();
    }

    let store = RedbVectorStore::open(&path).unwrap();
    let planner = HybridQueryPlanner::new(&adapter, &store, COLLECTION);
    let results = planner.search("What is the liquidity risk?", 3).await.unwrap();

    assert!(results[0].text.starts_with("Liquidity risk"));
    assert_eq!(results[0].normalized_score, 1.0);
}
