//! Query command: hybrid retrieval against an indexed collection.

use crate::config::Settings;
use crate::services::{build_encoders, encode_blocking, open_store};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use ledgerlens_core::search::{normalize_scores, HybridQueryPlanner, QueryPlan, RankedResult};
use tracing::info;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Question or keywords to search for
    pub text: String,

    /// Number of results (default: 3)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the query plan
    #[arg(long)]
    pub explain: bool,
}

/// Results of one query, with the plan that produced them.
pub struct SearchOutcome {
    pub plan: QueryPlan,
    pub results: Vec<RankedResult>,
}

/// Runs the two-stage hybrid query.
///
/// 1. Opens the configured store and checks the collection exists
/// 2. Loads the encoders and encodes the query three ways
/// 3. Recalls dense and sparse candidates, fuses them with RRF
/// 4. Reranks the fused set by late interaction
/// 5. Normalizes scores against the best result
pub async fn execute_search(
    settings: &Settings,
    query: &str,
    limit: Option<usize>,
) -> Result<SearchOutcome> {
    let store = open_store(settings)?;
    if !store
        .collection_exists(&settings.collection)
        .await
        .context("Failed to reach the store")?
    {
        return Err(anyhow!(
            "No collection '{}' found.\n\
             Index a document first with `ledgerlens ingest <FILE>`.",
            settings.collection
        ));
    }

    let encoders = build_encoders(settings).await?;
    let planner = HybridQueryPlanner::new(&encoders.adapter, store.as_ref(), &settings.collection)
        .with_config(settings.retrieval);

    let limit = limit.unwrap_or(settings.retrieval.final_limit);
    info!("Searching for: \"{}\"", query);
    let plan = encode_blocking(|| planner.plan(query, limit))?;
    let candidates = planner.execute(&plan).await.context("Search failed")?;

    info!("Found {} results", candidates.len());
    Ok(SearchOutcome {
        plan,
        results: normalize_scores(&candidates),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvConfig, FileConfig, Overrides};
    use crate::ingest::ingest_text;
    use ledgerlens_core::chunking::FileType;
    use ledgerlens_core::config::ProvisionPolicy;

    fn settings(dir: &std::path::Path) -> Settings {
        let overrides = Overrides {
            data_dir: Some(dir.to_path_buf()),
            hashed: true,
            ..Overrides::default()
        };
        Settings::merge(&overrides, &EnvConfig::default(), FileConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_search_missing_collection() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute_search(&settings(dir.path()), "liquidity", None).await;
        let err = result.err().unwrap().to_string();
        assert!(err.contains("No collection 'financial'"));
    }

    #[tokio::test]
    async fn test_search_after_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let text = "## Item 1A\n\n\
            Liquidity risk is the risk that the company cannot meet its obligations.\n\n\
            ## Item 7\n\n\
            Revenue grew because of strong product demand.";
        ingest_text(&settings, text, "ACME-10-K", FileType::Markdown, ProvisionPolicy::Recreate, Some(16))
            .await
            .unwrap();

        let outcome = execute_search(&settings, "What is the liquidity risk?", None)
            .await
            .unwrap();

        assert!(!outcome.results.is_empty());
        assert_eq!(outcome.results[0].normalized_score, 1.0);
        assert!(outcome.results[0].text.contains("Liquidity risk"));
        assert_eq!(outcome.results[0].source, "ACME-10-K");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_search_on_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        ingest_text(
            &settings,
            "Liquidity risk is the risk that obligations cannot be met.",
            "ACME-10-K",
            FileType::Text,
            ProvisionPolicy::Recreate,
            None,
        )
        .await
        .unwrap();

        let outcome = execute_search(&settings, "liquidity risk", None).await.unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].normalized_score, 1.0);
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        ingest_text(&settings, "Interest rate risk.", "x", FileType::Text, ProvisionPolicy::Recreate, None)
            .await
            .unwrap();

        assert!(execute_search(&settings, "   ", None).await.is_err());
    }
}
