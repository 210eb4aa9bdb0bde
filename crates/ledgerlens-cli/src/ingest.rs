//! Ingest command: chunk a document, encode it three ways, and index it.

use crate::config::Settings;
use crate::services::{
    build_chunker, build_encoders, collection_schema, drive_encoding, open_store,
};
use anyhow::{Context, Result};
use clap::Args;
use ledgerlens_core::chunking::{detect_file_type, FileType};
use ledgerlens_core::config::ProvisionPolicy;
use ledgerlens_core::indexing::{ChunkIndexer, IndexReport, IndexingPipeline, IndexingProgress};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Markdown or text file to index
    pub file: PathBuf,

    /// Source id stored with every chunk (default: the file path)
    #[arg(long)]
    pub source: Option<String>,

    /// Keep existing points instead of recreating the collection
    #[arg(long)]
    pub append: bool,

    /// Maximum tokens per chunk (default: 300)
    #[arg(long)]
    pub max_tokens: Option<usize>,
}

impl IngestArgs {
    pub fn policy(&self) -> ProvisionPolicy {
        provision_policy(self.append)
    }
}

/// `--append` keeps the collection; the default is a fresh one.
pub fn provision_policy(append: bool) -> ProvisionPolicy {
    if append {
        ProvisionPolicy::ReuseExisting
    } else {
        ProvisionPolicy::Recreate
    }
}

pub async fn run(settings: &Settings, args: &IngestArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let source = args
        .source
        .clone()
        .unwrap_or_else(|| args.file.display().to_string());

    let report = ingest_text(
        settings,
        &content,
        &source,
        detect_file_type(&args.file),
        args.policy(),
        args.max_tokens,
    )
    .await?;

    println!("{}", summarize(&source, &settings.collection, &report));
    Ok(())
}

/// Indexes one document into the configured collection.
pub async fn ingest_text(
    settings: &Settings,
    content: &str,
    source: &str,
    file_type: FileType,
    policy: ProvisionPolicy,
    max_tokens: Option<usize>,
) -> Result<IndexReport> {
    let encoders = build_encoders(settings).await?;
    let store = open_store(settings)?;
    let chunker = build_chunker(
        file_type,
        max_tokens.unwrap_or(settings.max_chunk_tokens),
        encoders.tokenizer.clone(),
    )?;

    let indexer = ChunkIndexer::new(&encoders.adapter, store.as_ref(), collection_schema(settings));
    indexer
        .provision(policy)
        .await
        .context("Failed to provision collection")?;

    let pipeline = IndexingPipeline::new(chunker, indexer);
    let mut last_decile = 0;
    let report = drive_encoding(pipeline.index_text(
        content,
        source,
        |progress: IndexingProgress| {
            let decile = (progress.percent_complete() / 10.0) as u32;
            if decile > last_decile {
                last_decile = decile;
                info!(
                    "{:.0}% ({}/{} chunks, {} written, eta {}ms)",
                    progress.percent_complete(),
                    progress.chunks_completed(),
                    progress.chunks_total,
                    progress.points_written,
                    progress.estimated_remaining_ms().unwrap_or(0)
                );
            }
        },
    ))
    .await
    .context("Indexing failed")?;

    Ok(report)
}

/// One-line summary plus a line per rejected chunk.
pub fn summarize(source: &str, collection: &str, report: &IndexReport) -> String {
    let mut out = format!(
        "Indexed {} chunk{} from {} into '{}'",
        report.written,
        if report.written == 1 { "" } else { "s" },
        source,
        collection
    );
    if !report.failures.is_empty() {
        out.push_str(&format!(" ({} rejected)", report.failures.len()));
        for failure in &report.failures {
            out.push_str(&format!(
                "\n  chunk {} (bytes {}..{}",
                failure.index, failure.span.start, failure.span.end
            ));
            if let Some(section) = &failure.section {
                out.push_str(&format!(" in {}", section));
            }
            out.push_str(&format!("): {}", failure.error));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvConfig, FileConfig, Overrides};
    use ledgerlens_core::embedding::RepresentationKind;
    use ledgerlens_core::error::EncodingError;
    use ledgerlens_core::indexing::ChunkFailure;

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(provision_policy(false), ProvisionPolicy::Recreate);
        assert_eq!(provision_policy(true), ProvisionPolicy::ReuseExisting);
    }

    #[test]
    fn test_summarize_with_failure() {
        let report = IndexReport {
            written: 4,
            failures: vec![ChunkFailure {
                index: 2,
                span: 120..340,
                section: Some("Item 1A".to_string()),
                error: EncodingError::EmptyInput {
                    kind: RepresentationKind::LateInteraction,
                },
            }],
        };
        let out = summarize("AAPL_10-K.md", "financial", &report);
        assert!(out.starts_with("Indexed 4 chunks from AAPL_10-K.md into 'financial' (1 rejected)"));
        assert!(out.contains("chunk 2 (bytes 120..340 in Item 1A): "));
    }

    #[tokio::test]
    async fn test_ingest_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            data_dir: Some(dir.path().to_path_buf()),
            hashed: true,
            ..Overrides::default()
        };
        let settings =
            Settings::merge(&overrides, &EnvConfig::default(), FileConfig::default()).unwrap();
        let text = "## Item 1A\n\nLiquidity risk is the risk that the company cannot meet its obligations.";

        let first = ingest_text(&settings, text, "a", FileType::Markdown, ProvisionPolicy::Recreate, None)
            .await
            .unwrap();
        let second = ingest_text(
            &settings,
            text,
            "b",
            FileType::Markdown,
            ProvisionPolicy::ReuseExisting,
            None,
        )
        .await
        .unwrap();

        let store = open_store(&settings).unwrap();
        assert_eq!(
            store.count("financial").await.unwrap(),
            first.written + second.written
        );
    }
}
