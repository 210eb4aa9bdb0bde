//! LedgerLens CLI - hybrid search over financial filings.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the latest 10-K items from EDGAR and index them
//! ledgerlens fetch --ticker AAPL --form 10-K --ingest
//!
//! # Index a local markdown file (recreates the collection)
//! ledgerlens ingest AAPL_10-K.md
//! ledgerlens ingest notes.md --append
//!
//! # Query
//! ledgerlens query "What are the main financial risks?"
//! ledgerlens query "liquidity" -n 5 --json --explain
//!
//! # Remote Qdrant instead of the embedded store
//! QDRANT_URL=http://localhost:6333 ledgerlens --backend qdrant query "..."
//! ```

mod config;
mod fetch;
mod ingest;
mod output;
mod search;
mod services;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{Backend, Overrides, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LedgerLens: dense + sparse + late-interaction retrieval over SEC filings.
#[derive(Parser)]
#[command(name = "ledgerlens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Storage backend (default: qdrant when QDRANT_URL is set, else redb)
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Collection name (default: financial)
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Custom data directory (default: platform standard location)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: ./ledgerlens.toml, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use hashed encoders instead of the neural models
    #[arg(long, global = true)]
    hashed: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, encode, and index a document
    Ingest(ingest::IngestArgs),
    /// Fetch a 10-K or 10-Q from SEC EDGAR
    Fetch(fetch::FetchArgs),
    /// Search the collection
    Query(search::QueryArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the shell
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::resolve(&Overrides {
        backend: cli.backend,
        collection: cli.collection.clone(),
        data_dir: cli.data_dir.clone(),
        config: cli.config.clone(),
        hashed: cli.hashed,
    })?;

    match &cli.command {
        Command::Ingest(args) => ingest::run(&settings, args).await?,
        Command::Fetch(args) => fetch::run(&settings, args).await?,
        Command::Query(args) => {
            let outcome = search::execute_search(&settings, &args.text, args.limit).await?;

            let rendered = if args.json {
                output::format_json(
                    &args.text,
                    &outcome.results,
                    args.explain.then_some(&outcome.plan),
                )
            } else {
                let mut text = String::new();
                if args.explain {
                    text.push_str(&output::format_plan(&outcome.plan));
                    text.push_str("\n\n");
                }
                text.push_str(&output::format_human(&args.text, &outcome.results));
                text
            };

            println!("{}", rendered);
        }
    }

    Ok(())
}
