//! Fetch command: download the latest 10-K / 10-Q items from EDGAR.

use crate::config::Settings;
use crate::ingest::{ingest_text, provision_policy, summarize};
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use ledgerlens_core::chunking::FileType;
use ledgerlens_core::filings::{EdgarClient, FilingDocument, FilingSource, FormType};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Company ticker, e.g. AAPL
    #[arg(long)]
    pub ticker: String,

    /// Form type: 10-K or 10-Q
    #[arg(long, default_value = "10-K")]
    pub form: String,

    /// Markdown output path (default: <TICKER>_<FORM>.md)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Index the filing after writing it
    #[arg(long)]
    pub ingest: bool,

    /// With --ingest, keep existing points instead of recreating the collection
    #[arg(long, requires = "ingest")]
    pub append: bool,
}

pub async fn run(settings: &Settings, args: &FetchArgs) -> Result<()> {
    let form: FormType = args.form.parse()?;
    let identity = settings.edgar_identity.as_deref().ok_or_else(|| {
        anyhow!(
            "EDGAR requires an identity: set LEDGERLENS_EDGAR_IDENTITY=\"Name email@example.com\" \
             or edgar_identity in ledgerlens.toml"
        )
    })?;

    let client = EdgarClient::new(identity)?;
    let filing = client
        .fetch_filing(&args.ticker, form)
        .await
        .with_context(|| format!("Failed to fetch {} {}", args.ticker, form))?;

    if filing.items.is_empty() {
        bail!(
            "No items of {} could be extracted from the {} filing",
            form,
            args.ticker
        );
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&filing));
    let text = filing.combined_text();
    std::fs::write(&output, &text)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("{}", describe(&filing, &output));

    if args.ingest {
        let source = filing.source_id();
        let report = ingest_text(
            settings,
            &text,
            &source,
            FileType::Markdown,
            provision_policy(args.append),
            None,
        )
        .await?;
        println!("{}", summarize(&source, &settings.collection, &report));
    }
    Ok(())
}

fn default_output_path(filing: &FilingDocument) -> PathBuf {
    PathBuf::from(format!(
        "{}_{}.md",
        filing.metadata.ticker, filing.metadata.form_type
    ))
}

fn describe(filing: &FilingDocument, output: &std::path::Path) -> String {
    let items: Vec<&str> = filing.items.iter().map(|i| i.name.as_str()).collect();
    format!(
        "{} ({}) {} for period ending {}\n  Items: {}\n  Written to {}",
        filing.metadata.company_name,
        filing.metadata.ticker,
        filing.metadata.form_type,
        filing.metadata.report_date,
        items.join(", "),
        output.display()
    )
}
