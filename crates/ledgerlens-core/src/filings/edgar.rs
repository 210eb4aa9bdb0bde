//! SEC EDGAR client.
//!
//! Resolves a ticker to its CIK through `company_tickers.json`, finds the
//! latest filing of a form in the company's submissions feed, downloads the
//! primary document and slices out the requested items.
//!
//! The SEC requires every request to identify the caller with a user agent
//! carrying a contact email; [`EdgarClient::new`] rejects identities without
//! one.

use super::html::html_to_text;
use super::sections::split_items;
use super::types::{FilingDocument, FilingMetadata, FilingSource, FormType};
use crate::error::FilingError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SEC_WWW: &str = "https://www.sec.gov";
const SEC_DATA: &str = "https://data.sec.gov";

/// One row of `company_tickers.json`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TickerEntry {
    pub cik_str: u64,
    pub ticker: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Submissions {
    #[serde(default)]
    pub name: String,
    pub filings: SubmissionFilings,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionFilings {
    pub recent: RecentFilings,
}

/// Column-oriented list of recent filings, newest first.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecentFilings {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub report_date: Vec<String>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
}

/// Location of one filing's primary document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FilingRef {
    pub accession_number: String,
    pub filing_date: String,
    pub report_date: String,
    pub primary_document: String,
}

impl FilingRef {
    fn document_url(&self, www_base: &str, cik: u64) -> String {
        format!(
            "{}/Archives/edgar/data/{}/{}/{}",
            www_base,
            cik,
            self.accession_number.replace('-', ""),
            self.primary_document
        )
    }
}

/// Finds a ticker, ignoring case and treating `.` as `-` (`BRK.B` = `BRK-B`).
pub(crate) fn find_ticker<'a>(
    entries: &'a HashMap<String, TickerEntry>,
    ticker: &str,
) -> Option<&'a TickerEntry> {
    let wanted = ticker.trim().to_ascii_uppercase().replace('.', "-");
    entries
        .values()
        .find(|entry| entry.ticker.eq_ignore_ascii_case(&wanted))
}

/// Returns the most recently filed original (non-amended) filing of `form`.
pub(crate) fn latest_filing(recent: &RecentFilings, form: FormType) -> Option<FilingRef> {
    let mut best: Option<FilingRef> = None;
    for (i, candidate) in recent.form.iter().enumerate() {
        if candidate != form.as_str() {
            continue;
        }
        let (Some(accession), Some(filed), Some(document)) = (
            recent.accession_number.get(i),
            recent.filing_date.get(i),
            recent.primary_document.get(i),
        ) else {
            continue;
        };
        if best.as_ref().is_some_and(|b| b.filing_date >= *filed) {
            continue;
        }
        best = Some(FilingRef {
            accession_number: accession.clone(),
            filing_date: filed.clone(),
            report_date: recent.report_date.get(i).cloned().unwrap_or_default(),
            primary_document: document.clone(),
        });
    }
    best
}

fn validate_identity(identity: &str) -> Result<(), FilingError> {
    let has_email = identity.split_whitespace().any(|part| {
        part.split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'))
    });
    if has_email {
        Ok(())
    } else {
        Err(FilingError::InvalidIdentity(format!(
            "'{}' must include a contact email, e.g. \"Jane Doe jane@example.com\"",
            identity
        )))
    }
}

/// EDGAR filing source over HTTPS.
///
/// The underlying `reqwest::Client` pools connections, so reuse one client
/// for several fetches.
pub struct EdgarClient {
    client: reqwest::Client,
    www_base: String,
    data_base: String,
}

impl EdgarClient {
    /// Creates a client identifying itself as `identity` (name and email).
    pub fn new(identity: &str) -> Result<Self, FilingError> {
        let identity = identity.trim();
        validate_identity(identity)?;

        let client = reqwest::Client::builder()
            .user_agent(identity)
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| FilingError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            www_base: SEC_WWW.to_string(),
            data_base: SEC_DATA.to_string(),
        })
    }

    /// Points the client at other hosts (mirrors, test servers).
    pub fn with_base_urls(mut self, www_base: &str, data_base: &str) -> Self {
        self.www_base = www_base.trim_end_matches('/').to_string();
        self.data_base = data_base.trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FilingError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FilingError::Request(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FilingError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FilingError::Request(format!("{} returned {}", url, status)));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FilingError> {
        self.get(url)
            .await?
            .json::<T>()
            .await
            .map_err(|e| FilingError::Malformed(format!("Unexpected response from {}: {}", url, e)))
    }

    async fn get_text(&self, url: &str) -> Result<String, FilingError> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| FilingError::Request(format!("Failed to read {}: {}", url, e)))
    }

    /// Resolves a ticker to its CIK and registered company name.
    pub async fn resolve_cik(&self, ticker: &str) -> Result<(u64, String), FilingError> {
        let url = format!("{}/files/company_tickers.json", self.www_base);
        let entries: HashMap<String, TickerEntry> = self.get_json(&url).await?;

        find_ticker(&entries, ticker)
            .map(|entry| (entry.cik_str, entry.title.clone()))
            .ok_or_else(|| FilingError::NotFound(format!("Unknown ticker '{}'", ticker)))
    }
}

#[async_trait::async_trait(?Send)]
impl FilingSource for EdgarClient {
    #[instrument(skip_all, fields(ticker = ticker, form = %form))]
    async fn fetch_filing(
        &self,
        ticker: &str,
        form: FormType,
    ) -> Result<FilingDocument, FilingError> {
        let (cik, title) = self.resolve_cik(ticker).await?;

        let url = format!("{}/submissions/CIK{:010}.json", self.data_base, cik);
        let submissions: Submissions = self.get_json(&url).await?;
        let filing = latest_filing(&submissions.filings.recent, form).ok_or_else(|| {
            FilingError::NotFound(format!("No {} filing found for {}", form, ticker))
        })?;

        info!(
            "Fetching {} {} filed {} ({})",
            ticker, form, filing.filing_date, filing.accession_number
        );
        let html = self
            .get_text(&filing.document_url(&self.www_base, cik))
            .await?;
        let items = split_items(&html_to_text(&html), form);
        if items.is_empty() {
            warn!("No items of {} {} could be located", ticker, form);
        }

        let company_name = if submissions.name.is_empty() {
            title
        } else {
            submissions.name
        };

        Ok(FilingDocument {
            metadata: FilingMetadata {
                ticker: ticker.trim().to_ascii_uppercase(),
                company_name,
                report_date: filing.report_date,
                form_type: form,
            },
            items,
        })
    }
}
