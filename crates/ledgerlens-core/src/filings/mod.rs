//! Periodic-report retrieval.
//!
//! [`FilingSource`] fetches the latest 10-K or 10-Q of a company and returns
//! the items worth indexing:
//!
//! | Form | Items |
//! |------|-------|
//! | 10-K | 1 (Business), 1A (Risk Factors), 7 (MD&A), 8 (Financial Statements), 9A (Controls) |
//! | 10-Q | 1 (Financial Statements), 2 (MD&A), 3 (Market Risk), 4 (Controls) |
//!
//! [`FilingDocument::combined_text`] renders the items as markdown, ready for
//! the markdown chunker. The EDGAR client and HTML extraction are behind the
//! `edgar` feature.

mod types;

#[cfg(feature = "edgar")]
mod edgar;
#[cfg(feature = "edgar")]
mod html;
#[cfg(feature = "edgar")]
mod sections;

#[cfg(feature = "edgar")]
pub use edgar::EdgarClient;
#[cfg(feature = "edgar")]
pub use html::html_to_text;
#[cfg(feature = "edgar")]
pub use sections::split_items;
pub use types::{FilingDocument, FilingItem, FilingMetadata, FilingSource, FormType};
