//! Filing documents and the source trait.

use crate::error::FilingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Periodic report forms that can be fetched and sliced into items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Annual report
    #[serde(rename = "10-K")]
    TenK,
    /// Quarterly report
    #[serde(rename = "10-Q")]
    TenQ,
}

impl FormType {
    /// SEC form code, e.g. `"10-K"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::TenK => "10-K",
            FormType::TenQ => "10-Q",
        }
    }

    /// Item numbers extracted for this form, in document order.
    pub fn items(&self) -> &'static [&'static str] {
        match self {
            FormType::TenK => &["1", "1A", "7", "8", "9A"],
            FormType::TenQ => &["1", "2", "3", "4"],
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = FilingError;

    /// Accepts `10-K` / `10K` / `10-Q` / `10Q`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "10K" => Ok(FormType::TenK),
            "10Q" => Ok(FormType::TenQ),
            _ => Err(FilingError::UnsupportedForm(s.to_string())),
        }
    }
}

/// Descriptive fields for one filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub ticker: String,
    pub company_name: String,
    /// Period end date, `YYYY-MM-DD`
    pub report_date: String,
    pub form_type: FormType,
}

/// One item of a filing, e.g. `Item 1A` (Risk Factors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingItem {
    /// Display name, `"Item 1A"`
    pub name: String,
    pub content: String,
}

/// A fetched filing: metadata plus the requested items that were found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingDocument {
    pub metadata: FilingMetadata,
    pub items: Vec<FilingItem>,
}

impl FilingDocument {
    /// Joins items into one markdown document, each under a `## Item N`
    /// heading, separated by blank lines.
    pub fn combined_text(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("## {}\n\n{}", item.name, item.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Default source id for indexing, e.g. `AAPL-10-K-2024-09-28`.
    pub fn source_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.metadata.ticker, self.metadata.form_type, self.metadata.report_date
        )
    }
}

/// Source of periodic filings.
#[async_trait::async_trait(?Send)]
pub trait FilingSource {
    /// Fetches the latest filing of `form` for `ticker`.
    ///
    /// # Errors
    ///
    /// - `FilingError::NotFound` for an unknown ticker or when the company has
    ///   no filing of that form
    /// - `FilingError::Request` for transport failures
    #[must_use = "Filing fetch failures should be handled"]
    async fn fetch_filing(
        &self,
        ticker: &str,
        form: FormType,
    ) -> Result<FilingDocument, FilingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(items: Vec<(&str, &str)>) -> FilingDocument {
        FilingDocument {
            metadata: FilingMetadata {
                ticker: "ACME".to_string(),
                company_name: "Acme Corp".to_string(),
                report_date: "2024-09-28".to_string(),
                form_type: FormType::TenK,
            },
            items: items
                .into_iter()
                .map(|(name, content)| FilingItem {
                    name: name.to_string(),
                    content: content.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_form_items() {
        assert_eq!(FormType::TenK.items(), &["1", "1A", "7", "8", "9A"]);
        assert_eq!(FormType::TenQ.items(), &["1", "2", "3", "4"]);
    }

    #[test]
    fn test_parse_form_type() {
        assert_eq!("10-K".parse::<FormType>().unwrap(), FormType::TenK);
        assert_eq!("10q".parse::<FormType>().unwrap(), FormType::TenQ);
        assert!(matches!(
            "8-K".parse::<FormType>(),
            Err(FilingError::UnsupportedForm(f)) if f == "8-K"
        ));
    }

    #[test]
    fn test_form_type_serializes_as_code() {
        assert_eq!(serde_json::to_string(&FormType::TenQ).unwrap(), "\"10-Q\"");
    }

    #[test]
    fn test_combined_text() {
        let doc = document(vec![
            ("Item 1A", "Liquidity risk."),
            ("Item 7", "Revenue grew."),
        ]);
        assert_eq!(
            doc.combined_text(),
            "## Item 1A\n\nLiquidity risk.\n\n## Item 7\n\nRevenue grew."
        );
        assert_eq!(doc.source_id(), "ACME-10-K-2024-09-28");
    }

    #[test]
    fn test_combined_text_without_items() {
        assert_eq!(document(vec![]).combined_text(), "");
    }
}
