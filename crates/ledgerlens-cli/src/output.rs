//! Output formatting for search results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use ledgerlens_core::search::{QueryPlan, RankedResult};
use serde::Serialize;

/// Characters of chunk text shown per result
const EXCERPT_CHARS: usize = 100;

/// Width of the separator line between results
const SEPARATOR_WIDTH: usize = 80;

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a QueryPlan>,
    results: &'a [RankedResult],
}

/// Formats search results as pretty JSON, with the plan when `explain` is set.
pub fn format_json(query: &str, results: &[RankedResult], plan: Option<&QueryPlan>) -> String {
    let output = JsonOutput {
        query,
        plan,
        results,
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Formats search results for the terminal.
///
/// Each result shows its normalized score, the first 100 characters of its
/// text, and its source, followed by a separator line.
pub fn format_human(query: &str, results: &[RankedResult]) -> String {
    if results.is_empty() {
        return format!("No results found for \"{}\"", query);
    }

    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut output = String::new();
    for result in results {
        output.push_str(&format!("Score: {:.4}\n", result.normalized_score));
        output.push_str(&format!(
            "Text: {}\n",
            single_line(&result.excerpt(EXCERPT_CHARS))
        ));
        output.push_str(&format!("Source: {}\n", result.source));
        output.push_str(&separator);
        output.push('\n');
    }

    output.trim_end().to_string()
}

/// Formats the plan outline shown by `--explain`.
pub fn format_plan(plan: &QueryPlan) -> String {
    format!("Query plan:\n{}", plan.outline())
}

/// Collapses line breaks so each excerpt stays on one line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
