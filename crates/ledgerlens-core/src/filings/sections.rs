//! Slicing filing text into numbered items.

use super::types::{FilingItem, FormType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

// "Item 1A." / "ITEM 7 -" / "Item 9A:" at the start of a line
static ITEM_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[\s&&[^\n]]*item[\s&&[^\n]]+(\d{1,2}[a-z]?)\b[\s&&[^\n]]*[.:\-]?")
        .expect("Invalid item heading pattern")
});

/// Splits filing text into the items listed for `form`.
///
/// A section runs from its `Item N` heading to the next item heading. Tables
/// of contents repeat every heading with only a title and page number after
/// it, so when an item number occurs more than once the longest section is
/// kept. Items with no heading or no content are skipped.
pub fn split_items(text: &str, form: FormType) -> Vec<FilingItem> {
    let headings: Vec<(String, usize, usize)> = ITEM_HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1)?.as_str().to_ascii_uppercase();
            Some((number, whole.start(), whole.end()))
        })
        .collect();

    let mut longest: HashMap<String, &str> = HashMap::new();
    for (i, (number, _, body_start)) in headings.iter().enumerate() {
        let body_end = headings
            .get(i + 1)
            .map_or(text.len(), |(_, next_start, _)| *next_start);
        let body = text[*body_start..body_end].trim();

        let entry = longest.entry(number.clone()).or_insert("");
        if body.len() > entry.len() {
            *entry = body;
        }
    }

    form.items()
        .iter()
        .filter_map(|number| {
            let content = longest.get(*number).filter(|c| !c.is_empty())?;
            Some(FilingItem {
                name: format!("Item {}", number),
                content: content.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_K: &str = "\
Table of Contents
Item 1. Business 4
Item 1A. Risk Factors 12
Item 7. Management's Discussion 30
PART I
Item 1. Business
Acme designs and sells widgets worldwide.
Item 1A. Risk Factors
Liquidity risk is the risk that the company cannot meet its obligations.
Market volatility affects the fair value of investments.
Item 1B. Unresolved Staff Comments
None.
ITEM 7 - Management's Discussion
Revenue grew 8% year over year.";

    #[test]
    fn test_splits_requested_items_in_form_order() {
        let items = split_items(TEN_K, FormType::TenK);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Item 1", "Item 1A", "Item 7"]);
    }

    #[test]
    fn test_body_skips_table_of_contents() {
        let items = split_items(TEN_K, FormType::TenK);
        let risk = &items[1];
        assert!(risk.content.starts_with("Risk Factors"));
        assert!(risk.content.contains("Liquidity risk"));
        assert!(!risk.content.contains("Unresolved"));
    }

    #[test]
    fn test_heading_variants() {
        let items = split_items(TEN_K, FormType::TenK);
        assert_eq!(
            items[2].content,
            "Management's Discussion\nRevenue grew 8% year over year."
        );
    }

    #[test]
    fn test_unlisted_items_are_ignored() {
        // 1B is present in the text but not extracted for a 10-K
        let items = split_items(TEN_K, FormType::TenK);
        assert!(items.iter().all(|i| i.name != "Item 1B"));
    }

    #[test]
    fn test_inline_references_are_not_headings() {
        let text = "Item 2. Properties\nSee Item 1A for details on risks.";
        let items = split_items(text, FormType::TenQ);
        assert_eq!(items.len(), 1);
        assert!(items[0].content.contains("See Item 1A"));
    }

    #[test]
    fn test_no_headings() {
        assert!(split_items("Plain prose without items.", FormType::TenQ).is_empty());
    }
}
