//! Filing splitter over the `text-splitter` crate.
//!
//! Plain text is split at the highest semantic level that fits the budget
//! (paragraph, sentence, word). Markdown additionally treats headings as
//! boundaries, and every chunk is tagged with the heading it falls under, so
//! a chunk of a combined filing knows its `## Item 1A` section.

use super::{ChunkingStrategy, TextChunk};
use crate::error::ChunkingError;
use text_splitter::{ChunkConfig, ChunkSizer, MarkdownSplitter, TextSplitter};

/// Source layout, which picks the splitter and section tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Plain,
    Markdown,
}

/// Budgeted splitter for filing text.
pub struct FilingSplitter<Z> {
    layout: Layout,
    max_tokens: usize,
    sizer: Z,
}

impl<Z> FilingSplitter<Z>
where
    Z: ChunkSizer + Clone + Send + Sync,
{
    pub fn new(layout: Layout, max_tokens: usize, sizer: Z) -> Self {
        Self {
            layout,
            max_tokens,
            sizer,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    fn config(&self) -> ChunkConfig<Z> {
        ChunkConfig::new(self.max_tokens)
            .with_sizer(self.sizer.clone())
            .with_trim(true)
    }
}

impl<Z> ChunkingStrategy for FilingSplitter<Z>
where
    Z: ChunkSizer + Clone + Send + Sync,
{
    fn chunk(&self, text: &str) -> Result<Vec<TextChunk>, ChunkingError> {
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let spans: Vec<(usize, &str)> = match self.layout {
            Layout::Plain => TextSplitter::new(self.config()).chunk_indices(text).collect(),
            Layout::Markdown => MarkdownSplitter::new(self.config())
                .chunk_indices(text)
                .collect(),
        };

        let headings = match self.layout {
            Layout::Plain => Vec::new(),
            Layout::Markdown => headings(text),
        };

        Ok(spans
            .into_iter()
            .enumerate()
            .map(|(index, (start, piece))| TextChunk {
                index,
                text: piece.to_string(),
                start,
                end: start + piece.len(),
                section: section_at(&headings, start),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        match self.layout {
            Layout::Plain => "plain",
            Layout::Markdown => "markdown",
        }
    }

    fn max_tokens(&self) -> usize {
        self.max_tokens
    }
}

/// Byte offset and title of every ATX heading line, in source order.
fn headings(text: &str) -> Vec<(usize, String)> {
    let mut found = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let title = trimmed.trim_start_matches('#').trim();
            if !title.is_empty() {
                found.push((offset, title.to_string()));
            }
        }
        offset += line.len();
    }
    found
}

/// Title of the last heading at or before `start`.
fn section_at(headings: &[(usize, String)], start: usize) -> Option<String> {
    let after = headings.partition_point(|(offset, _)| *offset <= start);
    after
        .checked_sub(1)
        .map(|last| headings[last].1.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{TokenizerSizer, WordSizer};
    use crate::test_utils::load_test_tokenizer;

    const FILING: &str = "## Item 1A\n\n\
        Liquidity risk is the risk that the company cannot pay.\n\n\
        ## Item 7\n\n\
        Market volatility affects the fair value of investments.";

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter =
            FilingSplitter::new(Layout::Plain, 512, TokenizerSizer::new(load_test_tokenizer()));
        let text = "Revenue grew. Margins held. Cash declined.";
        let chunks = splitter.chunk(text).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].section, None);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        for layout in [Layout::Plain, Layout::Markdown] {
            let splitter = FilingSplitter::new(layout, 64, WordSizer);
            assert!(splitter.chunk("").unwrap().is_empty());
            assert!(splitter.chunk("   \n\t  ").unwrap().is_empty());
        }
    }

    #[test]
    fn test_token_budget_respected() {
        let sizer = TokenizerSizer::new(load_test_tokenizer());
        let splitter = FilingSplitter::new(Layout::Plain, 5, sizer.clone());
        let text = "Interest rate changes could reduce the fair value of the debt portfolio.";
        let chunks = splitter.chunk(text).unwrap();

        assert!(chunks.len() > 1, "expected a split, got {}", chunks.len());
        for chunk in &chunks {
            assert!(sizer.size(&chunk.text) <= 5, "chunk too large: {:?}", chunk.text);
        }
    }

    #[test]
    fn test_spans_point_into_source() {
        let text = "\n\n  Liquidity risk is the first risk.\n\nMarket volatility is the second risk.";
        let chunks = FilingSplitter::new(Layout::Plain, 6, WordSizer)
            .chunk(text)
            .unwrap();

        assert!(chunks.len() >= 2);
        let mut last_end = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(&text[chunk.span()], chunk.text);
            assert!(chunk.start >= last_end, "chunks overlap");
            last_end = chunk.end;
        }
    }

    #[test]
    fn test_repeated_paragraphs_get_distinct_spans() {
        let text = "Interest rate risk.\n\nInterest rate risk.";
        let chunks = FilingSplitter::new(Layout::Plain, 3, WordSizer)
            .chunk(text)
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, chunks[1].text);
        assert_ne!(chunks[0].start, chunks[1].start);
    }

    #[test]
    fn test_markdown_splits_on_items_and_tags_sections() {
        let chunks = FilingSplitter::new(Layout::Markdown, 14, WordSizer)
            .chunk(FILING)
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("## Item 1A"));
        assert_eq!(chunks[0].section.as_deref(), Some("Item 1A"));
        assert!(chunks[1].text.starts_with("## Item 7"));
        assert_eq!(chunks[1].section.as_deref(), Some("Item 7"));
        for chunk in &chunks {
            assert_eq!(&FILING[chunk.span()], chunk.text);
        }
    }

    #[test]
    fn test_continuation_chunks_inherit_section() {
        let chunks = FilingSplitter::new(Layout::Markdown, 5, WordSizer)
            .chunk(FILING)
            .unwrap();

        assert!(chunks.len() > 2);
        let body = chunks
            .iter()
            .find(|c| c.text.contains("cannot pay"))
            .unwrap();
        assert!(!body.text.starts_with('#'));
        assert_eq!(body.section.as_deref(), Some("Item 1A"));
    }

    #[test]
    fn test_plain_layout_ignores_headings() {
        let chunks = FilingSplitter::new(Layout::Plain, 300, WordSizer)
            .chunk(FILING)
            .unwrap();
        assert!(chunks.iter().all(|c| c.section.is_none()));
    }

    #[test]
    fn test_section_lookup() {
        let found = headings("intro\n# Item 1\nbody\n### Item 1A\nmore\n#\n");
        assert_eq!(found, vec![(6, "Item 1".to_string()), (20, "Item 1A".to_string())]);
        assert_eq!(section_at(&found, 0), None);
        assert_eq!(section_at(&found, 6), Some("Item 1".to_string()));
        assert_eq!(section_at(&found, 19), Some("Item 1".to_string()));
        assert_eq!(section_at(&found, 40), Some("Item 1A".to_string()));
    }
}
