//! Types for text chunking.

use serde::Serialize;
use std::ops::Range;

/// A chunk of text with its position in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// Index of this chunk in the document (0-based)
    pub index: usize,
    /// The text content of this chunk
    pub text: String,
    /// Byte offset where this chunk starts in the original document
    pub start: usize,
    /// Byte offset where this chunk ends in the original document (exclusive)
    pub end: usize,
    /// Heading the chunk falls under (`Item 1A`), for Markdown sources
    pub section: Option<String>,
}

impl TextChunk {
    /// Byte range of the chunk in the source document.
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Span plus section, for log lines: `bytes 120..480 in Item 7`.
    pub fn locator(&self) -> String {
        match &self.section {
            Some(section) => format!("bytes {}..{} in {}", self.start, self.end, section),
            None => format!("bytes {}..{}", self.start, self.end),
        }
    }
}
