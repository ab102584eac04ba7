// Reader abstraction for rich-text write-ups
//
// This module defines the boundary between container parsing (DOCX bytes -> XML
// parts) and structural parsing (XML parts -> paragraphs/runs). Everything after
// this boundary works with RichDocument and is format-agnostic.

use crate::error::ReadError;
use crate::types::RichDocument;
use std::path::Path;

/// Raw markup parts pulled out of a document container
#[derive(Debug, Clone, Default)]
pub struct DocumentMarkup {
    /// Main body part (`word/document.xml` for DOCX)
    pub body: String,
    /// Relationship part, absent when the container has none
    pub relationships: Option<String>,
}

/// DocumentReader trait - converts write-ups into a RichDocument
///
/// Reading happens in two clear steps:
/// 1. Container -> Markup (e.g. DOCX zip -> document.xml + rels)
/// 2. Markup -> RichDocument (paragraphs, runs, hyperlink relationships)
///
/// Readers never mutate their input.
pub trait DocumentReader {
    /// Step 1: Pull the markup parts out of the container bytes
    fn read_markup(&self, bytes: &[u8]) -> Result<DocumentMarkup, ReadError>;

    /// Step 2: Parse markup into the paragraph/run model
    fn parse_markup(&self, markup: &DocumentMarkup) -> Result<RichDocument, ReadError>;

    /// Convenience method: full read (combines both steps)
    fn read(&self, bytes: &[u8]) -> Result<RichDocument, ReadError> {
        let markup = self.read_markup(bytes)?;
        self.parse_markup(&markup)
    }

    /// Reader name for logging
    fn name(&self) -> &str;

    /// Check if the reader accepts the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}
