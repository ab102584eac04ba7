//! Document Readers
//!
//! This module provides the reading layer for converting catalog write-ups
//! into a unified RichDocument that feeds into text assembly.
//!
//! ## Architecture
//!
//! ```text
//! Write-up (.docx)
//!     ↓
//! [Format-specific DocumentReader]
//!     ↓
//! RichDocument (paragraphs → runs → hyperlink refs)
//!     ↓
//! [TextAssembler → FieldExtractor]
//!     ↓
//! FieldMap
//! ```
//!
//! ## Available Readers
//!
//! - `DocxReader` - Office Open XML documents (ZIP + WordprocessingML)

pub mod traits;
pub mod docx;

// Re-export main types
pub use traits::{DocumentMarkup, DocumentReader};
pub use docx::DocxReader;
