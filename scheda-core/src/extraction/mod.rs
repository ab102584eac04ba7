//! Text extraction
//!
//! RichDocument → AssembledText (hyperlink-aware + plain) → FieldMap.

pub mod assembler;
pub mod fields;

pub use assembler::{AssembledText, TextAssembler};
pub use fields::{extract_field, FieldExtractor};
