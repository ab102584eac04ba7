// Scheda Core Library
//
// Reads catalog write-ups (DOCX) into labeled bibliographic fields and
// reconciles them into the SQLite item catalog.

pub mod types;
pub mod error;
pub mod preprocessors;
pub mod extraction;
pub mod normalize;
pub mod classifier;
pub mod catalog;
pub mod processor;
pub mod config;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{DocumentError, ReadError, SyncError};
pub use preprocessors::{DocumentReader, DocxReader};
pub use extraction::{AssembledText, FieldExtractor, TextAssembler};
pub use normalize::normalize_call_number;
pub use classifier::CollectionClassifier;
pub use catalog::{CatalogMatcher, CatalogStore, DescriptionReconciler, SqliteCatalog};
pub use processor::{DescriptionProcessor, ExtractedDocument};
pub use config::{SyncConfig, UpdatePolicy};
