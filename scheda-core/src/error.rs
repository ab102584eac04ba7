//! Error taxonomy for sync runs.
//!
//! `SyncError` is fatal to a whole run. `DocumentError` is local to one
//! document: the batch driver records it on the summary and moves on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("catalog schema missing: table `{table}` not found in {}", database.display())]
    SchemaMissing { table: String, database: PathBuf },

    #[error("cannot open catalog {}: {source}", database.display())]
    Open {
        database: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot list folder {}: {source}", folder.display())]
    Folder {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] rusqlite::Error),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot determine collection for {filename}")]
    Unclassified { filename: String },

    #[error("error reading {filename}: {source}")]
    Read {
        filename: String,
        #[source]
        source: ReadError,
    },

    #[error("database error for {call_number}: {source}")]
    Store {
        call_number: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Failures of the rich-document reader
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a DOCX container: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("missing part {0}")]
    MissingPart(&'static str),

    #[error("malformed XML in {part}: {message}")]
    Xml { part: &'static str, message: String },
}
