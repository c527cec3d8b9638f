pub mod types;
pub mod sources;
pub mod normalize;
pub mod web;
pub mod pdf;
pub mod loader;

pub use types::*;
pub use sources::SourceManifest;
pub use loader::{require_corpus, CorpusLoader, LoadReport};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed for {url}: {message}")]
    Http { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Source manifest error: {0}")]
    Manifest(String),

    #[error("No documents were loaded from any source")]
    EmptyCorpus,
}
