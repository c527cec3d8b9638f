use serde::{Deserialize, Serialize};

use super::IngestError;

/// Where a document came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Web,
    Pdf,
}

impl SourceKind {
    /// Same spelling as the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Pdf => "pdf",
        }
    }
}

/// One unit of normalized text from a source: a web page or a single PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub text: String,
    /// URL or file path
    pub source: String,
    pub kind: SourceKind,
    /// 1-based page (PDF) or sequence number (web)
    pub page: usize,
    pub title: Option<String>,
}

/// Per-page text from a PDF
#[derive(Debug, Clone)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// Fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

/// Remote page retrieval abstraction
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, IngestError>;
}

/// PDF text extraction abstraction
pub trait PdfExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, IngestError>;
}
