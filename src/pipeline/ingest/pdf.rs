use std::path::Path;

use super::normalize::normalize_text;
use super::types::{PageText, PdfExtractor, SourceDocument, SourceKind};
use super::IngestError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        // pdf-extract panics on some malformed font tables instead of erroring.
        let extracted = std::panic::catch_unwind(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        })
        .map_err(|_| IngestError::PdfParsing("extractor panicked on malformed PDF".into()))?;

        let page_texts = extracted.map_err(|e| IngestError::PdfParsing(e.to_string()))?;

        Ok(page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i + 1,
                text,
            })
            .collect())
    }
}

/// Read a PDF from disk and turn each non-blank page into a document.
pub fn load_pdf(
    extractor: &dyn PdfExtractor,
    path: &Path,
) -> Result<Vec<SourceDocument>, IngestError> {
    if !path.exists() {
        return Err(IngestError::SourceNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let pages = extractor.extract_pages(&bytes)?;
    let source = path.to_string_lossy().into_owned();
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned());

    Ok(pages
        .into_iter()
        .filter_map(|page| {
            let text = normalize_text(&page.text);
            if text.is_empty() {
                return None;
            }
            Some(SourceDocument {
                text,
                source: source.clone(),
                kind: SourceKind::Pdf,
                page: page.page_number,
                title: title.clone(),
            })
        })
        .collect())
}
