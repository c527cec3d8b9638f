use std::path::Path;

use super::pdf::load_pdf;
use super::sources::SourceManifest;
use super::types::{PageFetcher, PdfExtractor, SourceDocument};
use super::web::html_to_document;
use super::IngestError;

/// Outcome counters of a loader run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub urls_loaded: usize,
    pub urls_failed: usize,
    pub pdfs_loaded: usize,
    pub pdfs_missing: usize,
    pub pdfs_failed: usize,
    pub documents: usize,
}

/// Loads every source of a manifest, skipping the ones that fail.
pub struct CorpusLoader<F: PageFetcher, P: PdfExtractor> {
    fetcher: F,
    pdf_extractor: P,
}

impl<F: PageFetcher, P: PdfExtractor> CorpusLoader<F, P> {
    pub fn new(fetcher: F, pdf_extractor: P) -> Self {
        Self {
            fetcher,
            pdf_extractor,
        }
    }

    /// Load all sources. Individual failures are logged and contribute
    /// zero documents; the result may be empty.
    pub fn load(&self, manifest: &SourceManifest) -> (Vec<SourceDocument>, LoadReport) {
        let mut documents = Vec::new();
        let mut report = LoadReport::default();

        for url in &manifest.urls {
            match self.load_url(url) {
                Ok(Some(doc)) => {
                    tracing::info!(url = %url, chars = doc.text.len(), "Web source loaded");
                    documents.push(doc);
                    report.urls_loaded += 1;
                }
                Ok(None) => {
                    tracing::warn!(url = %url, "Web source has no readable text");
                    report.urls_failed += 1;
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "Web source failed, skipping");
                    report.urls_failed += 1;
                }
            }
        }

        for path in manifest.resolved_pdfs() {
            match self.load_pdf_file(&path) {
                Ok(pages) => {
                    tracing::info!(path = %path.display(), pages = pages.len(), "PDF loaded");
                    documents.extend(pages);
                    report.pdfs_loaded += 1;
                }
                Err(IngestError::SourceNotFound(missing)) => {
                    tracing::warn!(path = %missing.display(), "PDF not found, skipping");
                    report.pdfs_missing += 1;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "PDF unreadable, skipping");
                    report.pdfs_failed += 1;
                }
            }
        }

        report.documents = documents.len();
        tracing::info!(
            documents = report.documents,
            urls_failed = report.urls_failed,
            pdfs_missing = report.pdfs_missing,
            pdfs_failed = report.pdfs_failed,
            "Corpus load finished"
        );

        (documents, report)
    }

    fn load_url(&self, url: &str) -> Result<Option<SourceDocument>, IngestError> {
        let page = self.fetcher.fetch(url)?;
        Ok(html_to_document(&page))
    }

    fn load_pdf_file(&self, path: &Path) -> Result<Vec<SourceDocument>, IngestError> {
        load_pdf(&self.pdf_extractor, path)
    }
}

/// An index cannot be built from nothing: an empty corpus aborts ingestion.
pub fn require_corpus(documents: Vec<SourceDocument>) -> Result<Vec<SourceDocument>, IngestError> {
    if documents.is_empty() {
        return Err(IngestError::EmptyCorpus);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ingest::pdf::tests::make_test_pdf;
    use crate::pipeline::ingest::pdf::PdfTextExtractor;
    use crate::pipeline::ingest::types::{FetchedPage, SourceKind};

    /// Serves canned HTML for known URLs, fails for the rest.
    struct StubFetcher;

    impl PageFetcher for StubFetcher {
        fn fetch(&self, url: &str) -> Result<FetchedPage, IngestError> {
            if url.contains("ok") {
                Ok(FetchedPage {
                    url: url.to_string(),
                    body: "<html><body><p>Protocolo de amiodarona.</p></body></html>".into(),
                })
            } else {
                Err(IngestError::HttpStatus {
                    url: url.to_string(),
                    status: 503,
                })
            }
        }
    }

    #[test]
    fn failing_url_does_not_abort_batch() {
        let loader = CorpusLoader::new(StubFetcher, PdfTextExtractor);
        let manifest = SourceManifest {
            urls: vec!["https://down.example".into(), "https://ok.example".into()],
            pdfs: vec![],
            pdf_dir: None,
        };

        let (docs, report) = loader.load(&manifest);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, SourceKind::Web);
        assert_eq!(docs[0].source, "https://ok.example");
        assert_eq!(report.urls_loaded, 1);
        assert_eq!(report.urls_failed, 1);
    }

    #[test]
    fn missing_and_broken_pdfs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.pdf"), make_test_pdf("Bloqueio atrioventricular")).unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"garbage bytes").unwrap();

        let loader = CorpusLoader::new(StubFetcher, PdfTextExtractor);
        let manifest = SourceManifest {
            urls: vec![],
            pdfs: vec!["good.pdf".into(), "missing.pdf".into(), "broken.pdf".into()],
            pdf_dir: Some(dir.path().to_path_buf()),
        };

        let (docs, report) = loader.load(&manifest);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, SourceKind::Pdf);
        assert_eq!(report.pdfs_loaded, 1);
        assert_eq!(report.pdfs_missing, 1);
        assert_eq!(report.pdfs_failed, 1);
        assert_eq!(report.documents, 1);
    }

    #[test]
    fn everything_failing_yields_empty_corpus() {
        let loader = CorpusLoader::new(StubFetcher, PdfTextExtractor);
        let manifest = SourceManifest {
            urls: vec!["https://down.example".into()],
            pdfs: vec!["/nonexistent/file.pdf".into()],
            pdf_dir: None,
        };

        let (docs, _) = loader.load(&manifest);
        assert!(docs.is_empty());
        assert!(matches!(require_corpus(docs), Err(IngestError::EmptyCorpus)));
    }

    #[test]
    fn require_corpus_passes_documents_through() {
        let doc = SourceDocument {
            text: "texto".into(),
            source: "a.pdf".into(),
            kind: SourceKind::Pdf,
            page: 1,
            title: None,
        };
        let docs = require_corpus(vec![doc.clone()]).unwrap();
        assert_eq!(docs, vec![doc]);
    }
}
