//! Ingestion orchestrator.
//!
//! Single entry point for the offline build:
//! load sources → chunk → embed → index → save.
//!
//! Fetching, PDF extraction, chunking and embedding are all trait-injected,
//! so the whole run is testable without network or model files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::ingest::{
    require_corpus, CorpusLoader, IngestError, LoadReport, PageFetcher, PdfExtractor,
    SourceManifest,
};
use crate::pipeline::storage::orchestrator::{BuildReport, IndexBuilder};
use crate::pipeline::storage::types::{Chunker, EmbeddingModel};
use crate::pipeline::storage::StorageError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Index build failed: {0}")]
    Storage(#[from] StorageError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    pub index_id: Uuid,
    pub index_dir: PathBuf,
    pub model_id: String,
    pub created_at: DateTime<Utc>,
    pub documents: usize,
    pub chunks: usize,
    pub entries: usize,
    pub skipped_chunks: usize,
    pub urls_failed: usize,
    pub pdfs_missing: usize,
    pub pdfs_failed: usize,
}

impl IngestionOutcome {
    fn from_reports(
        index_id: Uuid,
        index_dir: &Path,
        model_id: String,
        created_at: DateTime<Utc>,
        load: &LoadReport,
        build: &BuildReport,
    ) -> Self {
        Self {
            index_id,
            index_dir: index_dir.to_path_buf(),
            model_id,
            created_at,
            documents: build.documents,
            chunks: build.chunks,
            entries: build.embedded,
            skipped_chunks: build.skipped,
            urls_failed: load.urls_failed,
            pdfs_missing: load.pdfs_missing,
            pdfs_failed: load.pdfs_failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run the full offline build and persist the index to `index_dir`.
///
/// Individual sources that fail are skipped; only an empty corpus, a corpus
/// with no usable chunk, or a failed save abort the run. A manifest listing
/// no sources at all is an empty corpus.
pub fn run_ingestion<F, P, C, E>(
    manifest: &SourceManifest,
    loader: &CorpusLoader<F, P>,
    builder: &IndexBuilder<C, E>,
    index_dir: &Path,
) -> Result<IngestionOutcome, ProcessingError>
where
    F: PageFetcher,
    P: PdfExtractor,
    C: Chunker,
    E: EmbeddingModel,
{
    if manifest.is_empty() {
        tracing::warn!("Source manifest lists no URLs or PDFs");
        return Err(IngestError::EmptyCorpus.into());
    }

    tracing::info!(
        urls = manifest.urls.len(),
        pdfs = manifest.pdfs.len(),
        "Starting ingestion"
    );

    let (documents, load_report) = loader.load(manifest);
    let documents = require_corpus(documents)?;

    let (index, build_report) = builder.build(&documents)?;
    let saved = index.save(index_dir)?;

    let outcome = IngestionOutcome::from_reports(
        saved.index_id,
        index_dir,
        saved.model_id,
        index.created_at(),
        &load_report,
        &build_report,
    );

    tracing::info!(
        index_id = %outcome.index_id,
        entries = outcome.entries,
        dir = %index_dir.display(),
        "Ingestion complete"
    );

    Ok(outcome)
}
