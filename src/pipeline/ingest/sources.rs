use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::IngestError;
use crate::config;

/// Reference article on Chagas cardiomyopathy (SciELO, Arq. Bras. Cardiol.)
const REFERENCE_URLS: &[&str] =
    &["https://www.scielo.br/j/abc/a/pZnfbJzqhGcBgVHmyjRgDkb/?format=html&lang=pt"];

/// Reference PDFs expected in the corpus directory.
const REFERENCE_PDFS: &[&str] = &[
    "ECG-Manual-Prático-de-Eletrocardiograma-HCor.pdf",
    "download (1).pdf",
    "download (2).pdf",
    "rdt_v22n4_166-168.pdf",
    "38050006.pdf",
    "0066-782X-abc-119-04-0638.x55156.pdf",
    "download (3).pdf",
    "a2004_v17_n04_art03.pdf",
    "kumar-et-al-2023-tropical-cardiovascular-diseases.pdf",
    "download (4).pdf",
    "download (5).pdf",
];

/// The list of sources an ingestion run reads.
///
/// Persisted as JSON:
/// `{ "urls": [...], "pdfs": [...], "pdf_dir": "..." }`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceManifest {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub pdfs: Vec<PathBuf>,
    /// Base directory for relative PDF paths
    #[serde(default)]
    pub pdf_dir: Option<PathBuf>,
}

impl SourceManifest {
    /// The corpus the advisory templates were written against.
    pub fn reference_corpus() -> Self {
        Self {
            urls: REFERENCE_URLS.iter().map(|u| u.to_string()).collect(),
            pdfs: REFERENCE_PDFS.iter().map(PathBuf::from).collect(),
            pdf_dir: Some(config::corpus_dir()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, IngestError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| IngestError::Manifest(format!("{}: {e}", path.display())))
    }

    /// PDF paths with relative entries resolved against `pdf_dir`.
    pub fn resolved_pdfs(&self) -> Vec<PathBuf> {
        self.pdfs
            .iter()
            .map(|p| match &self.pdf_dir {
                Some(dir) if p.is_relative() => dir.join(p),
                _ => p.clone(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.pdfs.is_empty()
    }
}
