use super::types::{Chunker, EmbeddingModel, TextChunk};
use super::vectordb::VectorIndex;
use super::StorageError;
use crate::pipeline::ingest::SourceDocument;

/// Chunks embedded per `embed_batch` call.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Outcome of one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub embedded: usize,
    /// Chunks dropped because they could not be embedded
    pub skipped: usize,
}

/// Offline build job: chunk → embed → index.
pub struct IndexBuilder<C: Chunker, E: EmbeddingModel> {
    chunker: C,
    embedder: E,
    batch_size: usize,
}

impl<C: Chunker, E: EmbeddingModel> IndexBuilder<C, E> {
    pub fn new(chunker: C, embedder: E) -> Self {
        Self {
            chunker,
            embedder,
            batch_size: EMBED_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn build(
        &self,
        documents: &[SourceDocument],
    ) -> Result<(VectorIndex, BuildReport), StorageError> {
        let mut report = BuildReport {
            documents: documents.len(),
            ..BuildReport::default()
        };

        let chunks = self.chunker.chunk_documents(documents);
        if chunks.is_empty() {
            return Err(StorageError::EmptyChunks);
        }
        report.chunks = chunks.len();

        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            model = %self.embedder.model_id(),
            "Embedding chunks"
        );

        let mut pairs: Vec<(TextChunk, Vec<f32>)> = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            match self.embedder.embed_batch(&texts) {
                Ok(vectors) if vectors.len() == batch.len() => {
                    pairs.extend(batch.iter().cloned().zip(vectors));
                }
                Ok(vectors) => {
                    tracing::warn!(
                        expected = batch.len(),
                        actual = vectors.len(),
                        "Embedding batch returned wrong count, falling back to individual"
                    );
                    self.embed_individually(batch, &mut pairs, &mut report);
                }
                Err(e) => {
                    tracing::warn!("Embedding batch failed, falling back to individual: {e}");
                    self.embed_individually(batch, &mut pairs, &mut report);
                }
            }
        }

        if pairs.is_empty() {
            return Err(StorageError::Embedding(
                "no chunk could be embedded".into(),
            ));
        }
        report.embedded = pairs.len();

        let index = VectorIndex::build(
            self.embedder.model_id(),
            self.embedder.dimension(),
            self.chunker.params(),
            pairs,
        )?;

        tracing::info!(
            entries = index.len(),
            skipped = report.skipped,
            "Vector index built"
        );

        Ok((index, report))
    }

    fn embed_individually(
        &self,
        batch: &[TextChunk],
        pairs: &mut Vec<(TextChunk, Vec<f32>)>,
        report: &mut BuildReport,
    ) {
        for chunk in batch {
            match self.embedder.embed(&chunk.content) {
                Ok(vector) => pairs.push((chunk.clone(), vector)),
                Err(e) => {
                    tracing::warn!(
                        source = %chunk.source,
                        kind = chunk.kind.as_str(),
                        page = chunk.page,
                        chunk_index = chunk.chunk_index,
                        "Skipping chunk that failed to embed: {e}"
                    );
                    report.skipped += 1;
                }
            }
        }
    }
}
