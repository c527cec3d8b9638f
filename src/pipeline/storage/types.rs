use serde::{Deserialize, Serialize};

use super::vectordb::ChunkingParams;
use super::StorageError;
use crate::pipeline::ingest::{SourceDocument, SourceKind};

/// A bounded window of a source document, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub content: String,
    /// Position within its source document
    pub chunk_index: usize,
    /// Character (not byte) offset into the source document text
    pub char_offset: usize,
    pub source: String,
    pub kind: SourceKind,
    pub page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A chunk with its similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, document: &SourceDocument) -> Vec<TextChunk>;

    /// Parameters recorded in the index manifest, if the strategy has any.
    fn params(&self) -> Option<ChunkingParams> {
        None
    }

    /// Chunk every document in order.
    fn chunk_documents(&self, documents: &[SourceDocument]) -> Vec<TextChunk> {
        documents.iter().flat_map(|d| self.chunk(d)).collect()
    }
}

/// Embedding model abstraction.
///
/// `model_id` pins the vector space: vectors from different ids are not comparable.
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError>;
    fn dimension(&self) -> usize;
    fn model_id(&self) -> &str;
}

/// Allow `Box<dyn EmbeddingModel>` to be used as `&impl EmbeddingModel`.
impl EmbeddingModel for Box<dyn EmbeddingModel> {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        (**self).embed_batch(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}
