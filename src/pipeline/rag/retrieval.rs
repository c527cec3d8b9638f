use super::types::{ScoredChunk, VectorSearch};
use super::RagError;
use crate::pipeline::storage::types::EmbeddingModel;
use crate::pipeline::storage::vectordb::VectorIndex;

impl VectorSearch for VectorIndex {
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        VectorIndex::search(self, query_embedding, top_k)
            .map_err(|e| RagError::VectorSearch(e.to_string()))
    }

    fn len(&self) -> usize {
        VectorIndex::len(self)
    }
}

/// Embed the query text and run semantic search.
pub fn semantic_search(
    query_text: &str,
    embedder: &dyn EmbeddingModel,
    vector_store: &dyn VectorSearch,
    top_k: usize,
) -> Result<Vec<ScoredChunk>, RagError> {
    let query_embedding = embedder
        .embed(query_text)
        .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;

    vector_store.search(&query_embedding, top_k)
}

/// Join retrieved chunk texts, best first, one per line.
pub fn join_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ingest::SourceKind;
    use crate::pipeline::storage::embedder::HashedEmbedder;
    use crate::pipeline::storage::types::TextChunk;
    use crate::pipeline::storage::StorageError;

    fn chunk(content: &str) -> TextChunk {
        TextChunk {
            content: content.to_string(),
            chunk_index: 0,
            char_offset: 0,
            source: "diretriz.pdf".into(),
            kind: SourceKind::Pdf,
            page: 1,
            title: None,
        }
    }

    fn index(embedder: &HashedEmbedder, texts: &[&str]) -> VectorIndex {
        let pairs = texts
            .iter()
            .map(|t| (chunk(t), embedder.embed(t).unwrap()))
            .collect();
        VectorIndex::build(embedder.model_id(), embedder.dimension(), None, pairs).unwrap()
    }

    struct BrokenEmbedder;

    impl EmbeddingModel for BrokenEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, StorageError> {
            Err(StorageError::Embedding("no session".into()))
        }
        fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            Err(StorageError::Embedding("no session".into()))
        }
        fn dimension(&self) -> usize {
            384
        }
        fn model_id(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn semantic_search_finds_related_chunk_first() {
        let embedder = HashedEmbedder::new();
        let index = index(
            &embedder,
            &[
                "dieta e atividade física na hipertensão",
                "amiodarona para taquicardia ventricular",
                "vacinação do adulto",
            ],
        );

        let results =
            semantic_search("taquicardia ventricular amiodarona", &embedder, &index, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "amiodarona para taquicardia ventricular");
    }

    #[test]
    fn embedding_failure_is_reported() {
        let embedder = HashedEmbedder::new();
        let index = index(&embedder, &["qualquer texto"]);
        let result = semantic_search("consulta", &BrokenEmbedder, &index, 2);
        assert!(matches!(result, Err(RagError::EmbeddingFailed(_))));
    }

    #[test]
    fn wrong_dimension_is_a_search_error() {
        let embedder = HashedEmbedder::new();
        let index = index(&embedder, &["qualquer texto"]);
        let result = VectorSearch::search(&index, &[1.0, 0.0], 1);
        assert!(matches!(result, Err(RagError::VectorSearch(_))));
    }

    #[test]
    fn context_joins_with_newlines() {
        let chunks = vec![
            ScoredChunk { chunk: chunk("primeiro"), score: 0.9 },
            ScoredChunk { chunk: chunk("segundo"), score: 0.5 },
        ];
        assert_eq!(join_context(&chunks), "primeiro\nsegundo");
        assert_eq!(join_context(&[]), "");
    }
}
