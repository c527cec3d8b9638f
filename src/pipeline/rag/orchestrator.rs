use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::classify::classify_signal;
use super::compose::compose_advisory;
use super::retrieval::{join_context, semantic_search};
use super::types::{AdvisoryQuery, VectorSearch};
use super::RagError;
use crate::config::{EVIDENCE_CHAR_LIMIT, RETRIEVAL_TOP_K};
use crate::pipeline::storage::types::EmbeddingModel;
use crate::pipeline::storage::vectordb::VectorIndex;
use crate::pipeline::storage::StorageError;

/// Retrieval tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantConfig {
    pub top_k: usize,
    /// Max characters of retrieved context shown as evidence
    pub evidence_chars: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            top_k: RETRIEVAL_TOP_K,
            evidence_chars: EVIDENCE_CHAR_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Ready,
    Degraded,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Ready => "ready",
            RetrievalMode::Degraded => "degraded",
        }
    }
}

/// Snapshot of assistant state and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantStats {
    pub mode: RetrievalMode,
    pub model_id: Option<String>,
    pub entry_count: usize,
    pub total_responses: u64,
    /// Responses produced without retrieved context
    pub degraded_responses: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

enum Retrieval {
    Ready {
        embedder: Box<dyn EmbeddingModel>,
        index: Box<dyn VectorSearch>,
    },
    Degraded {
        reason: String,
    },
}

/// Query-time advisory service.
///
/// Built once at startup and shared behind an `Arc`. Retrieval failures never
/// escape `get_advice`: they degrade that response to the template-only path
/// and are counted.
pub struct MedicalAssistant {
    retrieval: Retrieval,
    config: AssistantConfig,
    total_responses: AtomicU64,
    degraded_responses: AtomicU64,
}

impl MedicalAssistant {
    /// Open the persisted index in `index_dir` with the runtime embedder.
    ///
    /// A missing model or a missing/unreadable index puts the assistant in
    /// degraded mode for its lifetime. An index built with a different model
    /// or dimension is a fatal `ModelMismatch`.
    pub fn open(
        index_dir: &Path,
        embedder: Result<Box<dyn EmbeddingModel>, StorageError>,
    ) -> Result<Self, RagError> {
        let embedder = match embedder {
            Ok(embedder) => embedder,
            Err(e) => {
                tracing::error!("Embedding model failed to load, retrieval disabled: {e}");
                return Ok(Self::degraded(format!("embedding model unavailable: {e}")));
            }
        };

        let index = match VectorIndex::load(index_dir) {
            Ok(index) => index,
            Err(StorageError::IndexNotFound(dir)) => {
                tracing::warn!(dir = %dir.display(), "No vector index found, retrieval disabled");
                return Ok(Self::degraded(format!(
                    "vector index not found at {}",
                    dir.display()
                )));
            }
            Err(e) => {
                tracing::error!(dir = %index_dir.display(), "Vector index unreadable, retrieval disabled: {e}");
                return Ok(Self::degraded(format!("vector index unreadable: {e}")));
            }
        };

        Self::from_index(embedder, index)
    }

    /// Wrap a loaded index, checking it was built with the same embedder.
    pub fn from_index(
        embedder: Box<dyn EmbeddingModel>,
        index: VectorIndex,
    ) -> Result<Self, RagError> {
        if index.model_id() != embedder.model_id() || index.dimension() != embedder.dimension() {
            return Err(RagError::ModelMismatch {
                index_model: index.model_id().to_string(),
                index_dimension: index.dimension(),
                runtime_model: embedder.model_id().to_string(),
                runtime_dimension: embedder.dimension(),
            });
        }

        tracing::info!(
            model = %embedder.model_id(),
            entries = index.len(),
            "Retrieval ready"
        );

        Ok(Self::from_parts(embedder, Box::new(index)))
    }

    /// Assemble from any search backend. No model check is done here.
    pub fn from_parts(embedder: Box<dyn EmbeddingModel>, index: Box<dyn VectorSearch>) -> Self {
        Self {
            retrieval: Retrieval::Ready { embedder, index },
            config: AssistantConfig::default(),
            total_responses: AtomicU64::new(0),
            degraded_responses: AtomicU64::new(0),
        }
    }

    /// Template-only assistant.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            retrieval: Retrieval::Degraded {
                reason: reason.into(),
            },
            config: AssistantConfig::default(),
            total_responses: AtomicU64::new(0),
            degraded_responses: AtomicU64::new(0),
        }
    }

    /// At least one snippet is always retrieved.
    pub fn with_config(mut self, config: AssistantConfig) -> Self {
        self.config = AssistantConfig {
            top_k: config.top_k.max(1),
            ..config
        };
        self
    }

    pub fn config(&self) -> AssistantConfig {
        self.config
    }

    pub fn mode(&self) -> RetrievalMode {
        match self.retrieval {
            Retrieval::Ready { .. } => RetrievalMode::Ready,
            Retrieval::Degraded { .. } => RetrievalMode::Degraded,
        }
    }

    /// Produce the advisory text for a vital-signs event. Never fails.
    pub fn get_advice(&self, query: &AdvisoryQuery) -> String {
        self.total_responses.fetch_add(1, Ordering::Relaxed);

        let context = match self.retrieve_context(query) {
            Some(context) => context,
            None => {
                self.degraded_responses.fetch_add(1, Ordering::Relaxed);
                String::new()
            }
        };

        let tier = classify_signal(&query.signal_classification);
        tracing::debug!(
            tier = tier.as_str(),
            context_chars = context.chars().count(),
            "Composing advisory"
        );

        compose_advisory(tier, query.context(), &context, self.config.evidence_chars)
    }

    /// Four-string form of [`get_advice`](Self::get_advice).
    pub fn advise(
        &self,
        signal_classification: &str,
        blood_pressure: &str,
        oxygen_saturation: &str,
        deployment_context: &str,
    ) -> String {
        self.get_advice(&AdvisoryQuery::new(
            signal_classification,
            blood_pressure,
            oxygen_saturation,
            deployment_context,
        ))
    }

    pub fn stats(&self) -> AssistantStats {
        let (model_id, entry_count, degraded_reason) = match &self.retrieval {
            Retrieval::Ready { embedder, index } => {
                (Some(embedder.model_id().to_string()), index.len(), None)
            }
            Retrieval::Degraded { reason } => (None, 0, Some(reason.clone())),
        };

        AssistantStats {
            mode: self.mode(),
            model_id,
            entry_count,
            total_responses: self.total_responses.load(Ordering::Relaxed),
            degraded_responses: self.degraded_responses.load(Ordering::Relaxed),
            degraded_reason,
        }
    }

    /// `None` when no context could be retrieved for this query.
    fn retrieve_context(&self, query: &AdvisoryQuery) -> Option<String> {
        let (embedder, index) = match &self.retrieval {
            Retrieval::Ready { embedder, index } => (embedder, index),
            Retrieval::Degraded { .. } => return None,
        };

        match semantic_search(
            &query.search_text(),
            embedder.as_ref(),
            index.as_ref(),
            self.config.top_k,
        ) {
            Ok(chunks) => Some(join_context(&chunks)),
            Err(e) => {
                tracing::warn!("Retrieval failed, answering without context: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::ingest::{SourceDocument, SourceKind};
    use crate::pipeline::rag::compose::{
        CRITICAL_ALERT, EVIDENCE_HEADER, MODERATE_ALERT, RURAL_PROTOCOL, STABLE_MESSAGE,
        URBAN_PROTOCOL,
    };
    use crate::pipeline::rag::types::ScoredChunk;
    use crate::pipeline::storage::chunker::RecursiveChunker;
    use crate::pipeline::storage::embedder::{HashedEmbedder, HASHED_MODEL_ID};
    use crate::pipeline::storage::orchestrator::IndexBuilder;
    use crate::pipeline::storage::types::TextChunk;

    const AMIODARONA: &str =
        "Na taquicardia ventricular com pulso, administrar amiodarona 150 mg IV em 10 minutos.";
    const CHAGAS: &str =
        "A cardiopatia chagásica crônica é causa frequente de arritmia ventricular no Brasil.";
    const HIPERTENSAO: &str = "Na hipertensão estágio 1, iniciar mudança de estilo de vida.";

    fn doc(text: &str, page: usize) -> SourceDocument {
        SourceDocument {
            text: text.to_string(),
            source: "diretriz.pdf".into(),
            kind: SourceKind::Pdf,
            page,
            title: None,
        }
    }

    fn hashed() -> Box<dyn EmbeddingModel> {
        Box::new(HashedEmbedder::new())
    }

    fn saved_index(dir: &Path, texts: &[&str]) {
        let documents: Vec<SourceDocument> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| doc(t, i + 1))
            .collect();
        let builder = IndexBuilder::new(RecursiveChunker::default(), HashedEmbedder::new());
        let (index, _) = builder.build(&documents).unwrap();
        index.save(dir).unwrap();
    }

    fn ready_assistant(texts: &[&str]) -> (tempfile::TempDir, MedicalAssistant) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("index");
        saved_index(&dir, texts);
        let assistant = MedicalAssistant::open(&dir, Ok(hashed())).unwrap();
        (tmp, assistant)
    }

    struct FailingSearch;

    impl VectorSearch for FailingSearch {
        fn search(&self, _q: &[f32], _k: usize) -> Result<Vec<ScoredChunk>, RagError> {
            Err(RagError::VectorSearch("index offline".into()))
        }

        fn len(&self) -> usize {
            3
        }
    }

    #[test]
    fn missing_index_degrades_to_stable_template() {
        let tmp = tempfile::tempdir().unwrap();
        let assistant = MedicalAssistant::open(&tmp.path().join("absent"), Ok(hashed())).unwrap();

        let text = assistant.advise("ESTAVEL", "120/80", "98%", "URBAN");

        assert!(text.contains(STABLE_MESSAGE));
        assert!(!text.contains(EVIDENCE_HEADER));
        let stats = assistant.stats();
        assert_eq!(stats.mode, RetrievalMode::Degraded);
        assert_eq!(stats.degraded_responses, 1);
        assert_eq!(stats.total_responses, 1);
        assert!(stats.degraded_reason.unwrap().contains("not found"));
    }

    #[test]
    fn model_load_failure_degrades() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("index");
        saved_index(&dir, &[AMIODARONA]);

        let assistant = MedicalAssistant::open(
            &dir,
            Err(StorageError::ModelNotFound(tmp.path().join("models"))),
        )
        .unwrap();

        assert_eq!(assistant.mode(), RetrievalMode::Degraded);
        let text = assistant.advise("TAQUICARDIA VENTRICULAR", "180/110", "85%", "URBAN");
        assert!(text.contains(CRITICAL_ALERT));
        assert!(!text.contains(EVIDENCE_HEADER));
        assert_eq!(assistant.stats().degraded_responses, 1);
    }

    #[test]
    fn unreadable_index_degrades() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("index.faiss"), b"not ours").unwrap();

        let assistant = MedicalAssistant::open(tmp.path(), Ok(hashed())).unwrap();
        assert_eq!(assistant.mode(), RetrievalMode::Degraded);
        assert!(assistant.stats().degraded_reason.unwrap().contains("unreadable"));
    }

    #[test]
    fn critical_rural_includes_protocol_and_evidence() {
        let (_tmp, assistant) = ready_assistant(&[AMIODARONA, CHAGAS, HIPERTENSAO]);

        let text = assistant.advise("TAQUICARDIA VENTRICULAR", "180/110", "85%", "RURAL_REMOTA");

        assert!(text.contains(CRITICAL_ALERT));
        assert!(text.contains(RURAL_PROTOCOL));
        assert!(!text.contains(URBAN_PROTOCOL));
        assert!(text.contains(EVIDENCE_HEADER));
        assert!(text.contains(AMIODARONA));
        let stats = assistant.stats();
        assert_eq!(stats.mode, RetrievalMode::Ready);
        assert_eq!(stats.model_id.as_deref(), Some(HASHED_MODEL_ID));
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.degraded_responses, 0);
    }

    #[test]
    fn evidence_uses_top_two_chunks() {
        let (_tmp, assistant) = ready_assistant(&[AMIODARONA, CHAGAS, HIPERTENSAO]);

        let text = assistant.advise("TAQUICARDIA VENTRICULAR", "180/110", "85%", "URBAN");
        let evidence = text.split(EVIDENCE_HEADER).nth(1).unwrap();

        assert_eq!(evidence.trim_end_matches("...").lines().count(), 2);
        assert!(text.contains(URBAN_PROTOCOL));
    }

    #[test]
    fn moderate_surfaces_no_context() {
        let (_tmp, assistant) = ready_assistant(&[AMIODARONA, CHAGAS]);

        let text = assistant.advise("ARRITMIA SUPRAVENTRICULAR", "130/85", "96%", "URBAN");

        assert!(text.contains(MODERATE_ALERT));
        assert!(!text.contains(AMIODARONA));
        assert!(!text.contains(CHAGAS));
        assert!(!text.contains(EVIDENCE_HEADER));
    }

    #[test]
    fn single_entry_index_still_answers() {
        let (_tmp, assistant) = ready_assistant(&[CHAGAS]);

        let text = assistant.advise("PERIGO", "90/60", "88%", "RURAL_REMOTE");

        assert!(text.contains(RURAL_PROTOCOL));
        assert!(text.ends_with(&format!("{CHAGAS}...")));
        assert_eq!(assistant.stats().degraded_responses, 0);
    }

    #[test]
    fn multi_keyword_classification_is_critical() {
        let (_tmp, assistant) = ready_assistant(&[AMIODARONA]);
        let text = assistant.advise("ARRITMIA VENTRICULAR", "150/95", "91%", "URBAN");
        assert!(text.contains(CRITICAL_ALERT));
        assert!(!text.contains(MODERATE_ALERT));
    }

    #[test]
    fn search_failure_degrades_single_response() {
        let assistant = MedicalAssistant::from_parts(hashed(), Box::new(FailingSearch));

        let text = assistant.advise("TAQUICARDIA VENTRICULAR", "180/110", "85%", "URBAN");

        assert!(text.contains(CRITICAL_ALERT));
        assert!(!text.contains(EVIDENCE_HEADER));
        let stats = assistant.stats();
        assert_eq!(stats.mode, RetrievalMode::Ready);
        assert_eq!(stats.degraded_responses, 1);
    }

    #[test]
    fn index_from_other_model_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("index");
        let vector = HashedEmbedder::new().embed(AMIODARONA).unwrap();
        let chunk = TextChunk {
            content: AMIODARONA.into(),
            chunk_index: 0,
            char_offset: 0,
            source: "diretriz.pdf".into(),
            kind: SourceKind::Pdf,
            page: 1,
            title: None,
        };
        VectorIndex::build("sentence-transformers/other", 384, None, vec![(chunk, vector)])
            .unwrap()
            .save(&dir)
            .unwrap();

        let result = MedicalAssistant::open(&dir, Ok(hashed()));
        assert!(matches!(result, Err(RagError::ModelMismatch { .. })));
    }

    #[test]
    fn index_with_other_dimension_is_fatal() {
        let index = VectorIndex::build(HASHED_MODEL_ID, 3, None, vec![]).unwrap();
        let result = MedicalAssistant::from_index(hashed(), index);
        assert!(matches!(
            result,
            Err(RagError::ModelMismatch { index_dimension: 3, runtime_dimension: 384, .. })
        ));
    }

    #[test]
    fn custom_config_limits_evidence() {
        let (_tmp, assistant) = ready_assistant(&[AMIODARONA, CHAGAS]);
        let assistant = assistant.with_config(AssistantConfig {
            top_k: 1,
            evidence_chars: 10,
        });

        let text = assistant.advise("PERIGO", "90/60", "88%", "URBAN");
        let evidence = text.split(EVIDENCE_HEADER).nth(1).unwrap();
        assert_eq!(evidence.chars().count(), 13);
    }

    #[test]
    fn config_overrides_keep_at_least_one_snippet() {
        let assistant = MedicalAssistant::degraded("no index");
        assert_eq!(assistant.config(), AssistantConfig::default());

        let assistant = assistant.with_config(AssistantConfig {
            top_k: 0,
            evidence_chars: 500,
        });
        assert_eq!(
            assistant.config(),
            AssistantConfig {
                top_k: 1,
                evidence_chars: 500,
            }
        );
    }

    #[test]
    fn concurrent_callers_share_one_assistant() {
        let (_tmp, assistant) = ready_assistant(&[AMIODARONA, CHAGAS]);
        let assistant = Arc::new(assistant);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let assistant = Arc::clone(&assistant);
                std::thread::spawn(move || {
                    assistant.advise("TAQUICARDIA VENTRICULAR", "180/110", "85%", "URBAN")
                })
            })
            .collect();

        let answers: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(answers.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(assistant.stats().total_responses, 8);
    }
}
