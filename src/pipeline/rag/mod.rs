pub mod types;
pub mod classify;
pub mod retrieval;
pub mod compose;
pub mod orchestrator;

pub use orchestrator::{AssistantConfig, AssistantStats, MedicalAssistant, RetrievalMode};
pub use types::{AdvisoryQuery, DeploymentContext, SeverityTier};

use thiserror::Error;

use crate::pipeline::storage::StorageError;

#[derive(Error, Debug)]
pub enum RagError {
    #[error(
        "Index was built with '{index_model}' ({index_dimension} dims) but the runtime embedder is '{runtime_model}' ({runtime_dimension} dims)"
    )]
    ModelMismatch {
        index_model: String,
        index_dimension: usize,
        runtime_model: String,
        runtime_dimension: usize,
    },

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
