pub mod types;
pub mod chunker;
pub mod embedder;
pub mod vectordb;
pub mod orchestrator;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Vector index not found: {0}")]
    IndexNotFound(PathBuf),

    #[error("Vector index unreadable: {0}")]
    Deserialization(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid chunking parameters: {0}")]
    InvalidChunkConfig(String),

    #[error("Embedding model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Embedding model initialization: {0}")]
    ModelInit(String),

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Chunking produced no results")]
    EmptyChunks,
}
