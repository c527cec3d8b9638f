use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "HeartGuard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the data directory (index, models, source manifest).
pub const DATA_DIR_ENV: &str = "HEARTGUARD_DATA_DIR";

/// Identifies ingestion traffic to source servers.
pub const INGEST_USER_AGENT: &str = "HeartGuard-Ingest/1.0";

/// Seconds before a single source download is abandoned.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Chunking parameters used for the reference corpus.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Number of chunks spliced into each advisory.
pub const RETRIEVAL_TOP_K: usize = 2;

/// Characters of retrieved evidence shown in a critical advisory.
pub const EVIDENCE_CHAR_LIMIT: usize = 2000;

/// Default bind address for `heartguard serve`.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Get the application data directory.
/// `$HEARTGUARD_DATA_DIR` when set, otherwise ~/HeartGuard/.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the persisted vector index directory
pub fn index_dir() -> PathBuf {
    app_data_dir().join("index")
}

/// Get the models directory (for ONNX embeddings)
pub fn models_dir() -> PathBuf {
    app_data_dir().join("models")
}

/// Get the embedding model directory (all-MiniLM-L6-v2)
pub fn embedding_model_dir() -> PathBuf {
    models_dir().join("all-MiniLM-L6-v2")
}

/// Get the reference PDF directory used by the default corpus
pub fn corpus_dir() -> PathBuf {
    app_data_dir().join("corpus")
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "heartguard=info,heartguard_lib=info,tower_http=warn"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_dir_under_app_data() {
        let index = index_dir();
        let app = app_data_dir();
        assert!(index.starts_with(app));
        assert!(index.ends_with("index"));
    }

    #[test]
    fn embedding_model_dir_under_models() {
        let dir = embedding_model_dir();
        assert!(dir.starts_with(models_dir()));
        assert!(dir.ends_with("all-MiniLM-L6-v2"));
    }

    #[test]
    fn app_name_is_heartguard() {
        assert_eq!(APP_NAME, "HeartGuard");
    }

    #[test]
    fn chunk_overlap_smaller_than_chunk_size() {
        assert!(DEFAULT_CHUNK_OVERLAP < DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn log_filter_targets_crate() {
        assert!(default_log_filter().contains("heartguard"));
    }
}
