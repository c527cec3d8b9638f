use std::path::Path;

use sha2::{Digest, Sha256};

use super::types::EmbeddingModel;
use super::StorageError;

/// Standard embedding dimension for all-MiniLM-L6-v2
pub const EMBEDDING_DIM: usize = 384;

/// Identifier persisted with indexes built by [`HashedEmbedder`].
pub const HASHED_MODEL_ID: &str = "heartguard/hashed-bow-384-v1";

/// Identifier persisted with indexes built by the ONNX model.
pub const ONNX_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

// ═══════════════════════════════════════════════════════════
// ONNX Embedder (behind `onnx-embeddings` feature)
// ═══════════════════════════════════════════════════════════

#[cfg(feature = "onnx-embeddings")]
mod onnx {
    use super::{l2_normalize, mean_pool, EmbeddingModel, StorageError, EMBEDDING_DIM, ONNX_MODEL_ID};
    use ort::session::Session;
    use std::path::Path;
    use std::sync::Mutex;

    /// Longest token sequence fed to the model; longer chunks are truncated.
    const MAX_SEQ_LEN: usize = 256;

    /// all-MiniLM-L6-v2 sentence embeddings via ONNX Runtime.
    ///
    /// Requires `model.onnx` and `tokenizer.json` in the model directory.
    /// `Session::run` needs `&mut self`, so the session sits behind a mutex and
    /// concurrent callers are serialized.
    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: tokenizers::Tokenizer,
    }

    struct Encoded {
        input_ids: Vec<i64>,
        attention_mask: Vec<i64>,
        token_type_ids: Vec<i64>,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self, StorageError> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(StorageError::ModelNotFound(model_path));
            }
            if !tokenizer_path.exists() {
                return Err(StorageError::ModelNotFound(tokenizer_path));
            }

            let session = Session::builder()
                .map_err(|e: ort::Error| StorageError::ModelInit(e.to_string()))?
                .with_intra_threads(2)
                .map_err(|e: ort::Error| StorageError::ModelInit(e.to_string()))?
                .commit_from_file(&model_path)
                .map_err(|e: ort::Error| StorageError::ModelInit(format!("ONNX load failed: {e}")))?;

            let mut tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| StorageError::ModelInit(format!("Tokenizer load failed: {e}")))?;
            tokenizer
                .with_truncation(Some(tokenizers::TruncationParams {
                    max_length: MAX_SEQ_LEN,
                    ..Default::default()
                }))
                .map_err(|e| StorageError::ModelInit(format!("Tokenizer truncation: {e}")))?;

            tracing::info!(model = ONNX_MODEL_ID, dir = %model_dir.display(), "ONNX embedder loaded");

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
            })
        }

        fn encode(&self, text: &str) -> Result<Encoded, StorageError> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| StorageError::Tokenization(e.to_string()))?;

            let widen = |xs: &[u32]| xs.iter().map(|&x| x as i64).collect::<Vec<i64>>();
            Ok(Encoded {
                input_ids: widen(encoding.get_ids()),
                attention_mask: widen(encoding.get_attention_mask()),
                token_type_ids: widen(encoding.get_type_ids()),
            })
        }

        /// Tokenize, run the model, mean-pool over the attention mask, L2-normalize.
        fn infer(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            use ort::value::TensorRef;

            let encoded = self.encode(text)?;
            let seq_len = encoded.input_ids.len();
            let shaped = |v: Vec<i64>| {
                ndarray::Array2::from_shape_vec((1, seq_len), v)
                    .map_err(|e| StorageError::Embedding(e.to_string()))
            };

            let ids_array = shaped(encoded.input_ids)?;
            let mask_array = shaped(encoded.attention_mask.clone())?;
            let type_array = shaped(encoded.token_type_ids)?;

            let ids_tensor = TensorRef::from_array_view(&ids_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;
            let mask_tensor = TensorRef::from_array_view(&mask_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;
            let type_tensor = TensorRef::from_array_view(&type_array)
                .map_err(|e| StorageError::Embedding(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| StorageError::Embedding("Session lock poisoned".to_string()))?;

            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_tensor])
                .map_err(|e| StorageError::Embedding(format!("ONNX inference failed: {e}")))?;

            let (shape, hidden) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| StorageError::Embedding(format!("Output extraction: {e}")))?;

            let dims: Vec<i64> = shape.iter().copied().collect();
            let mut pooled = mean_pool(hidden, &dims, &encoded.attention_mask)?;
            l2_normalize(&mut pooled);
            Ok(pooled)
        }
    }

    impl EmbeddingModel for OnnxEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
            self.infer(text)
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
            texts.iter().map(|t| self.infer(t)).collect()
        }

        fn dimension(&self) -> usize {
            EMBEDDING_DIM
        }

        fn model_id(&self) -> &str {
            ONNX_MODEL_ID
        }
    }
}

#[cfg(feature = "onnx-embeddings")]
pub use onnx::OnnxEmbedder;

/// Feature-hashing bag-of-words embedder.
///
/// Each lower-cased alphanumeric token is hashed (SHA-256) into one of
/// `dimension` buckets with a hash-derived sign. Lexical rather than semantic,
/// but deterministic across platforms and builds, with no model files.
pub struct HashedEmbedder {
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: EMBEDDING_DIM,
        }
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for HashedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError> {
        Ok(hashed_vector(text, self.dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError> {
        Ok(texts
            .iter()
            .map(|t| hashed_vector(t, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        HASHED_MODEL_ID
    }
}

fn hashed_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let digest = Sha256::digest(token.to_lowercase().as_bytes());
        let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % dim;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        vec[bucket] += sign;
    }

    l2_normalize(&mut vec);
    vec
}

/// Scale `vec` to unit length; zero vectors are left unchanged.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vec.iter_mut() {
            *val /= norm;
        }
    }
}

/// Average the token rows of a `[1, seq_len, EMBEDDING_DIM]` model output,
/// weighted by the attention mask.
///
/// Any other output shape is an `Embedding` error.
pub fn mean_pool(
    hidden: &[f32],
    shape: &[i64],
    attention_mask: &[i64],
) -> Result<Vec<f32>, StorageError> {
    let seq_len = attention_mask.len();
    let expected = [1, seq_len as i64, EMBEDDING_DIM as i64];
    if shape != expected.as_slice() || hidden.len() != seq_len * EMBEDDING_DIM {
        return Err(StorageError::Embedding(format!(
            "Unexpected output shape: {shape:?} ({} values), expected {expected:?}",
            hidden.len()
        )));
    }

    let mut pooled = vec![0.0f32; EMBEDDING_DIM];
    let mut mask_sum = 0.0f32;

    for (row, &mask) in hidden.chunks_exact(EMBEDDING_DIM).zip(attention_mask) {
        let weight = mask as f32;
        mask_sum += weight;
        for (p, h) in pooled.iter_mut().zip(row) {
            *p += h * weight;
        }
    }

    if mask_sum > 0.0 {
        for val in &mut pooled {
            *val /= mask_sum;
        }
    }
    Ok(pooled)
}

/// Build the runtime embedder.
///
/// With `onnx-embeddings` this loads all-MiniLM-L6-v2 from `model_dir` and
/// fails if the model files are missing; otherwise the hashed embedder is used.
pub fn build_embedder(model_dir: &Path) -> Result<Box<dyn EmbeddingModel>, StorageError> {
    #[cfg(feature = "onnx-embeddings")]
    {
        let embedder = OnnxEmbedder::load(model_dir)?;
        Ok(Box::new(embedder))
    }

    #[cfg(not(feature = "onnx-embeddings"))]
    {
        tracing::debug!(
            dir = %model_dir.display(),
            "onnx-embeddings disabled, using hashed embedder"
        );
        Ok(Box::new(HashedEmbedder::new()))
    }
}
