//! Flat vector index with a directory-based on-disk format.
//!
//! Layout of a persisted index directory:
//! - `manifest.json`: format tag, model id, dimension, entry count, creation
//!   time and checksums. Readable on its own via [`read_manifest`].
//! - `vectors.bin`: magic + u32 dimension + u64 count + f32 LE rows.
//! - `chunks.json`: chunk text and source metadata, same order as the rows.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::embedder::l2_normalize;
use super::types::{ScoredChunk, TextChunk};
use super::StorageError;

pub const INDEX_FORMAT: &str = "heartguard-vector-index";
pub const INDEX_FORMAT_VERSION: u32 = 1;

const VECTORS_MAGIC: &[u8; 8] = b"HGVECT01";
const VECTORS_HEADER_LEN: usize = 8 + 4 + 8;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.bin";

/// Chunking parameters an index was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    pub max_chunk_chars: usize,
    pub overlap_chars: usize,
}

/// Index metadata, stored separately from the entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format: String,
    pub format_version: u32,
    pub index_id: Uuid,
    pub model_id: String,
    pub dimension: usize,
    pub entry_count: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub chunking: Option<ChunkingParams>,
    pub vectors_sha256: String,
    pub chunks_sha256: String,
}

/// One stored chunk and its unit-length vector.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: TextChunk,
    pub vector: Vec<f32>,
}

/// Immutable flat index. Search is exhaustive inner product over unit vectors.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    index_id: Uuid,
    model_id: String,
    dimension: usize,
    created_at: DateTime<Utc>,
    chunking: Option<ChunkingParams>,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from chunk/vector pairs. Vectors are normalized on insert.
    pub fn build(
        model_id: &str,
        dimension: usize,
        chunking: Option<ChunkingParams>,
        pairs: Vec<(TextChunk, Vec<f32>)>,
    ) -> Result<Self, StorageError> {
        let mut entries = Vec::with_capacity(pairs.len());
        for (chunk, mut vector) in pairs {
            if vector.len() != dimension {
                return Err(StorageError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            l2_normalize(&mut vector);
            entries.push(IndexEntry { chunk, vector });
        }

        Ok(Self {
            index_id: Uuid::new_v4(),
            model_id: model_id.to_string(),
            dimension,
            created_at: Utc::now(),
            chunking,
            entries,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn index_id(&self) -> Uuid {
        self.index_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn chunking(&self) -> Option<ChunkingParams> {
        self.chunking
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The `min(k, len)` most similar entries, best first.
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StorageError> {
        if query.len() != self.dimension {
            return Err(StorageError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        l2_normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, dot(&query, &entry.vector)))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect())
    }

    /// Persist to `dir`, replacing whatever index is there.
    ///
    /// Files are written to a sibling staging directory first and swapped in
    /// once complete.
    pub fn save(&self, dir: &Path) -> Result<IndexManifest, StorageError> {
        let staging = staging_dir(dir);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        let vectors = encode_vectors(self.dimension, &self.entries);
        let chunks: Vec<&TextChunk> = self.entries.iter().map(|e| &e.chunk).collect();
        let chunks_json = serde_json::to_vec(&chunks)?;

        let manifest = IndexManifest {
            format: INDEX_FORMAT.to_string(),
            format_version: INDEX_FORMAT_VERSION,
            index_id: self.index_id,
            model_id: self.model_id.clone(),
            dimension: self.dimension,
            entry_count: self.entries.len(),
            created_at: self.created_at,
            chunking: self.chunking,
            vectors_sha256: checksum(&vectors),
            chunks_sha256: checksum(&chunks_json),
        };

        write_file(&staging.join(VECTORS_FILE), &vectors)?;
        write_file(&staging.join(CHUNKS_FILE), &chunks_json)?;
        write_file(
            &staging.join(MANIFEST_FILE),
            &serde_json::to_vec_pretty(&manifest)?,
        )?;

        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::rename(&staging, dir)?;

        tracing::info!(
            dir = %dir.display(),
            entries = manifest.entry_count,
            model = %manifest.model_id,
            "Vector index saved"
        );

        Ok(manifest)
    }

    /// Load a persisted index. A directory that is not a valid index is a
    /// `Deserialization` error, never an empty index.
    pub fn load(dir: &Path) -> Result<Self, StorageError> {
        let manifest = read_manifest(dir)?;

        let vectors = read_part(dir, VECTORS_FILE)?;
        verify_checksum(VECTORS_FILE, &vectors, &manifest.vectors_sha256)?;
        let rows = decode_vectors(&vectors, manifest.dimension, manifest.entry_count)?;

        let chunks_json = read_part(dir, CHUNKS_FILE)?;
        verify_checksum(CHUNKS_FILE, &chunks_json, &manifest.chunks_sha256)?;
        let chunks: Vec<TextChunk> = serde_json::from_slice(&chunks_json)
            .map_err(|e| StorageError::Deserialization(format!("{CHUNKS_FILE}: {e}")))?;

        if chunks.len() != manifest.entry_count {
            return Err(StorageError::Deserialization(format!(
                "{CHUNKS_FILE} has {} entries, manifest declares {}",
                chunks.len(),
                manifest.entry_count
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(rows)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        tracing::info!(
            dir = %dir.display(),
            entries = manifest.entry_count,
            model = %manifest.model_id,
            "Vector index loaded"
        );

        Ok(Self {
            index_id: manifest.index_id,
            model_id: manifest.model_id,
            dimension: manifest.dimension,
            created_at: manifest.created_at,
            chunking: manifest.chunking,
            entries,
        })
    }
}

/// Read only the manifest of a persisted index.
pub fn read_manifest(dir: &Path) -> Result<IndexManifest, StorageError> {
    if !dir.is_dir() {
        return Err(StorageError::IndexNotFound(dir.to_path_buf()));
    }

    let raw = read_part(dir, MANIFEST_FILE)?;
    let manifest: IndexManifest = serde_json::from_slice(&raw)
        .map_err(|e| StorageError::Deserialization(format!("{MANIFEST_FILE}: {e}")))?;

    if manifest.format != INDEX_FORMAT {
        return Err(StorageError::Deserialization(format!(
            "unexpected index format '{}'",
            manifest.format
        )));
    }
    if manifest.format_version != INDEX_FORMAT_VERSION {
        return Err(StorageError::Deserialization(format!(
            "unsupported index format version {}",
            manifest.format_version
        )));
    }
    if manifest.dimension == 0 {
        return Err(StorageError::Deserialization("index dimension is zero".into()));
    }

    Ok(manifest)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn staging_dir(dir: &Path) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".staging");
    dir.with_file_name(name)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn read_part(dir: &Path, name: &str) -> Result<Vec<u8>, StorageError> {
    std::fs::read(dir.join(name))
        .map_err(|e| StorageError::Deserialization(format!("{name}: {e}")))
}

fn checksum(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(bytes))
}

fn verify_checksum(name: &str, bytes: &[u8], expected: &str) -> Result<(), StorageError> {
    if checksum(bytes) != expected {
        return Err(StorageError::Deserialization(format!(
            "{name} checksum does not match manifest"
        )));
    }
    Ok(())
}

fn encode_vectors(dimension: usize, entries: &[IndexEntry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(VECTORS_HEADER_LEN + entries.len() * dimension * 4);
    buf.extend_from_slice(VECTORS_MAGIC);
    buf.extend_from_slice(&(dimension as u32).to_le_bytes());
    buf.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for entry in entries {
        for value in &entry.vector {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
    buf
}

fn decode_vectors(
    bytes: &[u8],
    dimension: usize,
    count: usize,
) -> Result<Vec<Vec<f32>>, StorageError> {
    if bytes.len() < VECTORS_HEADER_LEN || &bytes[..8] != VECTORS_MAGIC {
        return Err(StorageError::Deserialization(format!(
            "{VECTORS_FILE} is not a vector file"
        )));
    }

    let mut dim_bytes = [0u8; 4];
    dim_bytes.copy_from_slice(&bytes[8..12]);
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let file_dim = u32::from_le_bytes(dim_bytes) as usize;
    let file_count = u64::from_le_bytes(count_bytes) as usize;

    if file_dim != dimension || file_count != count {
        return Err(StorageError::Deserialization(format!(
            "{VECTORS_FILE} header ({file_count} x {file_dim}) disagrees with manifest ({count} x {dimension})"
        )));
    }

    let body = &bytes[VECTORS_HEADER_LEN..];
    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| StorageError::Deserialization("vector file size overflow".into()))?;
    if body.len() != expected_len {
        return Err(StorageError::Deserialization(format!(
            "{VECTORS_FILE} body is {} bytes, expected {expected_len}",
            body.len()
        )));
    }

    Ok(body
        .chunks_exact(dimension * 4)
        .map(|row| {
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect())
}
