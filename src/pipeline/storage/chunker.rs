use super::types::{Chunker, TextChunk};
use super::vectordb::ChunkingParams;
use super::StorageError;
use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::pipeline::ingest::SourceDocument;

/// Break candidates from coarsest to finest. A break lands right after the
/// separator, so the separator stays at the end of the earlier chunk.
const SEPARATOR_LEVELS: &[&[&str]] = &[
    &["\n\n"],
    &["\n", ". ", "! ", "? "],
    &[" "],
];

/// Recursive character chunker.
///
/// Cuts each document into windows of at most `max_chunk_chars` characters,
/// preferring paragraph, then sentence, then word boundaries and falling back
/// to a hard cut. Consecutive windows of a document share exactly
/// `overlap_chars` characters.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    max_chunk_chars: usize,
    overlap_chars: usize,
}

impl RecursiveChunker {
    pub fn new(max_chunk_chars: usize, overlap_chars: usize) -> Result<Self, StorageError> {
        if max_chunk_chars == 0 {
            return Err(StorageError::InvalidChunkConfig(
                "chunk size must be positive".into(),
            ));
        }
        if overlap_chars >= max_chunk_chars {
            return Err(StorageError::InvalidChunkConfig(format!(
                "overlap ({overlap_chars}) must be smaller than chunk size ({max_chunk_chars})"
            )));
        }
        Ok(Self {
            max_chunk_chars,
            overlap_chars,
        })
    }

    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Character spans `[start, end)` of each window of `text`.
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<char> = text.chars().collect();
        split_spans(&chars, self.max_chunk_chars, self.overlap_chars)
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_CHUNK_SIZE,
            overlap_chars: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &SourceDocument) -> Vec<TextChunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        // Byte position of every char boundary, including the end of the text.
        let boundaries: Vec<usize> = document
            .text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(document.text.len()))
            .collect();

        self.spans(&document.text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| TextChunk {
                content: document.text[boundaries[start]..boundaries[end]].to_string(),
                chunk_index,
                char_offset: start,
                source: document.source.clone(),
                kind: document.kind,
                page: document.page,
                title: document.title.clone(),
            })
            .collect()
    }

    fn params(&self) -> Option<ChunkingParams> {
        Some(ChunkingParams {
            max_chunk_chars: self.max_chunk_chars,
            overlap_chars: self.overlap_chars,
        })
    }
}

/// Chunk a batch of documents with explicit parameters.
pub fn chunk_documents(
    documents: &[SourceDocument],
    max_chunk_chars: usize,
    overlap_chars: usize,
) -> Result<Vec<TextChunk>, StorageError> {
    let chunker = RecursiveChunker::new(max_chunk_chars, overlap_chars)?;
    Ok(chunker.chunk_documents(documents))
}

fn split_spans(chars: &[char], max: usize, overlap: usize) -> Vec<(usize, usize)> {
    let len = chars.len();
    if len == 0 {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut start = 0;
    loop {
        if len - start <= max {
            spans.push((start, len));
            break;
        }

        let window_end = start + max;
        // The break must leave room past the overlap so the next window advances,
        // and should not produce windows much shorter than half the limit.
        let min_end = start + (overlap + 1).max(max / 2);
        let end = find_break(chars, start, min_end, window_end).unwrap_or(window_end);

        spans.push((start, end));
        start = end - overlap;
    }
    spans
}

/// Rightmost break in `[min_end, window_end]` at the coarsest level that has one.
fn find_break(chars: &[char], start: usize, min_end: usize, window_end: usize) -> Option<usize> {
    for level in SEPARATOR_LEVELS {
        let found = (min_end..=window_end).rev().find(|&end| {
            level.iter().any(|sep| ends_with_separator(chars, start, end, sep))
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

fn ends_with_separator(chars: &[char], start: usize, end: usize, separator: &str) -> bool {
    let sep_len = separator.chars().count();
    if end < start + sep_len {
        return false;
    }
    chars[end - sep_len..end].iter().copied().eq(separator.chars())
}
