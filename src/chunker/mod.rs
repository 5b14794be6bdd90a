
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, TutorError};

/// A contiguous text segment produced by [`chunk_text`], the unit of
/// embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Sequential id, unique within one chunking run and stable for the
    /// lifetime of the collection it is stored into.
    pub index: u32,
    pub text: String,
}

/// Configuration for fixed-size overlapping chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Number of characters each chunk shares with its predecessor.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(TutorError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(TutorError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Split text into fixed-size chunks where each chunk overlaps its
/// predecessor by `chunk_overlap` characters.
///
/// Chunks cover the input in read order; the final chunk may be shorter than
/// `chunk_size`. Empty input produces an empty sequence. The operation is
/// deterministic: the same input and configuration always yield the same
/// chunk sequence.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let stride = config.chunk_size - config.chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(chars.len());
        chunks.push(Chunk {
            index: chunks.len() as u32,
            text: chars[start..end].iter().collect(),
        });

        if end == chars.len() {
            break;
        }
        start += stride;
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        chars.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}

/// Rebuild the original text from a chunk sequence by dropping the leading
/// overlap of every chunk after the first.
///
/// Inverse of [`chunk_text`] for any input, used to verify coverage.
#[inline]
pub fn reconstruct_text(chunks: &[Chunk], config: &ChunkingConfig) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(&chunk.text);
        } else {
            text.extend(chunk.text.chars().skip(config.chunk_overlap));
        }
    }
    text
}
