//! Fixed-window text chunker.
//!
//! Page text is split into windows of `chunk_size` characters, each sharing
//! `chunk_overlap` characters with the previous window. Lengths are counted in
//! `char`s so multibyte text is never cut inside a code point.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::documents::Page;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be greater than 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// A chunk of page text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    /// 1-based page number within `source`.
    pub page: u32,
    /// Position of this chunk within its page.
    pub index: usize,
}

pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Splits every page in order. Blank pages contribute nothing.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        pages
            .iter()
            .filter(|page| !page.text.trim().is_empty())
            .flat_map(|page| {
                self.split_text(&page.text)
                    .into_iter()
                    .enumerate()
                    .map(move |(index, text)| Chunk {
                        text,
                        source: page.source.clone(),
                        page: page.number,
                        index,
                    })
            })
            .collect()
    }

    /// Splits text into overlapping windows.
    ///
    /// ```text
    /// start = 0
    /// loop:
    ///   end = min(start + chunk_size, len)
    ///   emit text[start..end]
    ///   if end == len: stop
    ///   start += chunk_size - chunk_overlap
    /// ```
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the string.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;

        let mut chunks = Vec::with_capacity(total_chars / self.config.step() + 1);
        let mut start = 0;
        loop {
            let end = (start + self.config.chunk_size).min(total_chars);
            chunks.push(text[boundaries[start]..boundaries[end]].to_string());
            if end == total_chars {
                break;
            }
            start += self.config.step();
        }
        chunks
    }
}
