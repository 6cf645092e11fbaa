//! Persistent vector store.
//!
//! A store is a directory holding `entries.jsonl`, one serialized
//! [`IndexEntry`] per line. Entries are appended and never rewritten; the only
//! way to delete anything is [`VectorStore::clear`], which removes the whole
//! directory. Search is a brute-force cosine scan over the in-memory copy.
//!
//! There is no file locking. Two processes pointed at the same directory can
//! interleave appends and corrupt the file.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::documents::Chunk;

const ENTRIES_FILE: &str = "entries.jsonl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt entry on line {line} of {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("vector dimension mismatch: store holds {expected}-dim vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub source: String,
    pub page: u32,
    pub chunk_index: usize,
    pub indexed_at: DateTime<Utc>,
}

/// A chunk, its embedding and provenance, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn from_chunk(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: chunk.text,
            embedding,
            metadata: EntryMetadata {
                source: chunk.source,
                page: chunk.page,
                chunk_index: chunk.index,
                indexed_at: Utc::now(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: IndexEntry,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

/// Handle to an open store directory.
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    entries: Vec<IndexEntry>,
}

impl VectorStore {
    /// Whether a store has ever been created at `dir`.
    pub fn exists<P: AsRef<Path>>(dir: P) -> bool {
        dir.as_ref().is_dir()
    }

    /// Opens the store at `dir`, creating the directory if needed, and loads
    /// every persisted entry.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(ENTRIES_FILE);
        let entries = match fs::File::open(&path) {
            Ok(file) => read_entries(&path, file)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        info!("Opened vector store at {} ({} entries)", dir.display(), entries.len());
        Ok(Self { dir, entries })
    }

    /// Opens the store only if its directory already exists.
    pub fn open_existing<P: AsRef<Path>>(dir: P) -> Result<Option<Self>, StoreError> {
        if Self::exists(&dir) {
            Self::open(dir).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Dimension of the stored vectors, once anything is stored.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding.len())
    }

    /// Appends `entries` to disk and to the in-memory index. Duplicates are
    /// kept. Either every entry in the call is written or none is.
    pub fn add(&mut self, entries: Vec<IndexEntry>) -> Result<usize, StoreError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let expected = self
            .dimension()
            .unwrap_or_else(|| entries[0].embedding.len());
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != expected) {
            return Err(StoreError::DimensionMismatch {
                expected,
                got: bad.embedding.len(),
            });
        }

        let mut buf = Vec::new();
        for entry in &entries {
            serde_json::to_writer(&mut buf, entry)?;
            buf.push(b'\n');
        }

        let path = self.dir.join(ENTRIES_FILE);
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(&buf).map_err(io_err)?;
        file.sync_data().map_err(io_err)?;

        let added = entries.len();
        self.entries.extend(entries);
        debug!("Appended {added} entries to {}", path.display());
        Ok(added)
    }

    /// Returns the `k` entries most similar to `query`, best first. Equal
    /// scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, StoreError> {
        if let Some(expected) = self.dimension() {
            if query.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    got: query.len(),
                });
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(query, &e.embedding)))
            .collect();
        // sort_by is stable, so ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| SearchResult {
                entry: self.entries[i].clone(),
                score,
            })
            .collect())
    }

    /// Deletes every entry by removing the store directory. On failure the
    /// in-memory entries are left untouched.
    pub fn clear(&mut self) -> Result<usize, StoreError> {
        fs::remove_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let removed = self.entries.len();
        self.entries.clear();
        info!("Cleared vector store at {} ({removed} entries)", self.dir.display());
        Ok(removed)
    }
}

fn read_entries(path: &Path, file: fs::File) -> Result<Vec<IndexEntry>, StoreError> {
    let mut entries = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom < f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
