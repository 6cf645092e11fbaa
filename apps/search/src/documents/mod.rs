// Document intake: uploaded bytes -> page text -> chunks.

pub mod chunker;
pub mod loader;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use chunker::{Chunk, ChunkConfig, Chunker};
pub use loader::{DocumentLoader, PdfLoader};

/// A file received in an upload batch. Dropped once its text is extracted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Extracted text of one page of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub text: String,
    pub source: String,
    /// 1-based.
    pub number: u32,
}
