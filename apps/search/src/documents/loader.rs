use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::documents::{Page, UploadedFile};

const PDF_MAGIC: &[u8] = b"%PDF-";
const TEMP_PREFIX: &str = "resume-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{filename} is not a PDF file")]
    NotPdf { filename: String },

    #[error("could not buffer {filename} to a temporary file: {source}")]
    TempFile {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not extract text from {filename}: {reason}")]
    Parse { filename: String, reason: String },

    #[error("the PDF parser crashed while reading {filename}")]
    Panicked { filename: String },
}

/// Turns an uploaded file into page-level text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, file: &UploadedFile) -> Result<Vec<Page>, ExtractionError>;
}

/// PDF loader backed by `pdf-extract`.
///
/// The upload is buffered to a named temporary file for the duration of the
/// extraction. The file is removed when the guard drops, which happens on
/// every exit path including parser errors and panics.
#[derive(Debug, Clone, Default)]
pub struct PdfLoader {
    /// Where temp files go. `None` means the system temp directory.
    temp_dir: Option<PathBuf>,
}

impl PdfLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temp_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: Some(dir.into()),
        }
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, file: &UploadedFile) -> Result<Vec<Page>, ExtractionError> {
        if !file.bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::NotPdf {
                filename: file.filename.clone(),
            });
        }

        let filename = file.filename.clone();
        let bytes = file.bytes.clone();
        let temp_dir = self.temp_dir.clone();

        // pdf-extract is CPU-bound and may panic on malformed input.
        let joined = tokio::task::spawn_blocking(move || {
            extract_pages(&filename, &bytes, temp_dir.as_deref())
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Panicked {
                filename: file.filename.clone(),
            }),
        }
    }
}

fn extract_pages(
    filename: &str,
    bytes: &[u8],
    temp_dir: Option<&Path>,
) -> Result<Vec<Page>, ExtractionError> {
    let temp_error = |source: std::io::Error| ExtractionError::TempFile {
        filename: filename.to_string(),
        source,
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(".pdf");
    let mut temp = match temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(temp_error)?;
    temp.write_all(bytes).map_err(temp_error)?;
    temp.flush().map_err(temp_error)?;

    let texts = pdf_extract::extract_text_by_pages(temp.path()).map_err(|e| {
        ExtractionError::Parse {
            filename: filename.to_string(),
            reason: e.to_string(),
        }
    })?;

    debug!("Extracted {} pages from {}", texts.len(), filename);

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page {
            text,
            source: filename.to_string(),
            number: (i + 1) as u32,
        })
        .collect())
}
