//! Embedding provider interface and implementations.
//!
//! Callers only ever see `Arc<dyn EmbeddingProvider>`; which model sits behind
//! it is decided once, by [`from_config`].

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

#[cfg(feature = "fastembed")]
pub mod minilm;
pub mod placeholder;

pub use placeholder::PlaceholderEmbedder;

/// Dimension of sentence-transformers/all-MiniLM-L6-v2, mirrored by the placeholder.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model failed: {0}")]
    Model(String),

    #[error("embedding model returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("unknown embedding provider '{0}' (expected 'placeholder' or 'minilm')")]
    UnknownBackend(String),

    #[error("embedding provider 'minilm' requires building with the `fastembed` feature")]
    BackendUnavailable,
}

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Length of every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Embeds `texts`, one vector per input, in input order.
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Generates an embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut result = self.embed_many(&[text.to_string()])?;
        if result.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                got: result.len(),
            });
        }
        Ok(result.remove(0))
    }
}

/// Which provider to construct at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Non-semantic vectors; keeps the pipeline runnable without a model download.
    #[default]
    Placeholder,
    /// all-MiniLM-L6-v2 through fastembed.
    MiniLm,
}

impl FromStr for EmbeddingBackend {
    type Err = EmbeddingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" | "fake" => Ok(EmbeddingBackend::Placeholder),
            "minilm" | "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
                Ok(EmbeddingBackend::MiniLm)
            }
            other => Err(EmbeddingError::UnknownBackend(other.to_string())),
        }
    }
}

/// Builds the provider selected by configuration.
pub fn from_config(backend: EmbeddingBackend) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let provider: Arc<dyn EmbeddingProvider> = match backend {
        EmbeddingBackend::Placeholder => Arc::new(PlaceholderEmbedder::new(DEFAULT_EMBEDDING_DIM)),
        #[cfg(feature = "fastembed")]
        EmbeddingBackend::MiniLm => Arc::new(minilm::FastEmbedder::new()?),
        #[cfg(not(feature = "fastembed"))]
        EmbeddingBackend::MiniLm => return Err(EmbeddingError::BackendUnavailable),
    };
    info!(
        "Embedding provider initialized (model: {}, dim: {})",
        provider.model_id(),
        provider.dimension()
    );
    Ok(provider)
}

pub(crate) fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}
