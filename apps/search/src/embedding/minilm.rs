//! Semantic embeddings through fastembed's all-MiniLM-L6-v2.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{l2_normalize, EmbeddingError, EmbeddingProvider, DEFAULT_EMBEDDING_DIM};

const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const BATCH_SIZE: usize = 256;

pub struct FastEmbedder {
    // fastembed needs `&mut` to embed.
    embedder: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    pub fn new() -> Result<Self, EmbeddingError> {
        let init = InitOptions::new(EmbeddingModel::AllMiniLML6V2);
        let embedder = TextEmbedding::try_new(init)
            .map_err(|e| EmbeddingError::Model(format!("failed to initialize fastembed model: {e}")))?;
        Ok(Self {
            embedder: Mutex::new(embedder),
        })
    }
}

impl EmbeddingProvider for FastEmbedder {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn dimension(&self) -> usize {
        DEFAULT_EMBEDDING_DIM
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embedder = self
            .embedder
            .lock()
            .map_err(|_| EmbeddingError::Model("embedding model lock poisoned".to_string()))?;
        let mut embeddings = embedder
            .embed(texts, Some(BATCH_SIZE))
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: embeddings.len(),
            });
        }
        for embedding in embeddings.iter_mut() {
            l2_normalize(embedding);
        }
        Ok(embeddings)
    }
}
