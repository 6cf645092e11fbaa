use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{l2_normalize, EmbeddingError, EmbeddingProvider};

pub const PLACEHOLDER_MODEL_ID: &str = "placeholder-random";

/// Produces vectors that carry no meaning: each one is drawn from an RNG
/// seeded by the text's hash. Identical texts get identical vectors, so the
/// pipeline and the store behave normally, but similarity ranking is noise.
pub struct PlaceholderEmbedder {
    dimension: usize,
}

impl PlaceholderEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());

        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|_| rng.gen_range(-1.0f32..1.0))
            .collect();
        l2_normalize(&mut vector);
        vector
    }
}

impl EmbeddingProvider for PlaceholderEmbedder {
    fn model_id(&self) -> &str {
        PLACEHOLDER_MODEL_ID
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}
