//! Embedding generation for form responses and questions.
//!
//! Every embedder produces unit-length vectors of a fixed dimension. The
//! [`GatedEmbedder`] wraps backends that need asynchronous warm-up so callers
//! get `ModelUnavailable` instead of touching an uninitialized model.

mod gate;
mod hashing;
mod openai;

pub use gate::{GatedEmbedder, Readiness};
pub use hashing::HashingEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::{FormragError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left as they are.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x = (*x as f64 / norm) as f32;
        }
    }
}

/// Check that a batch result matches the request: one vector per input, each of
/// the expected length.
pub fn check_batch(vectors: &[Vec<f32>], inputs: usize, dimensions: usize) -> Result<()> {
    if vectors.len() != inputs {
        return Err(FormragError::Embedding(format!(
            "Expected {} embeddings, got {}",
            inputs,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
        return Err(FormragError::DimensionMismatch {
            expected: dimensions,
            found: bad.len(),
        });
    }
    Ok(())
}

/// Build the configured embedder behind a readiness gate.
///
/// Must be called from within a Tokio runtime; initialization runs in the
/// background.
pub fn create_embedder(settings: &EmbeddingSettings) -> GatedEmbedder {
    let dimensions = settings.dimensions as usize;
    match settings.provider {
        EmbeddingProvider::Hashing => GatedEmbedder::ready(Arc::new(HashingEmbedder::new(dimensions))),
        EmbeddingProvider::OpenAI => {
            let settings = settings.clone();
            GatedEmbedder::spawn(dimensions, async move {
                let embedder = OpenAIEmbedder::from_settings(&settings)?;
                embedder.probe().await?;
                Ok(Arc::new(embedder) as Arc<dyn Embedder>)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        let mut v = vec![0.0; 4];
        normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn test_check_batch() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(check_batch(&vectors, 2, 2).is_ok());
        assert!(matches!(
            check_batch(&vectors, 3, 2),
            Err(FormragError::Embedding(_))
        ));
        assert!(matches!(
            check_batch(&vectors, 2, 3),
            Err(FormragError::DimensionMismatch { expected: 3, found: 2 })
        ));
    }
}
