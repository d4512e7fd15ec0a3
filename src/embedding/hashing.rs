//! Deterministic local embedder based on signed feature hashing.
//!
//! Needs no model download or network, which makes it useful for offline use
//! and tests. Quality is lexical only: texts sharing words end up close.

use super::{normalize, Embedder};
use crate::error::{FormragError, Result};
use async_trait::async_trait;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Feature-hashing embedder over word unigrams and bigrams.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Embed synchronously. Empty or whitespace-only text gives the zero vector.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let tokens = tokenize(text);
        for token in &tokens {
            self.add_feature(&mut vector, token.as_bytes());
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut vector, bigram.as_bytes());
        }

        normalize(&mut vector);
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8]) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

/// Lowercased alphanumeric runs. JSON punctuation and quoting drop out here.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let this = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || texts.iter().map(|t| this.embed_sync(t)).collect())
            .await
            .map_err(|e| FormragError::Embedding(format!("Embedding task failed: {}", e)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_unit_length_and_dimension() {
        let embedder = HashingEmbedder::new(384);
        let v = embedder.embed_sync("The quick brown fox");
        assert_eq!(v.len(), 384);
        assert!((norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::new(128);
        assert_eq!(
            embedder.embed_sync("{\"color\":\"red\"}"),
            embedder.embed_sync("{\"color\":\"red\"}")
        );
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        assert_eq!(embedder.embed_sync("   "), vec![0.0; 16]);
        assert_eq!(embedder.embed_sync(""), vec![0.0; 16]);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::new(256);
        let question = embedder.embed_sync("what color is the red car");
        let red = embedder.embed_sync("{\"car\":\"red\"}");
        let other = embedder.embed_sync("{\"pet\":\"hamster\"}");
        assert!(cosine_similarity(&question, &red) > cosine_similarity(&question, &other));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["alpha beta".to_string(), "gamma".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed("alpha beta").await.unwrap());
        assert_eq!(batch[1], embedder.embed("gamma").await.unwrap());
    }
}
