//! OpenAI embeddings implementation.

use super::{check_batch, normalize, Embedder};
use crate::config::EmbeddingSettings;
use crate::error::{FormragError, Result};
use crate::openai::create_client_with;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder from the embedding section of the settings.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with(settings.api_base.as_deref(), Duration::from_secs(60))?,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
        })
    }

    /// Embed a fixed string to confirm the endpoint answers with the configured dimension.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn probe(&self) -> Result<()> {
        let vector = self.embed("readiness probe").await?;
        if vector.len() != self.dimensions {
            return Err(FormragError::DimensionMismatch {
                expected: self.dimensions,
                found: vector.len(),
            });
        }
        info!("Embedding model {} ready ({} dimensions)", self.model, self.dimensions);
        Ok(())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| FormragError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // The API caps inputs per request
        const BATCH_SIZE: usize = 100;
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            // The endpoint rejects empty strings; a single space embeds the same "no content".
            let input: Vec<String> = chunk
                .iter()
                .map(|t| if t.trim().is_empty() { " ".to_string() } else { t.clone() })
                .collect();

            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(input))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| FormragError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| FormragError::OpenAI(format!("Embedding API error: {}", e)))?;

            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            for embedding_data in embeddings {
                let mut vector = embedding_data.embedding;
                normalize(&mut vector);
                all_embeddings.push(vector);
            }
        }

        check_batch(&all_embeddings, texts.len(), self.dimensions)?;

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::from_settings(&EmbeddingSettings::default()).unwrap();
        assert_eq!(embedder.dimensions(), 384);

        let settings = EmbeddingSettings {
            dimensions: 1536,
            api_base: Some("http://localhost:8080/v1".to_string()),
            ..EmbeddingSettings::default()
        };
        let embedder = OpenAIEmbedder::from_settings(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 1536);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder = OpenAIEmbedder::from_settings(&EmbeddingSettings::default()).unwrap();
        let out = embedder.embed_batch(&[]).await.unwrap();
        assert!(out.is_empty());
    }
}
