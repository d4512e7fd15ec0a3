//! Answer generation through a text-generation model.
//!
//! Every question gets its own [`GenerationRequest`]; nothing from one request
//! is visible to the next.

mod openai;

pub use openai::OpenAIGenerator;

use crate::config::GenerationSettings;
use crate::error::Result;
use async_trait::async_trait;

/// Sampling parameters, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl From<&GenerationSettings> for GenerationParams {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&GenerationSettings::default())
    }
}

/// A single self-contained prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Instruction text.
    pub system: String,
    /// Question plus retrieved context.
    pub user: String,
    pub params: GenerationParams,
}

/// Trait for text generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the model's answer text. Backend failures surface as `GenerationFailed`.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
