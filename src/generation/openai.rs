//! OpenAI chat completions implementation.

use super::{GenerationRequest, Generator};
use crate::config::GenerationSettings;
use crate::error::{FormragError, Result};
use crate::openai::create_client_with;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI-compatible chat generator.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIGenerator {
    /// Create a generator from the generation section of the settings.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with(
                settings.api_base.as_deref(),
                Duration::from_secs(settings.timeout_secs),
            )?,
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn failed(e: impl std::fmt::Display) -> FormragError {
    FormragError::GenerationFailed(e.to_string())
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system)
                .build()
                .map_err(failed)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user)
                .build()
                .map_err(failed)?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(request.params.temperature)
            .top_p(request.params.top_p)
            .max_completion_tokens(request.params.max_tokens)
            .build()
            .map_err(failed)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| failed(format!("model call failed: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| failed("empty response from model"))?;

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationParams;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves a chat endpoint that always answers 429 and counts the calls.
    async fn rate_limited_server() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        Json(json!({
                            "error": {
                                "message": "Rate limit reached",
                                "type": "rate_limit_exceeded",
                                "param": null,
                                "code": null
                            }
                        })),
                    )
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1", addr), hits)
    }

    #[tokio::test]
    async fn test_rate_limit_fails_on_first_attempt() {
        let (api_base, hits) = rate_limited_server().await;
        let settings = GenerationSettings {
            api_base: Some(api_base),
            timeout_secs: 5,
            ..GenerationSettings::default()
        };
        let generator = OpenAIGenerator::from_settings(&settings).unwrap();

        let request = GenerationRequest {
            system: "Answer briefly.".to_string(),
            user: "Question: anything?".to_string(),
            params: GenerationParams::default(),
        };
        let outcome = tokio::time::timeout(Duration::from_secs(4), generator.generate(request))
            .await
            .expect("generation should not be retried");

        assert!(matches!(outcome, Err(FormragError::GenerationFailed(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_generator_creation() {
        let settings = GenerationSettings {
            model: "gemini-1.5-flash".to_string(),
            api_base: Some("https://generativelanguage.googleapis.com/v1beta/openai/".to_string()),
            ..GenerationSettings::default()
        };
        let generator = OpenAIGenerator::from_settings(&settings).unwrap();
        assert_eq!(generator.model(), "gemini-1.5-flash");
    }
}
