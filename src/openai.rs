//! OpenAI-compatible client construction.

use crate::error::{FormragError, Result};
use async_openai::{config::OpenAIConfig, Client};
use backoff::ExponentialBackoff;
use std::time::Duration;

/// Backoff that gives up after the first failed attempt.
fn no_retry() -> ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Create a client with an optional alternative base URL and a request timeout.
///
/// Any OpenAI-compatible server works here; the API key is still read from
/// `OPENAI_API_KEY`. Failed calls, rate limits included, are returned to the
/// caller on the first attempt.
pub fn create_client_with(api_base: Option<&str>, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| FormragError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::default();
    if let Some(base) = api_base {
        config = config.with_api_base(base.trim_end_matches('/'));
    }

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retry()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoff::backoff::Backoff;

    #[test]
    fn test_backoff_never_schedules_a_retry() {
        let mut backoff = no_retry();
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn test_client_with_custom_base() {
        assert!(create_client_with(Some("http://localhost:8080/v1/"), Duration::from_secs(5)).is_ok());
    }
}
