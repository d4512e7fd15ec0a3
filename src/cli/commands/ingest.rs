//! Ingest and append command implementations.

use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::{IngestRequest, ResponseInput};
use crate::orchestrator::Orchestrator;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Accepted shapes for `formrag append` input files.
#[derive(Deserialize)]
#[serde(untagged)]
enum AppendFile {
    Wrapped { responses: Vec<ResponseInput> },
    Bare(Vec<ResponseInput>),
}

impl AppendFile {
    fn into_responses(self) -> Vec<ResponseInput> {
        match self {
            AppendFile::Wrapped { responses } | AppendFile::Bare(responses) => responses,
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path))
}

async fn ready_orchestrator(settings: &Settings) -> Result<Orchestrator> {
    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Loading embedding model...");
    let ready = orchestrator.wait_ready().await;
    spinner.finish_and_clear();
    ready?;
    Ok(orchestrator)
}

/// Run the ingest command.
pub async fn run_ingest(path: &str, settings: Settings) -> Result<()> {
    let request: IngestRequest = read_json(path)?;
    let orchestrator = ready_orchestrator(&settings).await?;

    let spinner = Output::spinner(&format!("Embedding {} responses...", request.responses.len()));
    let result = orchestrator.ingestor().ingest(request).await;
    spinner.finish_and_clear();

    match result {
        Ok(form) => {
            Output::success(&format!("Stored form \"{}\"", form.name));
            Output::kv("ID", &form.id.to_string());
            Output::kv("Fields", &form.fields.len().to_string());
            Output::kv("Responses", &form.responses.len().to_string());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingestion failed, nothing was stored: {}", e));
            Err(e.into())
        }
    }
}

/// Run the append command.
pub async fn run_append(form_id: &str, path: &str, settings: Settings) -> Result<()> {
    let responses = read_json::<AppendFile>(path)?.into_responses();
    let added = responses.len();
    let orchestrator = ready_orchestrator(&settings).await?;

    let spinner = Output::spinner(&format!("Embedding {} responses...", added));
    let result = orchestrator.ingestor().append(form_id, responses).await;
    spinner.finish_and_clear();

    match result {
        Ok(total) => {
            Output::success(&format!("Added {} responses ({} total)", added, total));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Append failed, nothing was stored: {}", e));
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_file_shapes() {
        let wrapped: AppendFile =
            serde_json::from_str(r#"{"responses": [{"data": {"a": 1}}]}"#).unwrap();
        assert_eq!(wrapped.into_responses().len(), 1);

        let bare: AppendFile =
            serde_json::from_str(r#"[{"data": {"a": 1}}, {"data": {"a": 2}}]"#).unwrap();
        assert_eq!(bare.into_responses().len(), 2);
    }
}
