//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::FormragError;
use crate::orchestrator::Orchestrator;
use crate::rag::AnalysisResult;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(form_id: &str, question: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;
    let engine = orchestrator.engine();
    let limit = limit.unwrap_or_else(|| engine.limit());
    if limit == 0 {
        return Err(FormragError::InvalidInput("limit must be greater than zero".to_string()).into());
    }

    let spinner = Output::spinner("Loading embedding model...");
    let ready = orchestrator.wait_ready().await;
    spinner.set_message("Searching responses...");
    if let Err(e) = ready {
        spinner.finish_and_clear();
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let result = engine.analyze_with_limit(form_id, question, limit).await;
    spinner.finish_and_clear();

    match &result {
        AnalysisResult::Answered { answer, sources } | AnalysisResult::NoAnswer { answer, sources } => {
            println!("\n{}\n", answer);

            if !sources.is_empty() {
                Output::header("Sources");
                for (i, source) in sources.iter().enumerate() {
                    Output::source(i + 1, source.similarity, &source.data.to_string());
                }
            }
            Ok(())
        }
        AnalysisResult::Failed { error, kind, stage, .. } => {
            Output::error(&format!("Failed to answer ({} during {}): {}", kind, stage, error));
            anyhow::bail!("analysis failed: {}", error)
        }
    }
}
