//! Question answering over a single form.

use super::{assemble, rank, RankedResult, DEFAULT_LIMIT};
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{FormragError, Result};
use crate::generation::{GenerationParams, GenerationRequest, Generator};
use crate::store::ResponseStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Reply the model is instructed to give when the context lacks the answer.
pub const NO_ANSWER: &str = "no answer";

/// Progress of one analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Embedding,
    Fetching,
    Ranking,
    AssemblingContext,
    Generating,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Embedding => "embedding",
            Stage::Fetching => "fetching",
            Stage::Ranking => "ranking",
            Stage::AssemblingContext => "assembling_context",
            Stage::Generating => "generating",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one question against one form.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisResult {
    /// The model answered from the context.
    Answered {
        answer: String,
        sources: Vec<RankedResult>,
    },
    /// The context did not contain the answer. Still a successful analysis.
    NoAnswer {
        answer: String,
        sources: Vec<RankedResult>,
    },
    /// The request failed; `kind` names the error category.
    Failed {
        error: String,
        kind: &'static str,
        retryable: bool,
        stage: Stage,
    },
}

impl AnalysisResult {
    fn failed(err: &FormragError, stage: Stage) -> Self {
        AnalysisResult::Failed {
            error: err.to_string(),
            kind: err.kind(),
            retryable: err.is_retryable(),
            stage,
        }
    }

    /// Whether the analysis completed (with or without an answer).
    pub fn is_success(&self) -> bool {
        !matches!(self, AnalysisResult::Failed { .. })
    }

    /// The answer text, if the analysis completed.
    pub fn answer(&self) -> Option<&str> {
        match self {
            AnalysisResult::Answered { answer, .. } | AnalysisResult::NoAnswer { answer, .. } => {
                Some(answer)
            }
            AnalysisResult::Failed { .. } => None,
        }
    }

    /// The responses used as context.
    pub fn sources(&self) -> &[RankedResult] {
        match self {
            AnalysisResult::Answered { sources, .. } | AnalysisResult::NoAnswer { sources, .. } => {
                sources
            }
            AnalysisResult::Failed { .. } => &[],
        }
    }
}

/// True when the model reply is the no-answer phrase, ignoring case and
/// surrounding punctuation.
pub(crate) fn is_no_answer(reply: &str) -> bool {
    let trimmed = reply.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
    trimmed.eq_ignore_ascii_case(NO_ANSWER)
}

/// Embeds the question, ranks the form's responses and asks the generator.
///
/// Holds no per-request state, so one engine can serve concurrent requests.
pub struct AnswerEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ResponseStore>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    params: GenerationParams,
    limit: usize,
}

impl AnswerEngine {
    /// Create a new answer engine.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ResponseStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            prompts: Prompts::default(),
            params: GenerationParams::default(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the sampling parameters sent with every request.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Set the default number of responses used as context.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Answer `question` from the responses of `form_id`.
    pub async fn analyze(&self, form_id: &str, question: &str) -> AnalysisResult {
        self.analyze_with_limit(form_id, question, self.limit).await
    }

    /// Like [`analyze`](Self::analyze) with an explicit context size.
    ///
    /// Never returns an error: failures become [`AnalysisResult::Failed`].
    #[instrument(skip(self, question))]
    pub async fn analyze_with_limit(
        &self,
        form_id: &str,
        question: &str,
        limit: usize,
    ) -> AnalysisResult {
        info!("Analyzing question against form {}", form_id);

        let mut stage = Stage::Idle;
        match self.run(form_id, question, limit, &mut stage).await {
            Ok(result) => {
                debug!("Analysis finished");
                result
            }
            Err(e) => {
                match &e {
                    FormragError::DimensionMismatch { .. } => {
                        error!(stage = %stage, "Stored embeddings for form {} are inconsistent: {}", form_id, e)
                    }
                    _ => warn!(stage = %stage, "Analysis failed: {}", e),
                }
                AnalysisResult::failed(&e, stage)
            }
        }
    }

    async fn run(
        &self,
        form_id: &str,
        question: &str,
        limit: usize,
        stage: &mut Stage,
    ) -> Result<AnalysisResult> {
        if question.trim().is_empty() {
            return Err(FormragError::InvalidInput("question must not be empty".to_string()));
        }

        *stage = Stage::Embedding;
        let query = self.embedder.embed(question).await.map_err(|e| match e {
            FormragError::ModelUnavailable(_) => e,
            other => FormragError::ModelUnavailable(other.to_string()),
        })?;

        *stage = Stage::Fetching;
        let responses = self.store.fetch_responses(form_id).await?;
        if responses.is_empty() {
            debug!("Form {} has no responses", form_id);
            return Ok(AnalysisResult::NoAnswer {
                answer: NO_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        *stage = Stage::Ranking;
        let ranked = rank(
            &query,
            responses.iter().map(|r| (&r.data, r.embedding.as_slice())),
            limit,
        )?;
        debug!("Ranked {} of {} responses", ranked.len(), responses.len());

        *stage = Stage::AssemblingContext;
        let context = assemble(&ranked);

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);

        let request = GenerationRequest {
            system: self.prompts.analyze.system.clone(),
            user: self.prompts.render_with_custom(&self.prompts.analyze.user, &vars),
            params: self.params.clone(),
        };

        *stage = Stage::Generating;
        let answer = self.generator.generate(request).await?;

        *stage = Stage::Done;
        if is_no_answer(&answer) {
            Ok(AnalysisResult::NoAnswer {
                answer,
                sources: ranked,
            })
        } else {
            Ok(AnalysisResult::Answered {
                answer,
                sources: ranked,
            })
        }
    }
}
