//! Form ingestion: embed every response at write time, then store the batch.
//!
//! Embeddings are all computed before the store is touched, so a failure on
//! any response leaves the form exactly as it was.

use crate::embedding::{check_batch, Embedder};
use crate::error::{FormragError, Result};
use crate::store::{canonical_text, parse_form_id, Field, Form, NewForm, Response, ResponseStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Body of a form creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub responses: Vec<ResponseInput>,
}

/// One submitted response before embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseInput {
    pub data: Value,
}

/// Writes forms and responses with their embeddings.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn ResponseStore>,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn ResponseStore>) -> Self {
        Self { embedder, store }
    }

    /// Create a new form from `request`.
    #[instrument(skip(self, request), fields(name = %request.name, responses = request.responses.len()))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<Form> {
        if request.name.trim().is_empty() {
            return Err(FormragError::InvalidInput("form name must not be empty".to_string()));
        }
        if let Some(field) = request.fields.iter().find(|f| f.name.trim().is_empty()) {
            return Err(FormragError::InvalidInput(format!(
                "field names must not be empty (got {:?})",
                field.name
            )));
        }

        let responses = self.embed_responses(request.responses).await?;
        let form = self
            .store
            .create_form(NewForm {
                name: request.name,
                fields: request.fields,
                responses,
            })
            .await?;

        info!("Ingested form {} with {} responses", form.id, form.responses.len());
        Ok(form)
    }

    /// Append responses to an existing form. Returns the new response count.
    #[instrument(skip(self, responses), fields(count = responses.len()))]
    pub async fn append(&self, form_id: &str, responses: Vec<ResponseInput>) -> Result<usize> {
        parse_form_id(form_id)?;

        let responses = self.embed_responses(responses).await?;
        let added = responses.len();
        let total = self.store.append_responses(form_id, responses).await?;

        info!("Appended {} responses to form {} ({} total)", added, form_id, total);
        Ok(total)
    }

    async fn embed_responses(&self, inputs: Vec<ResponseInput>) -> Result<Vec<Response>> {
        for (i, input) in inputs.iter().enumerate() {
            if !input.data.is_object() {
                return Err(FormragError::InvalidInput(format!(
                    "response {} data must be an object of field values",
                    i + 1
                )));
            }
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = inputs.iter().map(|r| canonical_text(&r.data)).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        check_batch(&embeddings, texts.len(), self.embedder.dimensions())?;

        Ok(inputs
            .into_iter()
            .zip(embeddings)
            .map(|(input, embedding)| Response::new(input.data, embedding))
            .collect())
    }
}
