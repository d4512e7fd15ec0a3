//! In-memory response store implementation.
//!
//! Useful for testing and ephemeral servers.

use super::{parse_form_id, Form, FormSummary, NewForm, Response, ResponseStore};
use crate::error::{FormragError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory response store.
pub struct MemoryResponseStore {
    forms: RwLock<HashMap<Uuid, Form>>,
}

impl MemoryResponseStore {
    /// Create a new in-memory response store.
    pub fn new() -> Self {
        Self {
            forms: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryResponseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn create_form(&self, form: NewForm) -> Result<Form> {
        let form = Form {
            id: Uuid::new_v4(),
            name: form.name,
            fields: form.fields,
            responses: form.responses,
            created_at: Utc::now(),
        };

        let mut forms = self.forms.write().await;
        forms.insert(form.id, form.clone());
        Ok(form)
    }

    async fn append_responses(&self, form_id: &str, responses: Vec<Response>) -> Result<usize> {
        let id = parse_form_id(form_id)?;

        // One write guard covers the whole batch.
        let mut forms = self.forms.write().await;
        let form = forms
            .get_mut(&id)
            .ok_or_else(|| FormragError::FormNotFound(form_id.to_string()))?;
        form.responses.extend(responses);
        Ok(form.responses.len())
    }

    async fn list_forms(&self) -> Result<Vec<FormSummary>> {
        let forms = self.forms.read().await;
        let mut summaries: Vec<FormSummary> = forms
            .values()
            .map(|f| FormSummary {
                id: f.id,
                name: f.name.clone(),
                response_count: f.responses.len(),
                created_at: f.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn get_form(&self, form_id: &str) -> Result<Form> {
        let id = parse_form_id(form_id)?;
        let forms = self.forms.read().await;
        forms
            .get(&id)
            .cloned()
            .ok_or_else(|| FormragError::FormNotFound(form_id.to_string()))
    }

    async fn fetch_responses(&self, form_id: &str) -> Result<Vec<Response>> {
        let id = parse_form_id(form_id)?;
        let forms = self.forms.read().await;
        forms
            .get(&id)
            .map(|f| f.responses.clone())
            .ok_or_else(|| FormragError::FormNotFound(form_id.to_string()))
    }
}
