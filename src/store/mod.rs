//! Response store abstraction for Formrag.
//!
//! A form exclusively owns its responses. Responses are append-only: a batch
//! is written as one unit or not at all.

mod memory;
mod sqlite;

pub use memory::MemoryResponseStore;
pub use sqlite::SqliteResponseStore;

use crate::config::{Settings, StoreProvider};
use crate::error::{FormragError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// A named field declared by a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
}

/// One submitted response with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Unique response ID.
    pub id: Uuid,
    /// Field name to value mapping, in submission order.
    pub data: Value,
    /// Unit-length embedding of [`canonical_text`] of `data`.
    pub embedding: Vec<f32>,
    /// When this response was stored.
    pub created_at: DateTime<Utc>,
}

impl Response {
    pub fn new(data: Value, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// A stored form with all of its responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub id: Uuid,
    pub name: String,
    pub fields: Vec<Field>,
    pub responses: Vec<Response>,
    pub created_at: DateTime<Utc>,
}

/// A form about to be created.
#[derive(Debug, Clone)]
pub struct NewForm {
    pub name: String,
    pub fields: Vec<Field>,
    pub responses: Vec<Response>,
}

/// Listing entry for a form, without its responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: Uuid,
    pub name: String,
    pub response_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Text that gets embedded for a response.
///
/// Compact JSON with keys in insertion order, so the same record always
/// produces the same text.
pub fn canonical_text(data: &Value) -> String {
    data.to_string()
}

/// Parse a form ID. Anything that is not a UUID cannot name a stored form.
pub fn parse_form_id(form_id: &str) -> Result<Uuid> {
    Uuid::parse_str(form_id.trim()).map_err(|_| FormragError::FormNotFound(form_id.to_string()))
}

/// Trait for response store implementations.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Create a form together with its initial responses.
    async fn create_form(&self, form: NewForm) -> Result<Form>;

    /// Atomically append responses to an existing form. Returns the new response count.
    async fn append_responses(&self, form_id: &str, responses: Vec<Response>) -> Result<usize>;

    /// List all forms, oldest first.
    async fn list_forms(&self) -> Result<Vec<FormSummary>>;

    /// Get a form with its responses.
    async fn get_form(&self, form_id: &str) -> Result<Form>;

    /// Get the responses of a form, in insertion order.
    async fn fetch_responses(&self, form_id: &str) -> Result<Vec<Response>>;
}

/// Open the store selected in the settings.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn ResponseStore>> {
    match settings.store.provider {
        StoreProvider::Memory => Ok(Arc::new(MemoryResponseStore::new())),
        StoreProvider::Sqlite => Ok(Arc::new(SqliteResponseStore::new(&settings.sqlite_path())?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_text_keeps_key_order() {
        let data = json!({"zeta": 1, "alpha": "x", "mid": [true, null]});
        assert_eq!(canonical_text(&data), r#"{"zeta":1,"alpha":"x","mid":[true,null]}"#);
        assert_eq!(canonical_text(&data), canonical_text(&data.clone()));
    }

    #[test]
    fn test_parse_form_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_form_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_form_id("66b1f0c2e4"),
            Err(FormragError::FormNotFound(_))
        ));
    }
}
