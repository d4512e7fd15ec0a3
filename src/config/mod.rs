//! Configuration module for Formrag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalyzePrompts, Prompts};
pub use settings::{
    EmbeddingProvider, EmbeddingSettings, GeneralSettings, GenerationSettings, PromptSettings,
    RetrievalSettings, ServerSettings, Settings, StoreProvider, StoreSettings,
};
