//! Formrag - question answering over form responses
//!
//! Stores forms with their free-text/field responses and answers natural
//! language questions using the responses most similar to the question.
//!
//! # Overview
//!
//! Formrag allows you to:
//! - Ingest forms and append responses, embedding each response at write time
//! - Rank a form's responses against a question by cosine similarity
//! - Forward the best matches as context to a text-generation model
//! - Serve all of the above over a small HTTP API
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `embedding` - Embedding generation and the readiness gate
//! - `store` - Form and response storage
//! - `ingest` - Write path (embed, then append atomically)
//! - `rag` - Ranking, context assembly and the answer engine
//! - `generation` - Text-generation backend
//! - `orchestrator` - Service wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use formrag::config::Settings;
//! use formrag::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!     orchestrator.wait_ready().await?;
//!
//!     let result = orchestrator
//!         .engine()
//!         .analyze("0b7c6a52-7a4a-4c1e-9a51-8d0f1c2d3e4f", "Which color was most popular?")
//!         .await;
//!     println!("{:?}", result.answer());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod store;

pub use error::{FormragError, Result};
