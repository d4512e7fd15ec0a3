//! Service wiring for Formrag.
//!
//! Builds the embedder, store, generator, ingestor and answer engine from the
//! settings and hands out shared handles to them.

use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder, GatedEmbedder, Readiness};
use crate::error::Result;
use crate::generation::{GenerationParams, Generator, OpenAIGenerator};
use crate::ingest::Ingestor;
use crate::rag::AnswerEngine;
use crate::store::{open_store, ResponseStore};
use std::sync::Arc;
use tracing::info;

/// The assembled Formrag services.
pub struct Orchestrator {
    embedder: GatedEmbedder,
    store: Arc<dyn ResponseStore>,
    ingestor: Ingestor,
    engine: AnswerEngine,
}

impl Orchestrator {
    /// Create the services described by `settings`.
    ///
    /// Embedder initialization starts in the background; use
    /// [`wait_ready`](Self::wait_ready) or [`readiness`](Self::readiness) to observe it.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder = create_embedder(&settings.embedding);
        let store = open_store(settings)?;
        let generator: Arc<dyn Generator> =
            Arc::new(OpenAIGenerator::from_settings(&settings.generation)?);

        info!(
            "Using {} embeddings ({} dims), {} store, generation model {}",
            settings.embedding.provider,
            settings.embedding.dimensions,
            settings.store.provider,
            settings.generation.model
        );

        Ok(Self::with_components(
            embedder,
            store,
            generator,
            prompts,
            GenerationParams::from(&settings.generation),
            settings.retrieval.limit,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        embedder: GatedEmbedder,
        store: Arc<dyn ResponseStore>,
        generator: Arc<dyn Generator>,
        prompts: Prompts,
        params: GenerationParams,
        limit: usize,
    ) -> Self {
        let shared: Arc<dyn Embedder> = Arc::new(embedder.clone());

        let ingestor = Ingestor::new(shared.clone(), store.clone());
        let engine = AnswerEngine::new(shared, store.clone(), generator)
            .with_prompts(prompts)
            .with_params(params)
            .with_limit(limit);

        Self {
            embedder,
            store,
            ingestor,
            engine,
        }
    }

    pub fn store(&self) -> Arc<dyn ResponseStore> {
        self.store.clone()
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn engine(&self) -> &AnswerEngine {
        &self.engine
    }

    pub fn readiness(&self) -> Readiness {
        self.embedder.readiness()
    }

    /// Wait for the embedding model; errors if its initialization failed.
    pub async fn wait_ready(&self) -> Result<()> {
        self.embedder.wait_ready().await
    }
}
