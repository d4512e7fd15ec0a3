//! Readiness gate for embedders that initialize asynchronously.

use super::Embedder;
use crate::error::{FormragError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Externally visible initialization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Initializing,
    Ready,
    Failed(String),
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Readiness::Initializing => write!(f, "initializing"),
            Readiness::Ready => write!(f, "ready"),
            Readiness::Failed(_) => write!(f, "failed"),
        }
    }
}

#[derive(Clone)]
enum GateState {
    Initializing,
    Ready(Arc<dyn Embedder>),
    Failed(String),
}

/// Embedder that refuses work until its inner model has finished loading.
///
/// Calls made while initializing fail fast with `ModelUnavailable`; they are
/// never forwarded to a half-built model. Clones share the same state.
#[derive(Clone)]
pub struct GatedEmbedder {
    state: watch::Receiver<GateState>,
    dimensions: usize,
}

impl GatedEmbedder {
    /// Wrap an embedder that is usable immediately.
    pub fn ready(embedder: Arc<dyn Embedder>) -> Self {
        let dimensions = embedder.dimensions();
        let (_tx, rx) = watch::channel(GateState::Ready(embedder));
        Self { state: rx, dimensions }
    }

    /// Run `init` on the runtime and open the gate when it resolves.
    pub fn spawn<F>(dimensions: usize, init: F) -> Self
    where
        F: Future<Output = Result<Arc<dyn Embedder>>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(GateState::Initializing);

        tokio::spawn(async move {
            let state = match init.await {
                Ok(embedder) if embedder.dimensions() != dimensions => {
                    let reason = FormragError::DimensionMismatch {
                        expected: dimensions,
                        found: embedder.dimensions(),
                    }
                    .to_string();
                    error!("Embedding model initialization failed: {}", reason);
                    GateState::Failed(reason)
                }
                Ok(embedder) => {
                    info!("Embedding model initialized");
                    GateState::Ready(embedder)
                }
                Err(e) => {
                    error!("Embedding model initialization failed: {}", e);
                    GateState::Failed(e.to_string())
                }
            };
            let _ = tx.send(state);
        });

        Self { state: rx, dimensions }
    }

    /// Current initialization state.
    pub fn readiness(&self) -> Readiness {
        match &*self.state.borrow() {
            GateState::Initializing => Readiness::Initializing,
            GateState::Ready(_) => Readiness::Ready,
            GateState::Failed(reason) => Readiness::Failed(reason.clone()),
        }
    }

    /// Wait until initialization has resolved. Errors if it failed.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| !matches!(s, GateState::Initializing))
            .await
            .map_err(|_| {
                FormragError::ModelUnavailable("initialization task ended unexpectedly".to_string())
            })?
            .clone();

        match state {
            GateState::Failed(reason) => Err(FormragError::ModelUnavailable(reason)),
            _ => Ok(()),
        }
    }

    fn current(&self) -> Result<Arc<dyn Embedder>> {
        match &*self.state.borrow() {
            GateState::Ready(embedder) => Ok(embedder.clone()),
            GateState::Initializing => Err(FormragError::ModelUnavailable(
                "model is still initializing".to_string(),
            )),
            GateState::Failed(reason) => Err(FormragError::ModelUnavailable(format!(
                "model failed to initialize: {}",
                reason
            ))),
        }
    }
}

#[async_trait]
impl Embedder for GatedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = self.current()?;
        embedder.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.current()?;
        embedder.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_ready_embedder_passes_through() {
        let gate = GatedEmbedder::ready(Arc::new(HashingEmbedder::new(8)));
        assert_eq!(gate.readiness(), Readiness::Ready);
        assert_eq!(gate.dimensions(), 8);
        assert_eq!(gate.embed("hello").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_rejects_until_initialized() {
        let (tx, rx) = oneshot::channel::<()>();
        let gate = GatedEmbedder::spawn(8, async move {
            let _ = rx.await;
            Ok(Arc::new(HashingEmbedder::new(8)) as Arc<dyn Embedder>)
        });

        assert_eq!(gate.readiness(), Readiness::Initializing);
        assert!(matches!(
            gate.embed("too early").await,
            Err(FormragError::ModelUnavailable(_))
        ));

        tx.send(()).unwrap();
        gate.wait_ready().await.unwrap();
        assert_eq!(gate.readiness(), Readiness::Ready);
        assert!(gate.embed("now").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_initialization() {
        let gate = GatedEmbedder::spawn(8, async {
            Err(FormragError::Embedding("no such model".to_string()))
        });

        assert!(matches!(
            gate.wait_ready().await,
            Err(FormragError::ModelUnavailable(_))
        ));
        assert!(matches!(gate.readiness(), Readiness::Failed(_)));
        assert!(matches!(
            gate.embed_batch(&["x".to_string()]).await,
            Err(FormragError::ModelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_dimension_disagreement_fails_gate() {
        let gate = GatedEmbedder::spawn(384, async {
            Ok(Arc::new(HashingEmbedder::new(16)) as Arc<dyn Embedder>)
        });
        assert!(gate.wait_ready().await.is_err());
    }
}
