//! In-process embedding backend built on fastembed
//!
//! Compiled behind the `local-embed` feature. Downloads the model on first
//! use and runs inference on the blocking thread pool, so no embedding
//! service needs to be running.

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Embedder running a fastembed model inside the process
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

/// Map a configured model name to the fastembed model enum. Unknown names
/// are a configuration error rather than a silent substitution, since the
/// collection dimension is derived from the model.
fn model_for_name(name: &str) -> Result<EmbeddingModel> {
    match name {
        "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "BAAI/bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "sentence-transformers/all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        other => Err(Error::Config(format!(
            "embedding.model '{}' is not available with the local backend; \
             supported models: BAAI/bge-small-en-v1.5, BAAI/bge-base-en-v1.5, \
             BAAI/bge-large-en-v1.5, sentence-transformers/all-MiniLM-L6-v2",
            other
        ))),
    }
}

impl FastEmbedder {
    /// Load the configured model, downloading it on first use
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        info!("Loading local embedding model {}", config.model);

        let model_enum = model_for_name(&config.model)?;
        let options = InitOptions::new(model_enum).with_show_download_progress(true);

        let model = TextEmbedding::try_new(options).map_err(|e| {
            Error::Embedding(format!("could not load model '{}': {}", config.model, e))
        })?;

        debug!("Local embedding model ready");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: config.model.clone(),
            dimension: config.resolved_dimension(),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts locally", texts.len());

        // Inference is synchronous; run it off the async runtime
        let model = self.model.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let model = model.blocking_lock();
            model.embed(texts, None)
        })
        .await
        .map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))?;

        joined.map_err(|e| Error::Embedding(format!("local embedding failed: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::embedding_dimension_for_model;

    #[test]
    fn test_model_mapping() {
        assert!(model_for_name("BAAI/bge-small-en-v1.5").is_ok());
        assert!(model_for_name("sentence-transformers/all-MiniLM-L6-v2").is_ok());

        let err = model_for_name("nomic-embed-text").expect_err("http-only model");
        match err {
            Error::Config(message) => assert!(message.contains("local backend")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_supported_models_have_known_dimensions() {
        for model in [
            "BAAI/bge-small-en-v1.5",
            "BAAI/bge-base-en-v1.5",
            "BAAI/bge-large-en-v1.5",
            "sentence-transformers/all-MiniLM-L6-v2",
        ] {
            assert!(model_for_name(model).is_ok());
            assert!(embedding_dimension_for_model(model).is_some());
        }
    }

    // Downloads the model; run manually with: cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_local_embedding_roundtrip() {
        let config = EmbeddingConfig {
            backend: "local".to_string(),
            model: "BAAI/bge-small-en-v1.5".to_string(),
            dimension: 384,
            ..EmbeddingConfig::default()
        };

        let embedder = FastEmbedder::new(&config).unwrap();
        let texts = vec!["Hello world".to_string(), "A second passage".to_string()];

        let vectors = embedder.embed(texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 384);
    }
}
