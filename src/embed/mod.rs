//! Embedding generation
//!
//! This module provides an abstraction over embedding providers with:
//! - A trait for different embedding backends
//! - HTTP embedding backend
//! - Batch processing for efficiency

mod http_backend;

#[cfg(feature = "local-embed")]
mod fastembed_impl;

pub use http_backend::*;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (query path)
    async fn embed_one(&self, text: String) -> Result<Vec<f32>> {
        let mut vectors = self.embed(vec![text]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("backend returned no embedding".to_string()))
    }

    /// Get the embedding dimension without generating an embedding
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.backend.as_str() {
        "http" => Ok(Box::new(HttpEmbedder::new(config)?)),
        #[cfg(feature = "local-embed")]
        "local" => Ok(Box::new(FastEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embed"))]
        "local" => Err(Error::Config(
            "embedding.backend 'local' requires building with the 'local-embed' feature"
                .to_string(),
        )),
        other => Err(Error::Config(format!(
            "unsupported embedding.backend '{}'; expected 'http' or 'local'",
            other
        ))),
    }
}

/// Helper to embed in batches
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let embeddings = embedder.embed(batch_texts).await?;
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}
