//! HTTP embedding backend

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

/// Accepts both Ollama-style and OpenAI-style response bodies
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Embeddings { embeddings: Vec<Vec<f32>> },
    Data { data: Vec<EmbeddingData> },
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbedResponse {
    fn into_embeddings(self) -> Vec<Vec<f32>> {
        match self {
            EmbedResponse::Embeddings { embeddings } => embeddings,
            EmbedResponse::Data { data } => data.into_iter().map(|d| d.embedding).collect(),
        }
    }
}

/// Embedder backed by a remote HTTP embedding service
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::Config("embedding.url must not be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Embedding(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            dimension: config.resolved_dimension(),
            api_key: config.api_key(),
        })
    }

    fn validate_vectors(&self, vectors: &[Vec<f32>], expected_count: usize) -> Result<()> {
        if vectors.len() != expected_count {
            return Err(Error::Embedding(format!(
                "backend returned {} embeddings for {} inputs",
                vectors.len(),
                expected_count
            )));
        }

        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(Error::Embedding(format!(
                    "model '{}' returned a {}-dimensional vector, expected {}",
                    self.model,
                    vector.len(),
                    self.dimension
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts via {}", texts.len(), self.url);

        let expected = texts.len();
        let request = EmbedRequest {
            model: self.model.clone(),
            input: texts,
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("request to {} failed: {}", self.url, e)))?
            .error_for_status()
            .map_err(|e| Error::Embedding(format!("embedding service error: {}", e)))?;

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("invalid embedding response: {}", e)))?;

        let vectors = parsed.into_embeddings();
        self.validate_vectors(&vectors, expected)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: String) -> EmbeddingConfig {
        EmbeddingConfig {
            backend: "http".to_string(),
            url,
            model: "custom-model".to_string(),
            dimension: 3,
            batch_size: 2,
            api_key_env: "".to_string(),
        }
    }

    #[tokio::test]
    async fn test_embed_ollama_response_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(serde_json::json!({
                "model": "custom-model"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
            })))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/api/embed", server.uri()));
        let embedder = HttpEmbedder::new(&config).unwrap();

        let vectors = embedder
            .embed(vec!["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_openai_response_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0, 0.0, -1.0]}]
            })))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/v1/embeddings", server.uri()));
        let embedder = HttpEmbedder::new(&config).unwrap();

        let vectors = embedder.embed(vec!["query".to_string()]).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0, -1.0]]);
    }

    #[tokio::test]
    async fn test_embed_rejects_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2]]
            })))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/api/embed", server.uri()));
        let embedder = HttpEmbedder::new(&config).unwrap();

        let err = embedder
            .embed(vec!["text".to_string()])
            .await
            .expect_err("2-dim vector should be rejected for a 3-dim model");
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_rejects_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.1, 0.2, 0.3]]
            })))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/api/embed", server.uri()));
        let embedder = HttpEmbedder::new(&config).unwrap();

        let err = embedder
            .embed(vec!["one".to_string(), "two".to_string()])
            .await
            .expect_err("one vector for two inputs should be rejected");
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_surfaces_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/api/embed", server.uri()));
        let embedder = HttpEmbedder::new(&config).unwrap();

        let err = embedder
            .embed(vec!["text".to_string()])
            .await
            .expect_err("500 should surface as an embedding error");
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_empty_input_skips_request() {
        let config = test_config("http://127.0.0.1:1/api/embed".to_string());
        let embedder = HttpEmbedder::new(&config).unwrap();

        let vectors = embedder.embed(Vec::new()).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_embed_one_returns_single_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[0.5, 0.5, 0.5]]
            })))
            .mount(&server)
            .await;

        let config = test_config(format!("{}/api/embed", server.uri()));
        let embedder = HttpEmbedder::new(&config).unwrap();

        let vector = embedder.embed_one("query".to_string()).await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_rejects_empty_url() {
        let config = test_config(String::new());
        assert!(matches!(HttpEmbedder::new(&config), Err(Error::Config(_))));
    }
}
