//! Configuration management for archivist
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Environment variable name for Qdrant API key
    #[serde(default = "default_qdrant_api_key_env")]
    pub qdrant_api_key_env: String,

    /// Qdrant collection name
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Ingestion configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Remote fetch configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding backend kind ("http", or "local" with the local-embed feature)
    #[serde(default = "default_embedding_backend")]
    pub backend: String,

    /// Embedding endpoint URL
    #[serde(default = "default_embedding_url")]
    pub url: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding requests
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Environment variable name for the embedding API key (empty = no auth)
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" => Some(384),
        "BAAI/bge-small-en-v1.5" => Some(384),
        "BAAI/bge-base-en-v1.5" => Some(768),
        "BAAI/bge-large-en-v1.5" => Some(1024),
        "sentence-transformers/all-MiniLM-L6-v2" => Some(384),
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Resolve the effective embedding dimension based on the configured model
    pub fn resolved_dimension(&self) -> usize {
        if let Some(expected) = embedding_dimension_for_model(&self.model) {
            if expected != self.dimension {
                warn!(
                    "Embedding dimension {} does not match model '{}' ({}); using {}",
                    self.dimension, self.model, expected, expected
                );
            }
            expected
        } else {
            self.dimension
        }
    }

    /// Get the embedding API key from environment
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_max_size")]
    pub max_chunk_size: usize,

    /// Minimum characters per chunk (smaller buffers keep accumulating)
    #[serde(default = "default_chunk_min_size")]
    pub min_chunk_size: usize,

    /// Overlap characters carried into the next chunk
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,

    /// Word-count overlap, preferred over `overlap / 10` when set
    #[serde(default)]
    pub overlap_words: Option<usize>,

    /// Keep fenced code blocks intact as single chunks
    #[serde(default = "default_respect_code_blocks")]
    pub respect_code_blocks: bool,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Default minimum normalized similarity score (0.0 - 1.0)
    #[serde(default = "default_score_threshold")]
    pub default_score_threshold: f32,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chunk records per upsert batch
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
}

/// Remote fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Attempts per fetch (transient failures only)
    #[serde(default = "default_fetch_retries")]
    pub retries: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_fetch_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// User agent string
    #[serde(default = "default_fetch_user_agent")]
    pub user_agent: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for archivist data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            qdrant_api_key_env: default_qdrant_api_key_env(),
            collection_name: default_collection_name(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            search: SearchConfig::default(),
            ingest: IngestConfig::default(),
            fetch: FetchConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            api_key_env: default_embedding_api_key_env(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_chunk_max_size(),
            min_chunk_size: default_chunk_min_size(),
            overlap: default_chunk_overlap(),
            overlap_words: None,
            respect_code_blocks: default_respect_code_blocks(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            default_score_threshold: default_score_threshold(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upsert_batch_size: default_upsert_batch_size(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            retries: default_fetch_retries(),
            retry_delay_ms: default_fetch_retry_delay_ms(),
            user_agent: default_fetch_user_agent(),
        }
    }
}

impl Config {
    /// Get the default base directory for archivist (~/.archivist)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".archivist")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, falling back to defaults
    /// when no config file exists yet
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the Qdrant API key from environment
    pub fn qdrant_api_key(&self) -> Option<String> {
        std::env::var(&self.qdrant_api_key_env).ok()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.max_chunk_size == 0
            || self.chunk.min_chunk_size == 0
            || self.chunk.overlap == 0
        {
            return Err(Error::Config(
                "chunk sizes and overlap must be positive".to_string(),
            ));
        }

        if self.chunk.max_chunk_size <= self.chunk.min_chunk_size {
            return Err(Error::Config(
                "chunk.max_chunk_size must be > chunk.min_chunk_size".to_string(),
            ));
        }

        if self.chunk.overlap >= self.chunk.max_chunk_size {
            return Err(Error::Config(
                "chunk.overlap must be < chunk.max_chunk_size".to_string(),
            ));
        }

        if let Some(words) = self.chunk.overlap_words {
            if words == 0 {
                return Err(Error::Config(
                    "chunk.overlap_words must be positive when set".to_string(),
                ));
            }
        }

        if self.search.default_limit == 0 || self.search.default_limit > 20 {
            return Err(Error::Config(
                "search.default_limit must be between 1 and 20".to_string(),
            ));
        }

        if self.search.default_score_threshold < 0.0 || self.search.default_score_threshold > 1.0 {
            return Err(Error::Config(
                "search.default_score_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.ingest.upsert_batch_size == 0 {
            return Err(Error::Config(
                "ingest.upsert_batch_size must be positive".to_string(),
            ));
        }

        if self.fetch.timeout_secs == 0 {
            return Err(Error::Config(
                "fetch.timeout_secs must be positive".to_string(),
            ));
        }

        if self.fetch.retries == 0 {
            return Err(Error::Config("fetch.retries must be positive".to_string()));
        }

        Ok(())
    }
}
