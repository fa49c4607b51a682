//! Default values for configuration

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for Qdrant API key
pub fn default_qdrant_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "archivist_content".to_string()
}

/// Default embedding backend kind
pub fn default_embedding_backend() -> String {
    "http".to_string()
}

/// Default embedding endpoint URL (Ollama-style batch embed endpoint)
pub fn default_embedding_url() -> String {
    std::env::var("ARCHIVIST_EMBEDDING_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:11434/api/embed".to_string())
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

/// Default embedding dimension (matches the default model)
pub fn default_embedding_dimension() -> usize {
    768
}

/// Default batch size for embedding requests
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default environment variable name for the embedding API key
pub fn default_embedding_api_key_env() -> String {
    "".to_string()
}

/// Default maximum characters per chunk
pub fn default_chunk_max_size() -> usize {
    1000
}

/// Default minimum characters per chunk
pub fn default_chunk_min_size() -> usize {
    100
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    100
}

/// Default: keep fenced code blocks intact
pub fn default_respect_code_blocks() -> bool {
    true
}

/// Default number of search results
pub fn default_search_limit() -> usize {
    5
}

/// Default minimum normalized similarity score
pub fn default_score_threshold() -> f32 {
    0.7
}

/// Default number of chunk records per upsert batch
pub fn default_upsert_batch_size() -> usize {
    100
}

/// Default fetch timeout in seconds
pub fn default_fetch_timeout() -> u64 {
    10
}

/// Default number of fetch attempts for transient failures
pub fn default_fetch_retries() -> u32 {
    3
}

/// Default delay between fetch attempts in milliseconds
pub fn default_fetch_retry_delay_ms() -> u64 {
    500
}

/// Default user agent for fetches
pub fn default_fetch_user_agent() -> String {
    format!("archivist/{} (Content Archiver)", env!("CARGO_PKG_VERSION"))
}
