//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{canonical_filter, QdrantStore};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub qdrant_url: String,
    pub collection_name: String,
    pub embedding_backend: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub qdrant_connected: bool,
    pub collection_exists: bool,
    pub vector_size: Option<u64>,
    pub points_count: u64,
    pub document_count: u64,
}

/// Get system status
pub async fn cmd_status(config: &Config, store: &QdrantStore) -> Result<StatusInfo> {
    info!("Getting status");

    // Probe Qdrant; a failed probe is reported, not propagated
    let (qdrant_connected, collection_exists, vector_size, points_count, document_count) =
        match store.collection_info().await {
            Ok(Some(info)) => {
                let documents = match store.count(Some(canonical_filter())).await {
                    Ok(count) => count,
                    Err(e) => {
                        tracing::debug!("Document count error: {:?}", e);
                        0
                    }
                };
                (true, true, info.vector_size, info.points_count, documents)
            }
            Ok(None) => (true, false, None, 0, 0),
            Err(e) => {
                tracing::debug!("Qdrant connection error: {:?}", e);
                (false, false, None, 0, 0)
            }
        };

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        qdrant_url: config.qdrant_url.clone(),
        collection_name: config.collection_name.clone(),
        embedding_backend: config.embedding.backend.clone(),
        embedding_model: config.embedding.model.clone(),
        embedding_dimension: store.dimension(),
        qdrant_connected,
        collection_exists,
        vector_size,
        points_count,
        document_count,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 archivist Status\n");
    println!("Configuration: {}", status.config_path);
    println!("\nQdrant:");
    println!("  URL: {}", status.qdrant_url);
    println!("  Collection: {}", status.collection_name);

    let connection_status = if status.qdrant_connected {
        if status.collection_exists {
            "✓ Connected"
        } else {
            "⚠ Connected (collection not created - run 'archivist db init' to create)"
        }
    } else {
        "✗ Not connected"
    };
    println!("  Status: {}", connection_status);
    println!("  Documents: {}", status.document_count);
    println!("  Chunks: {}", status.points_count);
    if let Some(size) = status.vector_size {
        println!("  Vector size: {}", size);
    }
    println!("\nEmbedding:");
    println!("  Backend: {}", status.embedding_backend);
    println!("  Model: {}", status.embedding_model);
    println!("  Dimension: {}", status.embedding_dimension);
}
