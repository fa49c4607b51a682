//! archivist - capture web content into a semantic, searchable archive
//!
//! This crate provides:
//! - Deterministic text chunking with code-fence awareness
//! - Embedding generation over HTTP (or in-process with `local-embed`)
//! - A Qdrant-backed store with filtered semantic search and listing

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod listing;
pub mod progress;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
