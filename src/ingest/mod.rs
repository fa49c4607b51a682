//! Document ingestion pipeline
//!
//! Turns a document's text into embedded chunk records and stores them:
//! duplicate check, profile derivation (domain, word count, code heuristic),
//! chunking, batched embedding, and batched upsert. Replacement is an
//! explicit delete followed by an add; the add path itself never overwrites.

use crate::chunk::{chunk, Chunk, ChunkOptions};
use crate::config::Config;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result};
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::store::{url_filter, ChunkPayload, ChunkRecord, QdrantStore, RECORD_KIND};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Caller-supplied metadata accompanying the document text
#[derive(Debug, Clone, Default)]
pub struct DocumentMeta {
    pub title: Option<String>,
    pub content_type: Option<String>,
}

/// Document-level attributes stored with every chunk
#[derive(Debug, Clone)]
pub struct DocumentProfile {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub timestamp: i64,
    pub content_type: String,
    pub word_count: usize,
    pub has_code: bool,
}

/// Outcome of an add or replace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddReport {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub content_type: String,
    pub word_count: usize,
    pub has_code: bool,
    pub chunks_created: usize,
    pub replaced: bool,
}

/// Ingest a document. Fails with `Error::Duplicate` when any record already
/// exists under this url.
///
/// Chunks are embedded in batches and upserted in fixed-size batches with
/// durability waits; a failure partway through aborts the operation and
/// leaves earlier batches committed.
pub async fn add_document(
    config: &Config,
    store: &QdrantStore,
    embedder: &dyn Embedder,
    url: &str,
    content: &str,
    meta: DocumentMeta,
) -> Result<AddReport> {
    let profile = document_profile(url, content, meta)?;

    store.ensure_collection().await?;

    if store.count(Some(url_filter(url))).await? > 0 {
        return Err(Error::Duplicate(url.to_string()));
    }

    let options = ChunkOptions::from(&config.chunk);
    let chunks = chunk(content, &options)?;
    info!("Chunked {} into {} chunks", url, chunks.len());

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embed_in_batches(embedder, texts, config.embedding.batch_size).await?;

    if vectors.len() != chunks.len() {
        return Err(Error::Embedding(format!(
            "expected {} embeddings for '{}', got {}",
            chunks.len(),
            url,
            vectors.len()
        )));
    }

    let records = build_records(&profile, chunks, vectors);
    let total = records.len();

    let pb = start_progress_bar(total as u64, "Storing chunks");
    let mut pending = records.into_iter();
    loop {
        let batch: Vec<ChunkRecord> = pending
            .by_ref()
            .take(config.ingest.upsert_batch_size)
            .collect();
        if batch.is_empty() {
            break;
        }

        let batch_len = batch.len() as u64;
        store.upsert_records(batch).await?;
        advance_progress(&pb, batch_len);
    }
    finish_progress(pb, "Chunks stored");

    info!("Stored {} chunks for {}", total, url);

    Ok(AddReport {
        url: profile.url,
        title: profile.title,
        domain: profile.domain,
        content_type: profile.content_type,
        word_count: profile.word_count,
        has_code: profile.has_code,
        chunks_created: total,
        replaced: false,
    })
}

/// Delete then add under the same url, as two explicit steps
pub async fn replace_document(
    config: &Config,
    store: &QdrantStore,
    embedder: &dyn Embedder,
    url: &str,
    content: &str,
    meta: DocumentMeta,
) -> Result<AddReport> {
    store.ensure_collection().await?;

    let removed = delete_document(store, url).await?;
    let mut report = add_document(config, store, embedder, url, content, meta).await?;
    report.replaced = removed > 0;
    Ok(report)
}

/// Delete every chunk record stored under this url, returning the number
/// removed. Deleting an absent url is a no-op.
pub async fn delete_document(store: &QdrantStore, url: &str) -> Result<u64> {
    if !store.collection_exists().await? {
        return Ok(0);
    }

    let existing = store.count(Some(url_filter(url))).await?;
    if existing == 0 {
        debug!("No records for {}; delete is a no-op", url);
        return Ok(0);
    }

    store.delete_by_filter(url_filter(url)).await?;
    info!("Deleted {} chunk records for {}", existing, url);
    Ok(existing)
}

/// Derive the document profile from the url, content, and caller metadata.
/// The url string is kept verbatim as the document key; only domain
/// derivation parses it.
pub fn document_profile(url: &str, content: &str, meta: DocumentMeta) -> Result<DocumentProfile> {
    let parsed =
        Url::parse(url).map_err(|e| Error::Input(format!("invalid url '{}': {}", url, e)))?;

    Ok(DocumentProfile {
        url: url.to_string(),
        title: meta.title.unwrap_or_else(|| url.to_string()),
        domain: derive_domain(&parsed),
        timestamp: Utc::now().timestamp(),
        content_type: meta
            .content_type
            .unwrap_or_else(|| "text/plain".to_string()),
        word_count: count_words(content),
        has_code: detect_code(content),
    })
}

/// URL host, lowercased; hostless schemes (file:) map to "local"
pub fn derive_domain(url: &Url) -> String {
    url.host_str()
        .map(|h| h.to_lowercase())
        .unwrap_or_else(|| "local".to_string())
}

/// Whitespace-delimited token count
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

const CODE_KEYWORDS: [&str; 7] = [
    "function ",
    "def ",
    "class ",
    "import ",
    "#include",
    "pub fn",
    "=> ",
];

/// Lightweight heuristic: fenced code markers or common code keywords.
/// False positives are accepted; this only feeds the `has_code` filter flag.
pub fn detect_code(text: &str) -> bool {
    text.contains("```") || CODE_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Deterministic record id for `(url, chunk_index)`, so re-ingesting a chunk
/// overwrites its record instead of duplicating it
pub fn chunk_record_id(url: &str, chunk_index: usize) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{}#{}", url, chunk_index).as_bytes(),
    )
}

/// Assemble one record per chunk, all carrying the full document attributes
/// and a consistent `total_chunks`
fn build_records(
    profile: &DocumentProfile,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
) -> Vec<ChunkRecord> {
    let total_chunks = chunks.len();

    chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| ChunkRecord {
            id: chunk_record_id(&profile.url, chunk.index),
            vector,
            payload: ChunkPayload {
                url: profile.url.clone(),
                title: profile.title.clone(),
                domain: profile.domain.clone(),
                timestamp: profile.timestamp,
                content_type: profile.content_type.clone(),
                word_count: profile.word_count,
                has_code: profile.has_code,
                content: chunk.content,
                chunk_index: chunk.index,
                total_chunks,
                start_position: chunk.start_position,
                end_position: chunk.end_position,
                is_code_block: chunk.is_code_block,
                page_number: None,
                paragraph_index: None,
                kind: RECORD_KIND.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> DocumentProfile {
        DocumentProfile {
            url: "https://example.com/guide".to_string(),
            title: "Guide".to_string(),
            domain: "example.com".to_string(),
            timestamp: 1_700_000_000,
            content_type: "text/html".to_string(),
            word_count: 120,
            has_code: false,
        }
    }

    #[test]
    fn test_derive_domain() {
        let url = Url::parse("https://Example.COM/docs/page").unwrap();
        assert_eq!(derive_domain(&url), "example.com");

        let url = Url::parse("http://sub.domain.io/x").unwrap();
        assert_eq!(derive_domain(&url), "sub.domain.io");

        let url = Url::parse("file:///home/user/notes.md").unwrap();
        assert_eq!(derive_domain(&url), "local");
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("one two  three\n\tfour"), 4);
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words("single"), 1);
    }

    #[test]
    fn test_detect_code() {
        assert!(detect_code("Some text with ```rust\nfn main() {}\n``` inside."));
        assert!(detect_code("In Python you write def handler(event):"));
        assert!(detect_code("Use #include <stdio.h> at the top."));
        assert!(!detect_code("Just a plain paragraph about gardening."));
    }

    #[test]
    fn test_chunk_record_id_deterministic() {
        let a = chunk_record_id("https://example.com/doc", 0);
        let b = chunk_record_id("https://example.com/doc", 0);
        assert_eq!(a, b);

        let other_index = chunk_record_id("https://example.com/doc", 1);
        assert_ne!(a, other_index);

        let other_url = chunk_record_id("https://example.com/other", 0);
        assert_ne!(a, other_url);
    }

    #[test]
    fn test_document_profile_defaults() {
        let profile = document_profile(
            "https://example.com/post",
            "A short body. With words.",
            DocumentMeta::default(),
        )
        .unwrap();

        assert_eq!(profile.url, "https://example.com/post");
        assert_eq!(profile.title, "https://example.com/post");
        assert_eq!(profile.domain, "example.com");
        assert_eq!(profile.content_type, "text/plain");
        assert_eq!(profile.word_count, 5);
        assert!(!profile.has_code);
        assert!(profile.timestamp > 0);
    }

    #[test]
    fn test_document_profile_rejects_invalid_url() {
        let result = document_profile("not a url", "text", DocumentMeta::default());
        match result {
            Err(Error::Input(message)) => assert!(message.contains("not a url")),
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn test_build_records_consistent_bookkeeping() {
        let profile = test_profile();
        let chunks = vec![
            Chunk {
                content: "First chunk.".to_string(),
                index: 0,
                start_position: 0,
                end_position: 12,
                is_code_block: false,
            },
            Chunk {
                content: "```code```".to_string(),
                index: 1,
                start_position: 12,
                end_position: 22,
                is_code_block: true,
            },
            Chunk {
                content: "Last chunk.".to_string(),
                index: 2,
                start_position: 22,
                end_position: 33,
                is_code_block: false,
            },
        ];
        let vectors = vec![vec![0.1, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]];

        let records = build_records(&profile, chunks, vectors);

        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.payload.chunk_index, i);
            assert_eq!(record.payload.total_chunks, 3);
            assert_eq!(record.payload.url, profile.url);
            assert_eq!(record.payload.domain, profile.domain);
            assert_eq!(record.payload.kind, RECORD_KIND);
            assert_eq!(record.id, chunk_record_id(&profile.url, i));
        }

        // Canonical record carries document attributes for listing
        assert_eq!(records[0].payload.chunk_index, 0);
        assert_eq!(records[0].payload.title, "Guide");
        assert_eq!(records[0].payload.word_count, 120);

        assert!(records[1].payload.is_code_block);
        assert!(!records[2].payload.is_code_block);
    }
}
