//! Add, replace, and delete command implementations

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::fetch::{read_file_text, Fetcher};
use crate::ingest::{self, AddReport, DocumentMeta};
use crate::store::QdrantStore;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Add options
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Read content from a local file instead of fetching the url
    pub file: Option<PathBuf>,
    /// Use inline text instead of fetching the url
    pub text: Option<String>,
    /// Document title, defaults to the url
    pub title: Option<String>,
    /// Content type override
    pub content_type: Option<String>,
    /// Replace an existing document instead of failing as a duplicate
    pub replace: bool,
}

/// Delete result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub url: String,
    pub deleted: u64,
}

/// Ingest one document under the given url
pub async fn cmd_add(
    config: &Config,
    store: &QdrantStore,
    embedder: &dyn Embedder,
    url: &str,
    options: AddOptions,
) -> Result<AddReport> {
    info!("Adding document: {}", url);

    let (content, detected_type) = resolve_content(config, url, &options).await?;

    let meta = DocumentMeta {
        title: options.title,
        content_type: options.content_type.or(detected_type),
    };

    if options.replace {
        ingest::replace_document(config, store, embedder, url, &content, meta).await
    } else {
        ingest::add_document(config, store, embedder, url, &content, meta).await
    }
}

/// Remove a document and all its chunks
pub async fn cmd_delete(store: &QdrantStore, url: &str) -> Result<DeleteReport> {
    info!("Deleting document: {}", url);

    let deleted = ingest::delete_document(store, url).await?;
    Ok(DeleteReport {
        url: url.to_string(),
        deleted,
    })
}

/// Resolve document content from inline text, a local file, or the url itself
async fn resolve_content(
    config: &Config,
    url: &str,
    options: &AddOptions,
) -> Result<(String, Option<String>)> {
    if options.text.is_some() && options.file.is_some() {
        return Err(Error::Input(
            "--file and --text cannot be combined".to_string(),
        ));
    }

    if let Some(text) = &options.text {
        return Ok((text.clone(), None));
    }

    if let Some(path) = &options.file {
        let fetched = read_file_text(path)?;
        return Ok((fetched.text, Some(fetched.content_type)));
    }

    let fetcher = Fetcher::new(&config.fetch)?;
    let fetched = fetcher.fetch_text(url).await?;
    Ok((fetched.text, Some(fetched.content_type)))
}

/// Print add results to console
pub fn print_add_report(report: &AddReport) {
    if report.replaced {
        println!("\n✓ Document replaced");
    } else {
        println!("\n✓ Document added");
    }
    println!("  URL: {}", report.url);
    println!("  Title: {}", report.title);
    println!("  Domain: {}", report.domain);
    println!("  Content type: {}", report.content_type);
    println!("  Words: {}", report.word_count);
    println!("  Chunks created: {}", report.chunks_created);
    if report.has_code {
        println!("  Contains code");
    }
}

/// Print delete results to console
pub fn print_delete_report(report: &DeleteReport) {
    if report.deleted == 0 {
        println!("No records found for {}", report.url);
    } else {
        println!(
            "✓ Deleted {} chunk{} for {}",
            report.deleted,
            if report.deleted == 1 { "" } else { "s" },
            report.url
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_text_wins_over_fetch() {
        let config = Config::default();
        let options = AddOptions {
            text: Some("inline body".to_string()),
            ..AddOptions::default()
        };

        let (content, detected) = resolve_content(&config, "https://example.com/doc", &options)
            .await
            .unwrap();
        assert_eq!(content, "inline body");
        assert!(detected.is_none());
    }

    #[tokio::test]
    async fn test_file_and_text_conflict() {
        let config = Config::default();
        let options = AddOptions {
            file: Some(PathBuf::from("/tmp/doc.md")),
            text: Some("inline".to_string()),
            ..AddOptions::default()
        };

        let err = resolve_content(&config, "https://example.com/doc", &options)
            .await
            .expect_err("conflicting inputs should fail");
        assert!(matches!(err, Error::Input(_)));
    }

    #[tokio::test]
    async fn test_file_content_type_guessed() {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .suffix(".md")
            .tempfile()
            .unwrap();
        writeln!(file, "# Heading\n\nBody text.").unwrap();

        let config = Config::default();
        let options = AddOptions {
            file: Some(file.path().to_path_buf()),
            ..AddOptions::default()
        };

        let (content, detected) = resolve_content(&config, "https://example.com/doc", &options)
            .await
            .unwrap();
        assert!(content.contains("Body text."));
        assert_eq!(detected.as_deref(), Some("text/markdown"));
    }
}
