//! Search command implementation

use crate::embed::Embedder;
use crate::error::Result;
use crate::search::{self, SearchOptions, SearchResult};
use crate::store::QdrantStore;
use serde::Serialize;
use tracing::{debug, info};

/// Search result set for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// Embed the query and run a filtered similarity search
pub async fn cmd_search(
    store: &QdrantStore,
    embedder: &dyn Embedder,
    query: &str,
    options: &SearchOptions,
) -> Result<SearchReport> {
    info!("Searching: {}", query);

    let query_vector = embedder.embed_one(query.to_string()).await?;
    debug!(
        "Query embedded with {} ({} dims)",
        embedder.model_name(),
        query_vector.len()
    );

    let results = search::search(store, query_vector, options).await?;
    info!("Returning {} results", results.len());

    Ok(SearchReport {
        query: query.to_string(),
        results,
    })
}

/// Print search results to console
pub fn print_search_results(report: &SearchReport) {
    println!("\n🔍 Query: {}\n", report.query);

    if report.results.is_empty() {
        println!("No results above the score threshold.");
        return;
    }

    println!("Found {} results:\n", report.results.len());

    for (i, r) in report.results.iter().enumerate() {
        println!("{}. [score: {:.3}] {}", i + 1, r.score, r.payload.url);
        println!("   Title: {} ({})", r.payload.title, r.payload.domain);
        if r.payload.total_chunks > 1 {
            println!(
                "   Chunk {}/{}",
                r.payload.chunk_index + 1,
                r.payload.total_chunks
            );
        }
        if r.payload.is_code_block {
            println!("   [code]");
        }
        println!("   {}\n", preview(&r.payload.content, 200));
    }
}

/// Single-line preview, cut on a char boundary
fn preview(text: &str, max_chars: usize) -> String {
    let flattened = text.trim().replace('\n', " ");
    if flattened.chars().count() <= max_chars {
        flattened
    } else {
        let cut: String = flattened.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
