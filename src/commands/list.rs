//! List command implementation

use crate::error::Result;
use crate::listing::{self, DocumentListing, DocumentSummary, ListOptions};
use crate::store::QdrantStore;
use chrono::{TimeZone, Utc};
use tracing::info;

/// List stored documents
pub async fn cmd_list(store: &QdrantStore, options: &ListOptions) -> Result<DocumentListing> {
    info!("Listing documents (page {})", options.page);
    listing::list_documents(store, options).await
}

/// Print a document listing to console
pub fn print_listing(listing: &DocumentListing) {
    println!("\n📚 Stored Documents\n");

    if listing.total == 0 {
        println!("No documents stored. Use 'archivist add' to ingest one.");
        return;
    }

    match &listing.groups {
        Some(groups) => {
            for group in groups {
                println!(
                    "{} ({} document{})",
                    group.domain,
                    group.documents.len(),
                    if group.documents.len() == 1 { "" } else { "s" }
                );
                for doc in &group.documents {
                    print_summary(doc, "  ");
                }
                println!();
            }
        }
        None => {
            for doc in &listing.documents {
                print_summary(doc, "");
                println!();
            }
        }
    }

    println!(
        "Page {} of {} ({} document{} total)",
        listing.page,
        listing.total_pages,
        listing.total,
        if listing.total == 1 { "" } else { "s" }
    );
}

fn print_summary(doc: &DocumentSummary, indent: &str) {
    println!("{}• {} [{}]", indent, doc.title, doc.domain);
    println!("{}  URL: {}", indent, doc.url);
    println!(
        "{}  Words: {}, Chunks: {}{}",
        indent,
        doc.word_count,
        doc.total_chunks,
        if doc.has_code { ", contains code" } else { "" }
    );
    println!("{}  Added: {}", indent, format_timestamp(doc.timestamp));
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
