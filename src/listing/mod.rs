//! Document inventory
//!
//! Collapses per-chunk records into one summary per document (via the
//! canonical chunk), then sorts, paginates, and optionally groups by domain.

use crate::error::{Error, Result};
use crate::store::{canonical_filter, ChunkPayload, QdrantStore};
use clap::ValueEnum;
use serde::Serialize;
use tracing::debug;

/// Sort key for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Timestamp,
    Title,
    Domain,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    /// 1-based page number; out-of-range values clamp
    pub page: usize,

    /// Documents per page, must be at least 1
    pub page_size: usize,

    pub sort_by: SortBy,
    pub sort_order: SortOrder,

    /// Organize the returned page into per-domain groups
    pub group_by_domain: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort_by: SortBy::Timestamp,
            sort_order: SortOrder::Desc,
            group_by_domain: false,
        }
    }
}

impl ListOptions {
    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Validation(
                "page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One document, summarized from its canonical chunk
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub timestamp: i64,
    pub content_type: String,
    pub word_count: usize,
    pub has_code: bool,
    pub total_chunks: usize,
}

impl From<ChunkPayload> for DocumentSummary {
    fn from(payload: ChunkPayload) -> Self {
        Self {
            url: payload.url,
            title: payload.title,
            domain: payload.domain,
            timestamp: payload.timestamp,
            content_type: payload.content_type,
            word_count: payload.word_count,
            has_code: payload.has_code,
            total_chunks: payload.total_chunks,
        }
    }
}

/// Documents on one page sharing a domain, in page order
#[derive(Debug, Clone, Serialize)]
pub struct DomainGroup {
    pub domain: String,
    pub documents: Vec<DocumentSummary>,
}

/// One page of the document inventory
#[derive(Debug, Clone, Serialize)]
pub struct DocumentListing {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub documents: Vec<DocumentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<DomainGroup>>,
}

/// List stored documents, one summary per document.
///
/// Sorting happens over the full set before the page is cut, so page
/// boundaries stay consistent across requests with the same sort.
pub async fn list_documents(
    store: &QdrantStore,
    options: &ListOptions,
) -> Result<DocumentListing> {
    options.validate()?;

    if !store.collection_exists().await? {
        debug!("Collection '{}' does not exist; listing is empty", store.collection());
        return Ok(empty_listing(options));
    }

    let mut documents: Vec<DocumentSummary> = store
        .scroll_payloads(Some(canonical_filter()))
        .await?
        .into_iter()
        .map(|(_, payload)| DocumentSummary::from(payload))
        .collect();

    sort_summaries(&mut documents, options.sort_by, options.sort_order);

    let total = documents.len();
    let (page, total_pages, offset) = paginate(total, options.page, options.page_size);

    let page_documents: Vec<DocumentSummary> = documents
        .into_iter()
        .skip(offset)
        .take(options.page_size)
        .collect();

    let groups = options
        .group_by_domain
        .then(|| group_by_domain(&page_documents));

    Ok(DocumentListing {
        total,
        page,
        page_size: options.page_size,
        total_pages,
        documents: page_documents,
        groups,
    })
}

fn empty_listing(options: &ListOptions) -> DocumentListing {
    DocumentListing {
        total: 0,
        page: 1,
        page_size: options.page_size,
        total_pages: 0,
        documents: Vec::new(),
        groups: options.group_by_domain.then(Vec::new),
    }
}

/// Resolve pagination: clamp the requested page into range and return
/// (page, total_pages, offset). `page_size` must be nonzero.
fn paginate(total: usize, requested_page: usize, page_size: usize) -> (usize, usize, usize) {
    let total_pages = total.div_ceil(page_size);
    let page = requested_page.clamp(1, total_pages.max(1));
    let offset = (page - 1) * page_size;
    (page, total_pages, offset)
}

/// Stable sort, so records that compare equal keep their scroll order
fn sort_summaries(items: &mut [DocumentSummary], sort_by: SortBy, order: SortOrder) {
    items.sort_by(|a, b| {
        let ord = match sort_by {
            SortBy::Timestamp => a.timestamp.cmp(&b.timestamp),
            SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortBy::Domain => a.domain.cmp(&b.domain),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Group a page of documents by domain, domains in first-seen order
fn group_by_domain(documents: &[DocumentSummary]) -> Vec<DomainGroup> {
    let mut groups: Vec<DomainGroup> = Vec::new();
    for doc in documents {
        match groups.iter_mut().find(|group| group.domain == doc.domain) {
            Some(group) => group.documents.push(doc.clone()),
            None => groups.push(DomainGroup {
                domain: doc.domain.clone(),
                documents: vec![doc.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(url: &str, title: &str, domain: &str, timestamp: i64) -> DocumentSummary {
        DocumentSummary {
            url: url.to_string(),
            title: title.to_string(),
            domain: domain.to_string(),
            timestamp,
            content_type: "text/plain".to_string(),
            word_count: 100,
            has_code: false,
            total_chunks: 1,
        }
    }

    #[test]
    fn test_paginate_basic() {
        // 45 documents at 20 per page
        assert_eq!(paginate(45, 1, 20), (1, 3, 0));
        assert_eq!(paginate(45, 2, 20), (2, 3, 20));
        assert_eq!(paginate(45, 3, 20), (3, 3, 40));
    }

    #[test]
    fn test_paginate_clamps_out_of_range() {
        assert_eq!(paginate(45, 5, 20), (3, 3, 40));
        assert_eq!(paginate(45, 0, 20), (1, 3, 0));
    }

    #[test]
    fn test_paginate_empty() {
        assert_eq!(paginate(0, 1, 20), (1, 0, 0));
        assert_eq!(paginate(0, 7, 20), (1, 0, 0));
    }

    #[test]
    fn test_paginate_exact_multiple() {
        assert_eq!(paginate(40, 2, 20), (2, 2, 20));
        assert_eq!(paginate(40, 3, 20), (2, 2, 20));
    }

    #[test]
    fn test_page_size_zero_rejected() {
        let options = ListOptions {
            page_size: 0,
            ..ListOptions::default()
        };
        let err = options.validate().expect_err("page_size 0 should fail");
        match err {
            Error::Validation(message) => assert!(message.contains("page_size")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_sort_by_timestamp_desc() {
        let mut items = vec![
            summary("a", "A", "x.com", 100),
            summary("b", "B", "x.com", 300),
            summary("c", "C", "x.com", 200),
        ];
        sort_summaries(&mut items, SortBy::Timestamp, SortOrder::Desc);
        let urls: Vec<&str> = items.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_by_title_case_insensitive() {
        let mut items = vec![
            summary("a", "banana", "x.com", 1),
            summary("b", "Apple", "x.com", 2),
            summary("c", "cherry", "x.com", 3),
        ];
        sort_summaries(&mut items, SortBy::Title, SortOrder::Asc);
        let titles: Vec<&str> = items.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Apple", "banana", "cherry"]);
    }

    #[test]
    fn test_sort_ties_keep_input_order() {
        let mut items = vec![
            summary("first", "Same", "x.com", 50),
            summary("second", "Same", "x.com", 50),
            summary("third", "Same", "x.com", 50),
        ];
        sort_summaries(&mut items, SortBy::Timestamp, SortOrder::Desc);
        let urls: Vec<&str> = items.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, ["first", "second", "third"]);
    }

    #[test]
    fn test_sort_by_domain_asc() {
        let mut items = vec![
            summary("a", "A", "zeta.org", 1),
            summary("b", "B", "alpha.com", 2),
            summary("c", "C", "mid.net", 3),
        ];
        sort_summaries(&mut items, SortBy::Domain, SortOrder::Asc);
        let domains: Vec<&str> = items.iter().map(|s| s.domain.as_str()).collect();
        assert_eq!(domains, ["alpha.com", "mid.net", "zeta.org"]);
    }

    #[test]
    fn test_group_by_domain_first_seen_order() {
        let items = vec![
            summary("a", "A", "beta.com", 4),
            summary("b", "B", "alpha.com", 3),
            summary("c", "C", "beta.com", 2),
            summary("d", "D", "gamma.com", 1),
        ];
        let groups = group_by_domain(&items);

        let domains: Vec<&str> = groups.iter().map(|g| g.domain.as_str()).collect();
        assert_eq!(domains, ["beta.com", "alpha.com", "gamma.com"]);

        assert_eq!(groups[0].documents.len(), 2);
        assert_eq!(groups[0].documents[0].url, "a");
        assert_eq!(groups[0].documents[1].url, "c");
        assert_eq!(groups[1].documents.len(), 1);
        assert_eq!(groups[2].documents.len(), 1);
    }

    #[test]
    fn test_summary_from_payload() {
        let payload = crate::store::sample_payload();
        let summary = DocumentSummary::from(payload.clone());
        assert_eq!(summary.url, payload.url);
        assert_eq!(summary.title, payload.title);
        assert_eq!(summary.total_chunks, payload.total_chunks);
    }
}
