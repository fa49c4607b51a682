//! Filtered semantic search
//!
//! Validates search options, pushes metadata filters down to Qdrant as a
//! pre-filter, over-fetches to leave headroom for payload validation, and
//! maps raw cosine scores onto the [0, 1] range callers see.

use crate::error::{Error, Result};
use crate::store::{timestamp_range_condition, ChunkPayload, QdrantStore};
use chrono::{DateTime, NaiveDate};
use qdrant_client::qdrant::{Condition, Filter};
use serde::Serialize;
use tracing::debug;

pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 20;

/// Search options; filters AND-combine
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of results to return, in [1, 20]
    pub limit: usize,

    /// Minimum normalized similarity in [0, 1]
    pub score_threshold: f32,

    /// Exact-match domain filter
    pub domain: Option<String>,

    /// Exact-match code-presence filter
    pub has_code: Option<bool>,

    /// Inclusive lower timestamp bound, ISO-8601
    pub after: Option<String>,

    /// Inclusive upper timestamp bound, ISO-8601
    pub before: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            score_threshold: 0.7,
            domain: None,
            has_code: None,
            after: None,
            before: None,
        }
    }
}

/// A search hit with its normalized score
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Validated, store-ready form of the options
#[derive(Debug)]
struct SearchPlan {
    limit: usize,
    fetch_limit: usize,
    raw_threshold: f32,
    filter: Option<Filter>,
}

impl SearchOptions {
    fn resolve(&self) -> Result<SearchPlan> {
        if self.limit < MIN_LIMIT || self.limit > MAX_LIMIT {
            return Err(Error::Validation(format!(
                "limit must be between {} and {} (got {})",
                MIN_LIMIT, MAX_LIMIT, self.limit
            )));
        }

        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(Error::Validation(format!(
                "score_threshold must be between 0.0 and 1.0 (got {})",
                self.score_threshold
            )));
        }

        let after = self
            .after
            .as_deref()
            .map(|v| parse_timestamp("after", v))
            .transpose()?;
        let before = self
            .before
            .as_deref()
            .map(|v| parse_timestamp("before", v))
            .transpose()?;

        let mut must: Vec<Condition> = Vec::new();

        if let Some(ref domain) = self.domain {
            must.push(Condition::matches("domain", domain.to_lowercase()));
        }
        if let Some(has_code) = self.has_code {
            must.push(Condition::matches("has_code", has_code));
        }
        if after.is_some() || before.is_some() {
            must.push(timestamp_range_condition(after, before));
        }

        let filter = if must.is_empty() {
            None
        } else {
            Some(Filter {
                must,
                should: vec![],
                must_not: vec![],
                min_should: None,
            })
        };

        Ok(SearchPlan {
            limit: self.limit,
            fetch_limit: overfetch_limit(self.limit),
            raw_threshold: raw_threshold(self.score_threshold),
            filter,
        })
    }
}

/// Execute a filtered nearest-neighbor query.
///
/// Results come back in store rank order; anything beyond `limit` after
/// validation is dropped. An empty result set is a valid outcome, not an
/// error.
pub async fn search(
    store: &QdrantStore,
    query_vector: Vec<f32>,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let plan = options.resolve()?;

    debug!(
        "Searching with limit {} (fetching {}), threshold {:.3}",
        plan.limit, plan.fetch_limit, options.score_threshold
    );

    let hits = store
        .search(
            query_vector,
            plan.fetch_limit,
            Some(plan.raw_threshold),
            plan.filter,
        )
        .await?;

    let mut results: Vec<SearchResult> = hits
        .into_iter()
        .map(|hit| SearchResult {
            id: hit.id,
            score: normalize_score(hit.score),
            payload: hit.payload,
        })
        .collect();
    results.truncate(plan.limit);

    Ok(results)
}

/// Map a raw cosine similarity from [-1, 1] onto [0, 1]
pub fn normalize_score(raw: f32) -> f32 {
    ((raw + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Inverse of `normalize_score`: the store-native threshold to request
pub fn raw_threshold(normalized: f32) -> f32 {
    normalized * 2.0 - 1.0
}

/// Candidates to request from the store: ceil(limit * 1.5), leaving headroom
/// for post-fetch validation
pub fn overfetch_limit(limit: usize) -> usize {
    (limit * 3).div_ceil(2)
}

/// Parse an ISO-8601 timestamp to epoch seconds. Full RFC 3339 instants and
/// bare dates are accepted; bare dates resolve to midnight UTC.
pub fn parse_timestamp(field: &str, value: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc().timestamp());
        }
    }

    Err(Error::Validation(format!(
        "{} must be an ISO-8601 date or datetime (got '{}')",
        field, value
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        let mut options = SearchOptions::default();

        options.limit = 0;
        let err = options.resolve().expect_err("limit 0 should fail");
        match err {
            Error::Validation(message) => assert!(message.contains("limit")),
            other => panic!("expected validation error, got {other:?}"),
        }

        options.limit = 21;
        assert!(options.resolve().is_err());

        options.limit = 1;
        assert!(options.resolve().is_ok());

        options.limit = 20;
        assert!(options.resolve().is_ok());
    }

    #[test]
    fn test_threshold_bounds() {
        let mut options = SearchOptions::default();

        options.score_threshold = -0.1;
        let err = options.resolve().expect_err("negative threshold should fail");
        match err {
            Error::Validation(message) => assert!(message.contains("score_threshold")),
            other => panic!("expected validation error, got {other:?}"),
        }

        options.score_threshold = 1.1;
        assert!(options.resolve().is_err());

        options.score_threshold = 0.0;
        assert!(options.resolve().is_ok());

        options.score_threshold = 1.0;
        assert!(options.resolve().is_ok());
    }

    #[test]
    fn test_date_filters_must_parse() {
        let options = SearchOptions {
            after: Some("last tuesday".to_string()),
            ..SearchOptions::default()
        };

        let err = options.resolve().expect_err("garbage date should fail");
        match err {
            Error::Validation(message) => {
                assert!(message.contains("after"));
                assert!(message.contains("last tuesday"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_score_endpoints() {
        assert!((normalize_score(-1.0) - 0.0).abs() < f32::EPSILON);
        assert!((normalize_score(0.0) - 0.5).abs() < f32::EPSILON);
        assert!((normalize_score(1.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_normalize_score_monotonic() {
        let mut previous = normalize_score(-1.0);
        let mut raw = -1.0f32;
        while raw < 1.0 {
            raw += 0.05;
            let current = normalize_score(raw);
            assert!(current >= previous, "score map must not decrease");
            previous = current;
        }
    }

    #[test]
    fn test_raw_threshold_inverts_normalization() {
        for normalized in [0.0f32, 0.25, 0.5, 0.7, 0.9, 1.0] {
            let raw = raw_threshold(normalized);
            assert!((normalize_score(raw) - normalized).abs() < 1e-6);
        }
        assert!((raw_threshold(0.7) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_overfetch_limit() {
        assert_eq!(overfetch_limit(1), 2);
        assert_eq!(overfetch_limit(4), 6);
        assert_eq!(overfetch_limit(5), 8);
        assert_eq!(overfetch_limit(20), 30);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("after", "2024-01-15T12:30:00Z").unwrap(),
            1_705_321_800
        );
        // Bare dates resolve to midnight UTC
        assert_eq!(
            parse_timestamp("after", "2024-01-15").unwrap(),
            1_705_276_800
        );
        // Offsets are honored
        assert_eq!(
            parse_timestamp("before", "2024-01-15T12:30:00+02:00").unwrap(),
            1_705_314_600
        );

        assert!(parse_timestamp("before", "15/01/2024").is_err());
        assert!(parse_timestamp("before", "").is_err());
    }

    #[test]
    fn test_resolve_builds_combined_filter() {
        let options = SearchOptions {
            domain: Some("Example.COM".to_string()),
            has_code: Some(true),
            after: Some("2024-01-01".to_string()),
            before: Some("2024-06-30".to_string()),
            ..SearchOptions::default()
        };

        let plan = options.resolve().unwrap();
        let filter = plan.filter.expect("filters should produce a qdrant filter");
        // domain + has_code + one range condition, AND-combined
        assert_eq!(filter.must.len(), 3);
        assert!(filter.should.is_empty());
        assert!(filter.must_not.is_empty());
    }

    #[test]
    fn test_resolve_without_filters_pushes_none() {
        let plan = SearchOptions::default().resolve().unwrap();
        assert!(plan.filter.is_none());
        assert_eq!(plan.limit, 5);
        assert_eq!(plan.fetch_limit, 8);
        assert!((plan.raw_threshold - 0.4).abs() < 1e-6);
    }
}
