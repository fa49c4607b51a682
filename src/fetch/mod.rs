//! Remote and local text acquisition
//!
//! The fetcher is the only retried path in the crate: transient failures
//! (connect/timeout errors and 5xx responses) are retried a bounded number of
//! times with a fixed delay, while client errors and non-text bodies fail
//! fast. Content extraction beyond plain text is out of scope; binary bodies
//! are rejected, not parsed.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Plain text pulled from a remote URL or local file
#[derive(Debug, Clone)]
pub struct FetchedText {
    pub text: String,
    pub content_type: String,
}

/// Outcome of a single fetch attempt
enum Attempt {
    /// Worth retrying: request error or 5xx response
    Transient(Error),
    /// Not worth retrying: 4xx, non-text body, bad input
    Fatal(Error),
}

/// HTTP text fetcher with bounded retries
pub struct Fetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retries: config.retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Fetch a URL as plain text.
    ///
    /// A timed-out or 5xx attempt is retried up to the configured limit;
    /// exhausted retries surface the last error.
    pub async fn fetch_text(&self, url: &str) -> Result<FetchedText> {
        let parsed =
            Url::parse(url).map_err(|e| Error::Input(format!("invalid url '{}': {}", url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Input(format!(
                "cannot fetch '{}': unsupported scheme '{}'",
                url,
                parsed.scheme()
            )));
        }

        let mut last_err: Option<Error> = None;

        for attempt in 1..=self.retries {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
                debug!("Retrying {} (attempt {}/{})", url, attempt, self.retries);
            }

            match self.try_fetch(url).await {
                Ok(fetched) => return Ok(fetched),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Transient(e)) => {
                    warn!("Fetch attempt {}/{} for {} failed: {}", attempt, self.retries, url, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Fetch(format!("fetch of '{}' failed without a cause", url))))
    }

    async fn try_fetch(&self, url: &str) -> std::result::Result<FetchedText, Attempt> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Attempt::Transient(Error::Fetch(format!("request to '{}' failed: {}", url, e))))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Attempt::Transient(Error::Fetch(format!(
                "HTTP {} from '{}'",
                status, url
            ))));
        }
        if !status.is_success() {
            return Err(Attempt::Fatal(Error::Fetch(format!(
                "HTTP {} from '{}'",
                status, url
            ))));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_string())
            .unwrap_or_else(|| "text/plain".to_string());

        if !is_textual_content_type(&content_type) {
            return Err(Attempt::Fatal(Error::Input(format!(
                "'{}' has non-text content type '{}'",
                url, content_type
            ))));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Attempt::Transient(Error::Fetch(format!("reading body of '{}' failed: {}", url, e))))?;

        Ok(FetchedText { text, content_type })
    }
}

/// Load a local file as plain text, guessing its content type from the path
pub fn read_file_text(path: &Path) -> Result<FetchedText> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::Input(format!("file '{}' is not UTF-8 text", path.display())))?;

    let content_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "text/plain".to_string());

    if !is_textual_content_type(&content_type) {
        return Err(Error::Input(format!(
            "file '{}' has non-text content type '{}'",
            path.display(),
            content_type
        )));
    }

    Ok(FetchedText { text, content_type })
}

/// Content types this tool ingests as-is
fn is_textual_content_type(content_type: &str) -> bool {
    let ct = content_type.to_lowercase();
    ct.starts_with("text/")
        || matches!(
            ct.as_str(),
            "application/json"
                | "application/xml"
                | "application/xhtml+xml"
                | "application/javascript"
                | "application/x-yaml"
                | "application/yaml"
                | "application/toml"
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> FetchConfig {
        FetchConfig {
            timeout_secs: 5,
            retries: 3,
            retry_delay_ms: 1,
            user_agent: "archivist-test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("Hello from the page.", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let fetched = fetcher
            .fetch_text(&format!("{}/page", server.uri()))
            .await
            .unwrap();

        assert_eq!(fetched.text, "Hello from the page.");
        assert_eq!(fetched.content_type, "text/html");
    }

    #[tokio::test]
    async fn test_fetch_text_missing_content_type_defaults_to_plain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("raw body"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let fetched = fetcher.fetch_text(&server.uri()).await.unwrap();

        assert_eq!(fetched.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_fetch_text_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/flaky"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("recovered")
                    .insert_header("content-type", "text/plain"),
            )
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let fetched = fetcher
            .fetch_text(&format!("{}/flaky", server.uri()))
            .await
            .unwrap();

        assert_eq!(fetched.text, "recovered");
    }

    #[tokio::test]
    async fn test_fetch_text_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch_text(&server.uri())
            .await
            .expect_err("persistent 500 should exhaust retries");

        match err {
            Error::Fetch(message) => assert!(message.contains("500")),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_fails_fast_on_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch_text(&server.uri())
            .await
            .expect_err("404 should not be retried");

        match err {
            Error::Fetch(message) => assert!(message.contains("404")),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_rejects_binary_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8, 159, 146, 150])
                    .insert_header("content-type", "image/png"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch_text(&server.uri())
            .await
            .expect_err("image body should be rejected");

        assert!(matches!(err, Error::Input(_)));
    }

    #[tokio::test]
    async fn test_fetch_text_rejects_non_http_scheme() {
        let fetcher = Fetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch_text("ftp://example.com/file.txt")
            .await
            .expect_err("ftp should be rejected");

        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn test_read_file_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("notes.md");
        std::fs::write(&file, "# Notes\n\nSome text.").unwrap();

        let fetched = read_file_text(&file).unwrap();
        assert_eq!(fetched.text, "# Notes\n\nSome text.");
        assert_eq!(fetched.content_type, "text/markdown");
    }

    #[test]
    fn test_read_file_text_rejects_invalid_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("blob.txt");
        std::fs::write(&file, [0xff, 0xfe, 0x00, 0x01]).unwrap();

        assert!(matches!(read_file_text(&file), Err(Error::Input(_))));
    }

    #[test]
    fn test_read_file_text_missing_file() {
        let result = read_file_text(Path::new("/nonexistent/definitely/missing.txt"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_is_textual_content_type() {
        assert!(is_textual_content_type("text/html"));
        assert!(is_textual_content_type("text/plain"));
        assert!(is_textual_content_type("application/json"));
        assert!(is_textual_content_type("Application/JSON"));
        assert!(!is_textual_content_type("image/png"));
        assert!(!is_textual_content_type("application/pdf"));
        assert!(!is_textual_content_type("application/octet-stream"));
    }
}
