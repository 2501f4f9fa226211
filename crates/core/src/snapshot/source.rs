use crate::error::SnapshotUnavailable;
use crate::snapshot::location::snapshot_url;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use std::path::PathBuf;
use url::Url;

/// Where the raw snapshot document comes from.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    fn location(&self) -> String;

    async fn fetch(&self) -> Result<Value, SnapshotUnavailable>;
}

/// Fetches the snapshot over HTTP, bypassing intermediary caches.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    http: reqwest::Client,
    url: Url,
}

impl HttpSnapshotSource {
    pub fn new(http: reqwest::Client, url: Url) -> Self {
        Self { http, url }
    }

    /// Snapshot published next to the dashboard page at `page_url`.
    pub fn for_page(http: reqwest::Client, page_url: &str) -> anyhow::Result<Self> {
        let page =
            Url::parse(page_url).with_context(|| format!("invalid page URL: {page_url}"))?;
        Ok(Self::new(http, snapshot_url(&page)))
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers
    }

    fn unavailable(&self, reason: impl Into<String>) -> SnapshotUnavailable {
        SnapshotUnavailable {
            location: self.url.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpSnapshotSource {
    fn location(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<Value, SnapshotUnavailable> {
        let res = self
            .http
            .get(self.url.clone())
            .headers(Self::headers())
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("snapshot not found (HTTP {status})")));
        }

        let text = res
            .text()
            .await
            .map_err(|e| self.unavailable(format!("failed to read body: {e}")))?;
        serde_json::from_str::<Value>(&text)
            .map_err(|e| self.unavailable(format!("snapshot is not valid JSON: {e}")))
    }
}

/// Reads the snapshot from a local file, e.g. the exporter's output.
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SnapshotSource for FileSnapshotSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Value, SnapshotUnavailable> {
        let unavailable = |reason: String| SnapshotUnavailable {
            location: self.location(),
            reason,
        };
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| unavailable(format!("failed to read file: {e}")))?;
        serde_json::from_slice::<Value>(&bytes)
            .map_err(|e| unavailable(format!("snapshot is not valid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn http_source_fetches_page_relative_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pulse/data/snapshot.json"))
            .and(header("pragma", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"feed": []})))
            .expect(1)
            .mount(&server)
            .await;

        let page = format!("{}/pulse/index.html", server.uri());
        let source = HttpSnapshotSource::for_page(reqwest::Client::new(), &page).unwrap();
        assert_eq!(source.location(), format!("{}/pulse/data/snapshot.json", server.uri()));
        assert_eq!(source.fetch().await.unwrap(), json!({"feed": []}));
    }

    #[tokio::test]
    async fn http_source_reports_missing_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpSnapshotSource::for_page(reqwest::Client::new(), &server.uri()).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(err.reason.contains("404"), "{err}");
    }

    #[tokio::test]
    async fn http_source_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let source = HttpSnapshotSource::for_page(reqwest::Client::new(), &server.uri()).unwrap();
        assert!(source.fetch().await.is_err());
    }

    #[tokio::test]
    async fn file_source_reads_and_reports_missing_files() {
        let dir = std::env::temp_dir().join(format!("sentiment-core-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("snapshot.json");
        std::fs::write(&file, r#"{"generatedAt": "2026-01-27T10:00:00Z"}"#).unwrap();

        let value = FileSnapshotSource::new(&file).fetch().await.unwrap();
        assert_eq!(value["generatedAt"], json!("2026-01-27T10:00:00Z"));

        let missing = FileSnapshotSource::new(dir.join("missing.json"));
        let err = missing.fetch().await.unwrap_err();
        assert!(err.location.ends_with("missing.json"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
