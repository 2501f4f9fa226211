//! Live API client with a static-snapshot fallback.
//!
//! `fetch_json` first asks the live API. When that fails and the path is an
//! API path, the same request is answered from the snapshot via the query
//! router. If the fallback cannot answer either, the caller gets the original
//! live error: a missing snapshot or an unknown route never masks the real
//! cause.

use crate::config::Settings;
use crate::error::{FallbackError, LiveFailureKind, LiveRequestFailed, RouteError};
use crate::query::{router, QueryParams};
use crate::snapshot::{self, SnapshotLoader};
use anyhow::Context;
use reqwest::header::{HeaderValue, ACCEPT};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

/// Only paths under this prefix are eligible for the snapshot fallback.
pub const API_PREFIX: &str = "/api/";

#[async_trait::async_trait]
pub trait LiveApi: Send + Sync {
    fn base_url(&self) -> &str;

    async fn get_json(&self, path: &str) -> Result<Value, LiveRequestFailed>;
}

/// Trims the configured base, drops trailing slashes and assumes `http://`
/// when no scheme is given. An empty base means same-origin relative paths.
pub fn normalize_api_base(value: &str) -> String {
    let cleaned = value.trim().trim_end_matches('/');
    if cleaned.is_empty() {
        return String::new();
    }
    let lower = cleaned.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        cleaned.to_string()
    } else {
        format!("http://{cleaned}")
    }
}

#[derive(Debug, Clone)]
pub struct HttpLiveApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLiveApi {
    /// `base_url` must be absolute once normalized; see [`HttpLiveApi::from_settings`]
    /// for the page-origin default.
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: normalize_api_base(base_url),
        }
    }

    /// Uses `SENTIMENT_API_BASE` when set, otherwise the origin of the
    /// dashboard page, so API paths resolve the way same-origin requests do.
    pub fn from_settings(http: reqwest::Client, settings: &Settings) -> anyhow::Result<Self> {
        let base = normalize_api_base(settings.api_base.as_deref().unwrap_or_default());
        if !base.is_empty() {
            return Ok(Self { http, base_url: base });
        }

        let page_url = settings
            .page_url
            .as_deref()
            .context("SENTIMENT_API_BASE or SENTIMENT_PAGE_URL is required to reach the live API")?;
        let page = Url::parse(page_url).with_context(|| format!("invalid page URL: {page_url}"))?;
        let origin = page.origin();
        if !origin.is_tuple() {
            anyhow::bail!("page URL {page_url} has no origin to send API requests to");
        }
        Ok(Self {
            http,
            base_url: origin.ascii_serialization(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl LiveApi for HttpLiveApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str) -> Result<Value, LiveRequestFailed> {
        let url = self.url(path);
        let failed = |kind: LiveFailureKind, detail: String| LiveRequestFailed {
            url: url.clone(),
            kind,
            detail,
        };

        let res = self
            .http
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| failed(LiveFailureKind::Transport, e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(failed(
                LiveFailureKind::Status(status),
                format!("request failed ({status})"),
            ));
        }

        let text = res
            .text()
            .await
            .map_err(|e| failed(LiveFailureKind::Transport, e.to_string()))?;
        serde_json::from_str::<Value>(&text)
            .map_err(|e| failed(LiveFailureKind::Decode, format!("response is not valid JSON: {e}")))
    }
}

/// One dashboard session: a live API plus the lazily loaded snapshot it falls
/// back to. Dropping the client drops the cached snapshot.
pub struct FallbackClient {
    live: Box<dyn LiveApi>,
    snapshot: SnapshotLoader,
    fallback_notified: AtomicBool,
}

impl FallbackClient {
    pub fn new(live: impl LiveApi + 'static, snapshot: SnapshotLoader) -> Self {
        Self {
            live: Box::new(live),
            snapshot,
            fallback_notified: AtomicBool::new(false),
        }
    }

    /// Builds the HTTP-backed client. A configured snapshot file wins over
    /// the page-relative snapshot URL.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = settings.http_client()?;
        let live = HttpLiveApi::from_settings(http.clone(), settings)?;
        let source = snapshot::source_from_settings(settings, http)?;
        Ok(Self::new(live, SnapshotLoader::from_boxed(source)))
    }

    pub async fn fetch_json(&self, path: &str) -> Result<Value, LiveRequestFailed> {
        let live_err = match self.live.get_json(path).await {
            Ok(body) => return Ok(body),
            Err(err) => err,
        };

        match self.try_fallback(path).await {
            Ok(body) => {
                self.notify_fallback(&live_err);
                Ok(body)
            }
            Err(fallback_err) => {
                tracing::debug!(
                    path,
                    live_error = %live_err,
                    fallback_error = %fallback_err,
                    "snapshot fallback unavailable; surfacing live error"
                );
                Err(live_err)
            }
        }
    }

    /// Answers `path` from the snapshot alone.
    pub async fn try_fallback(&self, path: &str) -> Result<Value, FallbackError> {
        if !path.starts_with(API_PREFIX) {
            return Err(FallbackError::NotApiPath(path.to_string()));
        }
        if !router::is_known_route(path) {
            return Err(RouteError::NoRouteMatch(path.to_string()).into());
        }
        let snapshot = self.snapshot.load().await?;
        Ok(router::resolve(&snapshot, path, &QueryParams::new())?)
    }

    /// True once any request has been served from the snapshot.
    pub fn fallback_active(&self) -> bool {
        self.fallback_notified.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> &SnapshotLoader {
        &self.snapshot
    }

    fn notify_fallback(&self, live_err: &LiveRequestFailed) {
        if !self.fallback_notified.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                api_base = %self.live.base_url(),
                snapshot = %self.snapshot.location(),
                error = %live_err,
                "live API unreachable; using static snapshot data"
            );
        }
    }
}
