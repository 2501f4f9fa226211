pub mod client;
pub mod domain;
pub mod error;
pub mod query;
pub mod snapshot;

pub use client::{FallbackClient, HttpLiveApi, LiveApi};
pub use domain::snapshot::Snapshot;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_base: Option<String>,
        pub page_url: Option<String>,
        pub snapshot_file: Option<PathBuf>,
        pub http_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let http_timeout_secs = match non_empty_var("SENTIMENT_HTTP_TIMEOUT_SECS") {
                Some(s) => s
                    .parse::<u64>()
                    .with_context(|| format!("SENTIMENT_HTTP_TIMEOUT_SECS is not a number: {s}"))?,
                None => DEFAULT_HTTP_TIMEOUT_SECS,
            };

            Ok(Self {
                api_base: non_empty_var("SENTIMENT_API_BASE"),
                page_url: non_empty_var("SENTIMENT_PAGE_URL"),
                snapshot_file: non_empty_var("SENTIMENT_SNAPSHOT_FILE").map(PathBuf::from),
                http_timeout_secs,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        /// Shared HTTP client honouring `SENTIMENT_HTTP_TIMEOUT_SECS`.
        pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
            reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(self.http_timeout_secs))
                .build()
                .context("failed to build reqwest client")
        }

        pub fn require_page_url(&self) -> anyhow::Result<&str> {
            self.page_url
                .as_deref()
                .context("SENTIMENT_PAGE_URL is required when no snapshot file is configured")
        }

        pub fn require_snapshot_file(&self) -> anyhow::Result<&std::path::Path> {
            self.snapshot_file
                .as_deref()
                .context("SENTIMENT_SNAPSHOT_FILE is required")
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                api_base: None,
                page_url: None,
                snapshot_file: None,
                http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
                sentry_dsn: None,
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
