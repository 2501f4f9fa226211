use anyhow::Context;
use clap::{Parser, Subcommand};
use sentiment_core::config::Settings;
use sentiment_core::query::{router, QueryParams};
use sentiment_core::snapshot::build::{self, rss, FeedUrls};
use sentiment_core::snapshot::{FileSnapshotSource, SnapshotLoader};
use sentiment_core::FallbackClient;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sentiment_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Pretty-print the JSON response.
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch an API path from the live API, falling back to the static snapshot.
    Fetch {
        /// API path including any query string, e.g. `/api/feed?source=news`.
        path: String,

        /// Live API base URL. Overrides SENTIMENT_API_BASE.
        #[arg(long)]
        api_base: Option<String>,

        /// Dashboard page URL the snapshot is published next to. Overrides SENTIMENT_PAGE_URL.
        #[arg(long, conflicts_with = "snapshot_file")]
        page_url: Option<String>,

        /// Local snapshot file. Overrides SENTIMENT_SNAPSHOT_FILE.
        #[arg(long)]
        snapshot_file: Option<PathBuf>,
    },

    /// Answer an API path from a snapshot file without contacting the live API.
    Resolve {
        path: String,

        /// Local snapshot file. Defaults to SENTIMENT_SNAPSHOT_FILE.
        #[arg(long)]
        snapshot_file: Option<PathBuf>,
    },

    /// Build a snapshot file from the news and Reddit feeds, or from a JSON array of raw items.
    Generate {
        /// Where to write the snapshot.
        #[arg(long)]
        output: PathBuf,

        /// Raw items to score instead of fetching the feeds.
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long, default_value = rss::NEWS_RSS_URL, conflicts_with = "input")]
        news_url: String,

        #[arg(long, default_value = rss::REDDIT_RSS_URL, conflicts_with = "input")]
        reddit_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Fetch {
            path,
            api_base,
            page_url,
            snapshot_file,
        } => {
            if api_base.is_some() {
                settings.api_base = api_base;
            }
            if page_url.is_some() {
                settings.page_url = page_url;
                settings.snapshot_file = None;
            }
            if snapshot_file.is_some() {
                settings.snapshot_file = snapshot_file;
            }
            fetch(&settings, &path).await
        }
        Command::Resolve {
            path,
            snapshot_file,
        } => {
            if snapshot_file.is_some() {
                settings.snapshot_file = snapshot_file;
            }
            resolve(&settings, &path).await
        }
        Command::Generate {
            output,
            input,
            news_url,
            reddit_url,
        } => {
            let urls = FeedUrls {
                news: news_url,
                reddit: reddit_url,
            };
            generate(&settings, input.as_deref(), &urls, &output).await
        }
    };

    match result {
        Ok(body) => {
            let out = if args.pretty {
                serde_json::to_string_pretty(&body)?
            } else {
                serde_json::to_string(&body)?
            };
            println!("{out}");
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "request failed");
            Err(err)
        }
    }
}

async fn fetch(settings: &Settings, path: &str) -> anyhow::Result<Value> {
    let client = FallbackClient::from_settings(settings)?;
    let body = client.fetch_json(path).await?;
    if client.fallback_active() {
        tracing::info!(path, snapshot = %client.snapshot().location(), "served from static snapshot");
    }
    Ok(body)
}

async fn resolve(settings: &Settings, path: &str) -> anyhow::Result<Value> {
    let file = settings.require_snapshot_file()?;
    let loader = SnapshotLoader::new(FileSnapshotSource::new(file));
    let snapshot = loader.load().await?;
    router::resolve(&snapshot, path, &QueryParams::new())
        .with_context(|| format!("failed to resolve {path} against {}", file.display()))
}

async fn generate(
    settings: &Settings,
    input: Option<&Path>,
    urls: &FeedUrls,
    output: &Path,
) -> anyhow::Result<Value> {
    let export = build::generate(settings, input, urls, chrono::Utc::now()).await?;
    build::write_snapshot(output, &export).await?;
    tracing::info!(
        output = %output.display(),
        items = export.meta.item_count,
        "wrote snapshot"
    );
    Ok(json!({
        "output": output.display().to_string(),
        "source": export.meta.source,
        "itemCount": export.meta.item_count,
    }))
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn page_url_and_snapshot_file_conflict() {
        let res = Args::try_parse_from([
            "sentiment_cli",
            "fetch",
            "/api/feed",
            "--page-url",
            "https://example.com/",
            "--snapshot-file",
            "snapshot.json",
        ]);
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn resolve_reads_snapshot_file() {
        let dir = std::env::temp_dir().join(format!("sentiment-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("snapshot.json");
        std::fs::write(
            &file,
            r#"{"dashboard": {"sentiment": {"positive": 3, "negative": 1, "neutral": 2}}}"#,
        )
        .unwrap();

        let settings = Settings {
            snapshot_file: Some(file),
            ..Settings::default()
        };
        let body = resolve(&settings, "/api/sentiment").await.unwrap();
        assert_eq!(body[0], json!({"sentiment": "POSITIVE", "count": 3}));

        assert!(resolve(&settings, "/api/nope").await.is_err());
        assert!(resolve(&Settings::default(), "/api/sentiment").await.is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn feed_urls_conflict_with_input() {
        let res = Args::try_parse_from([
            "sentiment_cli",
            "generate",
            "--output",
            "out.json",
            "--input",
            "items.json",
            "--news-url",
            "https://example.com/rss",
        ]);
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn generate_scores_input_items_and_the_result_resolves() {
        let dir = std::env::temp_dir().join(format!("sentiment-cli-gen-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("items.json");
        std::fs::write(
            &input,
            json!([
                {"source": "news", "title": "Nvidia surge", "publishedAt": "2026-01-27T10:00:00Z",
                 "text": "Nvidia shares surge on record profit"},
                {"source": "reddit", "title": "Puts on $TSLA", "publishedAt": "2026-01-27T11:00:00Z",
                 "text": "Tesla looks weak, expecting a crash"}
            ])
            .to_string(),
        )
        .unwrap();
        let output = dir.join("out").join("snapshot.json");

        let summary = generate(&Settings::default(), Some(&input), &FeedUrls::default(), &output)
            .await
            .unwrap();
        assert_eq!(summary["source"], json!("input"));
        assert_eq!(summary["itemCount"], json!(2));

        let settings = Settings {
            snapshot_file: Some(output),
            ..Settings::default()
        };
        let feed = resolve(&settings, "/api/feed").await.unwrap();
        assert_eq!(feed["items"][0]["source"], json!("reddit"));
        let trending = resolve(&settings, "/api/trending-stocks").await.unwrap();
        assert_eq!(trending.as_array().map(Vec::len), Some(2));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
