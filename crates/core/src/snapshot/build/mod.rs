//! Snapshot generation: collect raw items, score them and write the export
//! that the router later serves.

pub mod aggregate;
pub mod enrich;
pub mod rss;

use crate::config::Settings;
use crate::domain::dashboard::Dashboard;
use crate::domain::feed::FeedItem;
use crate::domain::snapshot::SnapshotMeta;
use crate::domain::ticker::TickerRow;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

pub use enrich::{EnrichedItem, RawFeedItem};

pub const MAX_ITEMS: usize = 120;
const FEED_PREVIEW_LEN: usize = 15;
const TRENDING_LEN: usize = 12;
const TICKER_INDEX_LEN: usize = 250;
const THEMES_LEN: usize = 10;
const NARRATIVES_LEN: usize = 8;

/// Where the generator got its items; recorded as `meta.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrigin {
    Rss,
    Input,
    Fallback,
}

impl ItemOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemOrigin::Rss => "rss",
            ItemOrigin::Input => "input",
            ItemOrigin::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedUrls {
    pub news: String,
    pub reddit: String,
}

impl Default for FeedUrls {
    fn default() -> Self {
        Self {
            news: rss::NEWS_RSS_URL.to_string(),
            reddit: rss::REDDIT_RSS_URL.to_string(),
        }
    }
}

/// The exported snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotExport {
    pub generated_at: String,
    pub dashboard: Dashboard,
    pub feed: Vec<FeedItem>,
    pub ticker_index: Vec<TickerRow>,
    pub meta: SnapshotMeta,
}

/// Scores `raw_items`, keeps the newest 120 and aggregates them.
pub fn build_snapshot(
    raw_items: Vec<RawFeedItem>,
    generated_at: DateTime<Utc>,
    origin: ItemOrigin,
) -> Result<SnapshotExport> {
    let mut items: Vec<EnrichedItem> = raw_items.into_iter().map(EnrichedItem::from_raw).collect();
    items.sort_by(|a, b| b.raw.published_at.cmp(&a.raw.published_at));
    items.truncate(MAX_ITEMS);

    let generated_at = generated_at.to_rfc3339_opts(SecondsFormat::AutoSi, false);
    let feed: Vec<FeedItem> = items.iter().map(EnrichedItem::to_feed_item).collect();

    let mut extra = Map::new();
    extra.insert("cached".to_string(), Value::Bool(true));
    extra.insert(
        "feedPreview".to_string(),
        serde_json::to_value(&feed[..feed.len().min(FEED_PREVIEW_LEN)])
            .context("failed to encode feed preview")?,
    );

    let dashboard = Dashboard {
        generated_at: Some(generated_at.clone()),
        overview: aggregate::overview(&items),
        sentiment: aggregate::sentiment_breakdown(&items),
        sources: aggregate::source_breakdown(&items),
        timeline: aggregate::timeline(&items),
        trending: aggregate::ticker_insights(&items, TRENDING_LEN),
        themes: aggregate::theme_insights(&items, THEMES_LEN),
        narratives: aggregate::narratives(&items, NARRATIVES_LEN),
        extra,
    };

    Ok(SnapshotExport {
        generated_at,
        dashboard,
        ticker_index: aggregate::ticker_insights(&items, TICKER_INDEX_LEN),
        meta: SnapshotMeta {
            source: origin.as_str().to_string(),
            item_count: feed.len() as u64,
        },
        feed,
    })
}

/// Fetches both feeds. When neither yields an item the built-in items are
/// used instead.
pub async fn collect_feed_items(
    http: &reqwest::Client,
    urls: &FeedUrls,
    now: DateTime<Utc>,
) -> (Vec<RawFeedItem>, ItemOrigin) {
    let (news_xml, reddit_xml) = tokio::join!(
        rss::fetch_feed_xml(http, &urls.news),
        rss::fetch_feed_xml(http, &urls.reddit)
    );

    let mut items = rss::parse_feed(&news_xml, "news", now);
    items.extend(rss::parse_feed(&reddit_xml, "reddit", now));
    if items.is_empty() {
        tracing::warn!("feeds produced no items; using built-in items");
        return (rss::fallback_items(now), ItemOrigin::Fallback);
    }
    (items, ItemOrigin::Rss)
}

/// Reads a JSON array of raw items. Items without an id get one derived from
/// their title and url.
pub async fn read_input_items(path: &Path) -> Result<Vec<RawFeedItem>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read input items: {}", path.display()))?;
    let mut items: Vec<RawFeedItem> = serde_json::from_slice(&bytes)
        .with_context(|| format!("input items are not a valid item array: {}", path.display()))?;
    for item in &mut items {
        if item.id.is_empty() {
            let key = format!("{}{}", item.title, item.url);
            item.id = format!("{}-{}", item.source, enrich::stable_hash(&key));
        }
    }
    Ok(items)
}

/// Builds a snapshot from `input` when given, otherwise from the feeds.
pub async fn generate(
    settings: &Settings,
    input: Option<&Path>,
    urls: &FeedUrls,
    now: DateTime<Utc>,
) -> Result<SnapshotExport> {
    let (items, origin) = match input {
        Some(path) => (read_input_items(path).await?, ItemOrigin::Input),
        None => collect_feed_items(&settings.http_client()?, urls, now).await,
    };
    tracing::info!(items = items.len(), origin = origin.as_str(), "collected raw items");
    build_snapshot(items, now, origin)
}

/// Writes pretty JSON with a trailing newline, creating parent directories.
pub async fn write_snapshot(path: &Path, export: &SnapshotExport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut body = serde_json::to_string_pretty(export).context("failed to encode snapshot")?;
    body.push('\n');
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write snapshot: {}", path.display()))
}
