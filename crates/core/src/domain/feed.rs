use crate::domain::lenient;
use crate::domain::ticker::sanitize_ticker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One enriched news/social item.
///
/// Fields are decoded one by one: a `null` or mistyped field becomes its
/// default and the item is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedItem {
    #[serde(deserialize_with = "lenient::or_default")]
    pub id: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub source: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub url: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub published_at: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub text: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub summary: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub sentiment: Sentiment,

    /// `None` when the export omitted the field; such items never match a ticker filter.
    #[serde(
        deserialize_with = "lenient::opt_vec_skip_invalid",
        skip_serializing_if = "Option::is_none"
    )]
    pub tickers: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient::vec_skip_invalid")]
    pub themes: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentiment {
    /// `positive`, `negative` or `neutral`.
    #[serde(deserialize_with = "lenient::or_default")]
    pub label: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub score: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub confidence: f64,
}

impl FeedItem {
    /// Publish time in UTC. Accepts RFC 3339 and RFC 2822 (RSS) timestamps.
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.published_at)
    }

    /// `symbol` must already be sanitized.
    pub fn mentions_ticker(&self, symbol: &str) -> bool {
        self.tickers
            .as_deref()
            .is_some_and(|tickers| tickers.iter().any(|t| sanitize_ticker(t) == symbol))
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Sorts newest first. Stable, so equal timestamps keep their export order;
/// items without a parseable timestamp go last.
pub fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by_cached_key(|item| std::cmp::Reverse(item.published_at_utc()));
}
