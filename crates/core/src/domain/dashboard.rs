use crate::domain::lenient;
use crate::domain::ticker::TickerRow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Aggregated dashboard payload, identical in shape to `GET /api/dashboard`.
///
/// Every section decodes leniently: a malformed section becomes its default
/// rather than rejecting the snapshot. Keys this type does not model (for
/// example `feedPreview` or `cached`) are kept in `extra` and written back out
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dashboard {
    #[serde(
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub generated_at: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub overview: Overview,
    #[serde(deserialize_with = "lenient::or_default")]
    pub sentiment: SentimentBreakdown,
    #[serde(deserialize_with = "lenient::count_map")]
    pub sources: BTreeMap<String, u64>,
    #[serde(deserialize_with = "lenient::vec_skip_invalid")]
    pub timeline: Vec<TimelinePoint>,
    #[serde(deserialize_with = "lenient::vec_skip_invalid")]
    pub trending: Vec<TickerRow>,
    #[serde(deserialize_with = "lenient::vec_skip_invalid")]
    pub themes: Vec<ThemeInsight>,
    #[serde(deserialize_with = "lenient::vec_skip_invalid")]
    pub narratives: Vec<Narrative>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overview {
    #[serde(deserialize_with = "lenient::count")]
    pub total_items: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub sentiment_index: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub volatility_index: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub active_tickers: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub positive_ratio: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub negative_ratio: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub neutral_ratio: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub market_pulse: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub trend_direction: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Item counts by sentiment label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentBreakdown {
    #[serde(deserialize_with = "lenient::count")]
    pub positive: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub negative: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub neutral: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelinePoint {
    #[serde(deserialize_with = "lenient::or_default")]
    pub time: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub label: String,
    #[serde(deserialize_with = "lenient::or_default")]
    pub sentiment: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub confidence: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub mentions: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub lead_ticker: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeInsight {
    #[serde(deserialize_with = "lenient::or_default")]
    pub theme: String,
    #[serde(deserialize_with = "lenient::count")]
    pub mentions: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub average_sentiment: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Narrative {
    #[serde(deserialize_with = "lenient::or_default")]
    pub theme: String,
    #[serde(deserialize_with = "lenient::count")]
    pub mentions: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub sentiment: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub headline: String,
    #[serde(deserialize_with = "lenient::vec_skip_invalid")]
    pub ticker_focus: Vec<String>,
}
