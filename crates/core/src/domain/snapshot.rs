use crate::domain::dashboard::Dashboard;
use crate::domain::feed::{sort_newest_first, FeedItem};
use crate::domain::lenient;
use crate::domain::ticker::TickerRow;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot file as exported, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotDocument {
    #[serde(deserialize_with = "lenient::non_empty_string")]
    pub generated_at: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub dashboard: Dashboard,
    #[serde(deserialize_with = "lenient::vec_skip_invalid")]
    pub feed: Vec<FeedItem>,
    #[serde(deserialize_with = "lenient::opt_vec_skip_invalid")]
    pub ticker_index: Option<Vec<TickerRow>>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub meta: Option<SnapshotMeta>,

    /// The `dashboard` object exactly as exported.
    #[serde(skip)]
    pub raw_dashboard: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotMeta {
    /// `rss`, `input` or `fallback`, depending on where the generator got its items.
    #[serde(deserialize_with = "lenient::or_default")]
    pub source: String,
    #[serde(deserialize_with = "lenient::count")]
    pub item_count: u64,
}

/// Normalized, read-only snapshot served by the query router.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generated_at: String,
    /// Typed view used for lookups (`sentiment`, `overview`).
    pub dashboard: Dashboard,
    /// Served verbatim by `/api/dashboard`; only a missing `generatedAt` is filled in.
    pub raw_dashboard: Map<String, Value>,
    /// Newest first.
    pub feed: Vec<FeedItem>,
    pub ticker_index: Vec<TickerRow>,
    pub meta: Option<SnapshotMeta>,
}

impl SnapshotDocument {
    pub fn from_json(value: Value) -> Self {
        // Arrays would otherwise decode positionally into the fields.
        if !value.is_object() {
            return Self::default();
        }
        let raw_dashboard = match value.get("dashboard") {
            Some(Value::Object(dashboard)) => dashboard.clone(),
            _ => Map::new(),
        };
        let mut document: Self = serde_json::from_value(value).unwrap_or_default();
        document.raw_dashboard = raw_dashboard;
        document
    }

    pub fn into_snapshot(self, now: DateTime<Utc>) -> Snapshot {
        let now = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let SnapshotDocument {
            generated_at,
            mut dashboard,
            mut feed,
            ticker_index,
            meta,
            mut raw_dashboard,
        } = self;

        let generated_at = generated_at
            .or_else(|| dashboard.generated_at.clone())
            .unwrap_or_else(|| now.clone());
        if dashboard.generated_at.is_none() {
            dashboard.generated_at = Some(generated_at.clone());
            raw_dashboard.insert("generatedAt".to_string(), Value::String(generated_at.clone()));
        }

        sort_newest_first(&mut feed);

        let ticker_index = ticker_index.unwrap_or_else(|| dashboard.trending.clone());

        Snapshot {
            generated_at,
            dashboard,
            raw_dashboard,
            feed,
            ticker_index,
            meta,
        }
    }
}

impl Snapshot {
    pub fn from_json(value: Value, now: DateTime<Utc>) -> Self {
        SnapshotDocument::from_json(value).into_snapshot(now)
    }
}
