//! Reproduces the live API's route table over an in-memory [`Snapshot`].
//!
//! Exact routes are tried first, then the single prefix route
//! (`/api/ticker/{symbol}`). Every response has the same shape the live
//! endpoint returns, so consumers never branch on where data came from.

use crate::domain::dashboard::ThemeInsight;
use crate::domain::feed::FeedItem;
use crate::domain::snapshot::Snapshot;
use crate::domain::ticker::{sanitize_ticker, TickerResolver, TickerRow};
use crate::error::RouteError;
use crate::query::filter::FeedFilter;
use crate::query::params::{split_path, QueryParams};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_WATCHLIST: [&str; 4] = ["AAPL", "MSFT", "NVDA", "TSLA"];
pub const MAX_WATCHLIST: usize = 25;

const TICKER_DETAIL_ITEMS: usize = 40;
const INSIGHT_TICKERS: usize = 10;

type Handler = fn(&Snapshot, &QueryParams) -> Result<Value, RouteError>;
type PrefixHandler = fn(&Snapshot, &str, &QueryParams) -> Result<Value, RouteError>;

const EXACT_ROUTES: &[(&str, Handler)] = &[
    ("/api/dashboard", dashboard),
    ("/api/feed", feed),
    ("/api/watchlist", watchlist),
    ("/api/health", health),
    ("/api/trending-stocks", trending_stocks),
    ("/api/sentiment", sentiment),
    ("/api/news", news),
    ("/api/reddit", reddit),
    ("/api/insights", insights),
];

const PREFIX_ROUTES: &[(&str, PrefixHandler)] = &[("/api/ticker/", ticker_detail)];

/// Resolves `path` (which may carry its own query string) against the
/// snapshot. Query pairs embedded in `path` take precedence over `params`.
pub fn resolve(snapshot: &Snapshot, path: &str, params: &QueryParams) -> Result<Value, RouteError> {
    let (route, mut merged) = split_path(path);
    merged.extend(params.clone());

    if let Some((_, handler)) = EXACT_ROUTES.iter().find(|(pattern, _)| *pattern == route) {
        return handler(snapshot, &merged);
    }

    for (prefix, handler) in PREFIX_ROUTES {
        if let Some(rest) = route.strip_prefix(prefix) {
            return handler(snapshot, rest, &merged);
        }
    }

    Err(RouteError::NoRouteMatch(route.to_string()))
}

/// Whether `resolve` would dispatch `path` to a handler.
pub fn is_known_route(path: &str) -> bool {
    let (route, _) = split_path(path);
    EXACT_ROUTES.iter().any(|(pattern, _)| *pattern == route)
        || PREFIX_ROUTES.iter().any(|(prefix, _)| route.starts_with(prefix))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Listing<'a, T> {
    generated_at: &'a str,
    cached: bool,
    count: usize,
    items: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health<'a> {
    status: &'static str,
    version: &'static str,
    cached: bool,
    cache_age_seconds: u64,
    items: usize,
    generated_at: &'a str,
}

#[derive(Debug, Serialize)]
struct SentimentCount {
    sentiment: &'static str,
    count: u64,
}

#[derive(Debug, Serialize)]
struct Headline<'a> {
    id: &'a str,
    title: &'a str,
    url: &'a str,
    date: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TickerDetail<'a> {
    generated_at: &'a str,
    cached: bool,
    ticker: String,
    mentions: usize,
    snapshot: TickerRow,
    items: Vec<&'a FeedItem>,
    themes: Vec<ThemeInsight>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Insights<'a> {
    generated_at: &'a str,
    cached: bool,
    item_count: usize,
    sentiment_index: f64,
    themes: &'a [Value],
    trending_tickers: &'a [TickerRow],
    narratives: &'a [Value],
}

fn dashboard(snapshot: &Snapshot, _params: &QueryParams) -> Result<Value, RouteError> {
    Ok(Value::Object(snapshot.raw_dashboard.clone()))
}

/// An array section of the exported dashboard, untouched; empty when absent or not an array.
fn dashboard_section<'a>(snapshot: &'a Snapshot, key: &str) -> &'a [Value] {
    snapshot
        .raw_dashboard
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn feed(snapshot: &Snapshot, params: &QueryParams) -> Result<Value, RouteError> {
    let limit = params.bounded_limit("limit", 40, 1, 200);
    let filtered = FeedFilter::from_params(params).apply(&snapshot.feed);
    let count = filtered.len();
    Ok(serde_json::to_value(Listing {
        generated_at: &snapshot.generated_at,
        cached: true,
        count,
        items: filtered.into_iter().take(limit).collect(),
    })?)
}

fn watchlist(snapshot: &Snapshot, params: &QueryParams) -> Result<Value, RouteError> {
    let symbols = watchlist_symbols(params.get("tickers").unwrap_or_default());
    let items = TickerResolver::new(&snapshot.ticker_index).resolve(&symbols);
    Ok(serde_json::to_value(Listing {
        generated_at: &snapshot.generated_at,
        cached: true,
        count: items.len(),
        items,
    })?)
}

/// Sanitized, de-duplicated (first occurrence wins) and capped symbol list;
/// the default watchlist when nothing usable was requested.
pub fn watchlist_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(sanitize_ticker) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        symbols = DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect();
    }
    symbols.truncate(MAX_WATCHLIST);
    symbols
}

fn health(snapshot: &Snapshot, _params: &QueryParams) -> Result<Value, RouteError> {
    Ok(serde_json::to_value(Health {
        status: "ok",
        version: "static-snapshot",
        cached: true,
        cache_age_seconds: 0,
        items: snapshot.feed.len(),
        generated_at: &snapshot.generated_at,
    })?)
}

fn trending_stocks(snapshot: &Snapshot, params: &QueryParams) -> Result<Value, RouteError> {
    let limit = params.bounded_limit("limit", 15, 1, 50);
    let rows = &snapshot.ticker_index[..limit.min(snapshot.ticker_index.len())];
    Ok(serde_json::to_value(rows)?)
}

fn sentiment(snapshot: &Snapshot, _params: &QueryParams) -> Result<Value, RouteError> {
    let counts = snapshot.dashboard.sentiment;
    Ok(serde_json::to_value([
        SentimentCount {
            sentiment: "POSITIVE",
            count: counts.positive,
        },
        SentimentCount {
            sentiment: "NEGATIVE",
            count: counts.negative,
        },
        SentimentCount {
            sentiment: "NEUTRAL",
            count: counts.neutral,
        },
    ])?)
}

fn news(snapshot: &Snapshot, params: &QueryParams) -> Result<Value, RouteError> {
    headlines(snapshot, "news", params)
}

fn reddit(snapshot: &Snapshot, params: &QueryParams) -> Result<Value, RouteError> {
    headlines(snapshot, "reddit", params)
}

fn headlines(snapshot: &Snapshot, source: &str, params: &QueryParams) -> Result<Value, RouteError> {
    let limit = params.bounded_limit("limit", 20, 1, 100);
    let rows: Vec<Headline<'_>> = snapshot
        .feed
        .iter()
        .filter(|item| item.source == source)
        .take(limit)
        .map(|item| Headline {
            id: &item.id,
            title: &item.title,
            url: &item.url,
            date: &item.published_at,
            text: &item.text,
        })
        .collect();
    Ok(serde_json::to_value(rows)?)
}

fn ticker_detail(snapshot: &Snapshot, rest: &str, _params: &QueryParams) -> Result<Value, RouteError> {
    let segment = rest.rsplit('/').next().unwrap_or_default();
    let symbol = sanitize_ticker(segment);

    let related: Vec<&FeedItem> = if symbol.is_empty() {
        Vec::new()
    } else {
        snapshot
            .feed
            .iter()
            .filter(|item| item.mentions_ticker(&symbol))
            .collect()
    };
    let row = TickerResolver::new(&snapshot.ticker_index).lookup(&symbol);

    Ok(serde_json::to_value(TickerDetail {
        generated_at: &snapshot.generated_at,
        cached: true,
        mentions: related.len(),
        ticker: symbol,
        snapshot: row,
        items: related.into_iter().take(TICKER_DETAIL_ITEMS).collect(),
        themes: Vec::new(),
    })?)
}

fn insights(snapshot: &Snapshot, _params: &QueryParams) -> Result<Value, RouteError> {
    let index = &snapshot.ticker_index;
    Ok(serde_json::to_value(Insights {
        generated_at: &snapshot.generated_at,
        cached: true,
        item_count: snapshot.feed.len(),
        sentiment_index: snapshot.dashboard.overview.sentiment_index,
        themes: dashboard_section(snapshot, "themes"),
        trending_tickers: &index[..INSIGHT_TICKERS.min(index.len())],
        narratives: dashboard_section(snapshot, "narratives"),
    })?)
}
