//! Keyword sentiment scoring and ticker/theme tagging for raw feed items.

use crate::domain::feed::{FeedItem, Sentiment};
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;

const POSITIVE_WEIGHTS: &[(&str, f64)] = &[
    ("beat", 1.4),
    ("bull", 1.2),
    ("bullish", 1.35),
    ("buy", 1.0),
    ("breakout", 1.25),
    ("gain", 1.15),
    ("growth", 1.1),
    ("green", 0.8),
    ("momentum", 0.95),
    ("optimistic", 1.2),
    ("outperform", 1.4),
    ("profit", 1.3),
    ("rally", 1.4),
    ("record", 1.0),
    ("rebound", 1.1),
    ("recover", 1.0),
    ("surge", 1.5),
    ("upgrade", 1.25),
    ("upside", 1.2),
    ("win", 1.0),
];

const NEGATIVE_WEIGHTS: &[(&str, f64)] = &[
    ("bankrupt", 1.7),
    ("bear", 1.2),
    ("bearish", 1.35),
    ("crash", 1.65),
    ("cut", 0.8),
    ("decline", 1.15),
    ("downgrade", 1.35),
    ("drop", 1.1),
    ("fear", 1.0),
    ("loss", 1.25),
    ("miss", 1.2),
    ("missed", 1.2),
    ("plunge", 1.65),
    ("risk", 0.9),
    ("sell", 1.15),
    ("slump", 1.35),
    ("volatile", 0.9),
    ("warning", 0.95),
    ("weak", 0.95),
];

const INTENSIFIERS: &[&str] = &["very", "extremely", "strong", "massive", "huge", "major", "sharp"];
const INTENSITY: f64 = 1.35;

/// Normalized scores at or beyond this magnitude are labelled positive/negative.
const LABEL_THRESHOLD: f64 = 0.18;

/// Theme tags in output order.
pub const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    ("AI", &["ai", "artificial intelligence", "chip", "semiconductor", "model", "gpu"]),
    ("Earnings", &["earnings", "eps", "revenue", "guidance", "quarter", "forecast"]),
    ("Rates", &["fed", "rates", "interest", "inflation", "cpi", "bond"]),
    ("M&A", &["acquire", "acquisition", "merger", "deal", "buyout"]),
    ("Crypto", &["bitcoin", "ethereum", "crypto", "token", "blockchain"]),
    ("EV", &["electric vehicle", "ev", "battery", "charging", "tesla"]),
    ("Labor", &["strike", "layoff", "hiring", "workforce", "union"]),
];

const COMPANY_TO_TICKER: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("amazon", "AMZN"),
    ("alphabet", "GOOGL"),
    ("google", "GOOGL"),
    ("microsoft", "MSFT"),
    ("meta", "META"),
    ("nvidia", "NVDA"),
    ("tesla", "TSLA"),
    ("netflix", "NFLX"),
    ("palantir", "PLTR"),
    ("coinbase", "COIN"),
    ("amd", "AMD"),
    ("intel", "INTC"),
];

/// Upper-case words that look like symbols but are not.
const TICKER_NOISE: &[&str] = &[
    "A", "AI", "AM", "AN", "ARE", "AS", "AT", "CEO", "CFO", "CPI", "DO", "EV", "FED", "FOR", "GDP",
    "HAS", "HOW", "IPO", "IS", "IT", "LOW", "NEW", "NO", "NOW", "ON", "OR", "OUT", "PM", "RSI", "SO",
    "THE", "TO", "TOP", "USA", "USD", "WSB", "YOLO",
];

/// Single-letter symbols that are real listings.
const SINGLE_LETTER_TICKERS: &[&str] = &["C", "F", "T"];
const MAX_TICKERS_PER_ITEM: usize = 10;
const SUMMARY_MAX_CHARS: usize = 180;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z][a-z\-']*").expect("valid word regex"));
static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?[A-Z]{1,5}\b").expect("valid ticker regex"));

/// An item as collected from RSS or an input file, before scoring.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeedItem {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
}

/// Keyword score for one text. `score` is in `[-1, 1]`, `confidence` in `[0, 0.99]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScore {
    pub label: &'static str,
    pub score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedItem {
    pub raw: RawFeedItem,
    pub summary: String,
    pub sentiment: SentimentScore,
    pub tickers: Vec<String>,
    pub themes: Vec<&'static str>,
}

impl EnrichedItem {
    pub fn from_raw(raw: RawFeedItem) -> Self {
        let sentiment = analyze_sentiment(&raw.text);
        let tickers = extract_tickers(&format!("{} {}", raw.title, raw.text));
        let themes = extract_themes(&raw.text);
        let summary = summarize_text(&raw.text, SUMMARY_MAX_CHARS);
        Self {
            raw,
            summary,
            sentiment,
            tickers,
            themes,
        }
    }

    /// Exported feed shape; scores are scaled to percentages.
    pub fn to_feed_item(&self) -> FeedItem {
        FeedItem {
            id: self.raw.id.clone(),
            source: self.raw.source.clone(),
            title: self.raw.title.clone(),
            url: self.raw.url.clone(),
            published_at: self.raw.published_at.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            text: self.raw.text.clone(),
            summary: self.summary.clone(),
            sentiment: Sentiment {
                label: self.sentiment.label.to_string(),
                score: round_to(self.sentiment.score * 100.0, 2),
                confidence: round_to(self.sentiment.confidence * 100.0, 2),
            },
            tickers: Some(self.tickers.clone()),
            themes: self.themes.iter().map(|t| t.to_string()).collect(),
            ..FeedItem::default()
        }
    }
}

pub fn analyze_sentiment(text: &str) -> SentimentScore {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();
    if tokens.is_empty() {
        return SentimentScore {
            label: "neutral",
            score: 0.0,
            confidence: 0.2,
        };
    }

    let mut score = 0.0;
    let mut intensity = 1.0;
    for token in &tokens {
        if INTENSIFIERS.contains(token) {
            intensity = INTENSITY;
            continue;
        }
        score += weight(token) * intensity;
        intensity = 1.0;
    }

    let base = (tokens.len() as f64 + 1.0).sqrt().max(2.4);
    let normalized = (score / base).clamp(-1.0, 1.0);
    let label = if normalized >= LABEL_THRESHOLD {
        "positive"
    } else if normalized <= -LABEL_THRESHOLD {
        "negative"
    } else {
        "neutral"
    };
    let confidence =
        (normalized.abs() * 1.45 + (tokens.len() as f64 / 110.0).min(0.3)).min(0.99);

    SentimentScore {
        label,
        score: round_to(normalized, 4),
        confidence: round_to(confidence, 4),
    }
}

fn weight(token: &str) -> f64 {
    let lookup = |table: &[(&str, f64)]| table.iter().find(|(w, _)| *w == token).map(|(_, v)| *v);
    lookup(POSITIVE_WEIGHTS)
        .or_else(|| lookup(NEGATIVE_WEIGHTS).map(|v| -v))
        .unwrap_or(0.0)
}

/// Cashtags, bare upper-case symbols and known company names, sorted and capped.
pub fn extract_tickers(text: &str) -> Vec<String> {
    let mut found = BTreeSet::new();
    for m in TICKER_RE.find_iter(text) {
        let token = m.as_str().trim_start_matches('$');
        if TICKER_NOISE.contains(&token) {
            continue;
        }
        if token.len() == 1 && !SINGLE_LETTER_TICKERS.contains(&token) {
            continue;
        }
        found.insert(token.to_string());
    }

    let lowered = text.to_lowercase();
    for (company, ticker) in COMPANY_TO_TICKER {
        if lowered.contains(company) {
            found.insert(ticker.to_string());
        }
    }

    found.into_iter().take(MAX_TICKERS_PER_ITEM).collect()
}

pub fn extract_themes(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    THEME_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(theme, _)| *theme)
        .collect()
}

pub fn summarize_text(text: &str, max_chars: usize) -> String {
    let clean = normalize_whitespace(text);
    if clean.chars().count() <= max_chars {
        return clean;
    }
    let head: String = clean.chars().take(max_chars - 1).collect();
    format!("{}...", head.trim_end())
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 32-bit FNV-1a, hex encoded. Item ids stay stable across runs.
pub fn stable_hash(value: &str) -> String {
    let hash = value.bytes().fold(0x811c_9dc5_u32, |acc, byte| {
        (acc ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    format!("{hash:08x}")
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
