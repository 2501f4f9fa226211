use crate::domain::lenient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

const MAX_TICKER_LEN: usize = 5;

/// Normalizes a user- or feed-supplied symbol: ASCII letters only, uppercased,
/// truncated to five characters. Returns an empty string when nothing is left.
pub fn sanitize_ticker(value: &str) -> String {
    value
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase())
        .take(MAX_TICKER_LEN)
        .collect()
}

/// Per-ticker aggregate statistics as exported by the live API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerRow {
    #[serde(deserialize_with = "lenient::or_default")]
    pub ticker: String,
    #[serde(deserialize_with = "lenient::count")]
    pub mentions: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub average_sentiment: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub bullish: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub bearish: u64,
    #[serde(deserialize_with = "lenient::count")]
    pub neutral: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub momentum: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub hype_score: f64,
    #[serde(deserialize_with = "lenient::count_map")]
    pub source_mix: BTreeMap<String, u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TickerRow {
    /// Zero-valued row used for symbols the index does not know about.
    pub fn empty(symbol: &str) -> Self {
        Self {
            ticker: symbol.to_string(),
            ..Self::default()
        }
    }
}

/// Resolves requested symbols against a ticker index, one row per symbol.
#[derive(Debug)]
pub struct TickerResolver<'a> {
    by_symbol: HashMap<&'a str, &'a TickerRow>,
}

impl<'a> TickerResolver<'a> {
    pub fn new(index: &'a [TickerRow]) -> Self {
        let mut by_symbol = HashMap::with_capacity(index.len());
        for row in index {
            // First row wins when an export repeats a symbol.
            by_symbol.entry(row.ticker.as_str()).or_insert(row);
        }
        Self { by_symbol }
    }

    pub fn lookup(&self, symbol: &str) -> TickerRow {
        self.by_symbol
            .get(symbol)
            .map(|row| (*row).clone())
            .unwrap_or_else(|| TickerRow::empty(symbol))
    }

    pub fn resolve<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<TickerRow> {
        symbols.iter().map(|s| self.lookup(s.as_ref())).collect()
    }
}
