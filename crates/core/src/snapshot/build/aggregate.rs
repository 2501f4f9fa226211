//! Dashboard aggregates over scored items.
//!
//! Item scores here are the raw `[-1, 1]` values; every exported aggregate is
//! scaled to a percentage and rounded to two places.

use crate::domain::dashboard::{Narrative, Overview, SentimentBreakdown, ThemeInsight, TimelinePoint};
use crate::domain::ticker::TickerRow;
use crate::snapshot::build::enrich::{round_to, EnrichedItem};
use std::collections::{BTreeMap, HashMap, HashSet};

const TIMELINE_BUCKETS: usize = 10;
const MACRO_THEME: &str = "Macro";

/// Counts in first-seen order, so ties keep the order items arrived in.
#[derive(Debug, Default)]
struct OrderedCounter<'a> {
    order: Vec<&'a str>,
    counts: HashMap<&'a str, usize>,
}

impl<'a> OrderedCounter<'a> {
    fn add(&mut self, key: &'a str) {
        let count = self.counts.entry(key).or_insert(0);
        if *count == 0 {
            self.order.push(key);
        }
        *count += 1;
    }

    /// Most common first; equal counts keep first-seen order.
    fn most_common(&self) -> Vec<(&'a str, usize)> {
        let mut rows: Vec<_> = self.order.iter().map(|k| (*k, self.counts[k])).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn ratio(count: u64, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(count as f64 / total as f64 * 100.0, 2)
}

pub fn sentiment_breakdown(items: &[EnrichedItem]) -> SentimentBreakdown {
    let mut counts = SentimentBreakdown::default();
    for item in items {
        match item.sentiment.label {
            "positive" => counts.positive += 1,
            "negative" => counts.negative += 1,
            _ => counts.neutral += 1,
        }
    }
    counts
}

pub fn source_breakdown(items: &[EnrichedItem]) -> BTreeMap<String, u64> {
    let count = |source: &str| items.iter().filter(|i| i.raw.source == source).count() as u64;
    BTreeMap::from([
        ("news".to_string(), count("news")),
        ("reddit".to_string(), count("reddit")),
    ])
}

pub fn sentiment_index(items: &[EnrichedItem]) -> f64 {
    mean(items.iter().map(|i| i.sentiment.score)).map_or(0.0, |avg| round_to(avg * 100.0, 2))
}

/// Population standard deviation of item scores.
pub fn volatility_index(items: &[EnrichedItem]) -> f64 {
    if items.len() < 2 {
        return 0.0;
    }
    let Some(avg) = mean(items.iter().map(|i| i.sentiment.score)) else {
        return 0.0;
    };
    let variance = mean(items.iter().map(|i| (i.sentiment.score - avg).powi(2))).unwrap_or(0.0);
    round_to(variance.sqrt() * 100.0, 2)
}

pub fn market_pulse(index: f64) -> &'static str {
    if index >= 22.0 {
        "Risk-on momentum"
    } else if index >= 8.0 {
        "Constructive optimism"
    } else if index <= -22.0 {
        "Risk-off pressure"
    } else if index <= -8.0 {
        "Defensive tone"
    } else {
        "Balanced / mixed"
    }
}

fn oldest_first(items: &[EnrichedItem]) -> Vec<&EnrichedItem> {
    let mut ordered: Vec<&EnrichedItem> = items.iter().collect();
    ordered.sort_by_key(|i| i.raw.published_at);
    ordered
}

/// Compares the mean score of the newer half against the older half.
pub fn trend_direction(items: &[EnrichedItem]) -> &'static str {
    if items.len() < 6 {
        return "flat";
    }
    let ordered = oldest_first(items);
    let (older, newer) = ordered.split_at(ordered.len() / 2);
    let avg = |half: &[&EnrichedItem]| mean(half.iter().map(|i| i.sentiment.score)).unwrap_or(0.0);
    let delta = avg(newer) - avg(older);
    if delta > 0.1 {
        "improving"
    } else if delta < -0.1 {
        "deteriorating"
    } else {
        "flat"
    }
}

pub fn overview(items: &[EnrichedItem]) -> Overview {
    let breakdown = sentiment_breakdown(items);
    let index = sentiment_index(items);
    let active: HashSet<&str> = items
        .iter()
        .flat_map(|i| i.tickers.iter().map(String::as_str))
        .collect();
    Overview {
        total_items: items.len() as u64,
        sentiment_index: index,
        volatility_index: volatility_index(items),
        active_tickers: active.len() as u64,
        positive_ratio: ratio(breakdown.positive, items.len()),
        negative_ratio: ratio(breakdown.negative, items.len()),
        neutral_ratio: ratio(breakdown.neutral, items.len()),
        market_pulse: market_pulse(index).to_string(),
        trend_direction: trend_direction(items).to_string(),
        ..Overview::default()
    }
}

/// Up to ten chronological buckets of roughly equal item count.
pub fn timeline(items: &[EnrichedItem]) -> Vec<TimelinePoint> {
    if items.is_empty() {
        return Vec::new();
    }
    let ordered = oldest_first(items);
    let bucket_size = ordered.len().div_ceil(TIMELINE_BUCKETS).max(1);

    let mut points: Vec<TimelinePoint> = ordered
        .chunks(bucket_size)
        .map(|segment| {
            let mut tickers = OrderedCounter::default();
            for item in segment {
                for ticker in &item.tickers {
                    tickers.add(ticker);
                }
            }
            let last = segment[segment.len() - 1].raw.published_at;
            TimelinePoint {
                time: last.to_rfc3339(),
                label: last.format("%b %d %H:%M").to_string(),
                sentiment: round_to(mean_score(segment) * 100.0, 2),
                confidence: round_to(
                    mean(segment.iter().map(|i| i.sentiment.confidence)).unwrap_or(0.0) * 100.0,
                    2,
                ),
                mentions: segment.len() as u64,
                lead_ticker: tickers
                    .most_common()
                    .first()
                    .map(|(t, _)| t.to_string())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let excess = points.len().saturating_sub(TIMELINE_BUCKETS);
    points.drain(..excess);
    points
}

fn mean_score(items: &[&EnrichedItem]) -> f64 {
    mean(items.iter().map(|i| i.sentiment.score)).unwrap_or(0.0)
}

/// Change between the older and newer half of a ticker's score series, clamped to `[-1, 1]`.
pub fn momentum(series: &[f64]) -> f64 {
    if series.len() < 3 {
        return 0.0;
    }
    let (first, second) = series.split_at(series.len() / 2);
    let avg = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
    (avg(second) - avg(first)).clamp(-1.0, 1.0)
}

#[derive(Debug, Default)]
struct TickerStats<'a> {
    scores: Vec<f64>,
    bullish: u64,
    bearish: u64,
    neutral: u64,
    sources: OrderedCounter<'a>,
}

/// Per-ticker rows ranked by hype score, then mentions, then sentiment magnitude.
pub fn ticker_insights(items: &[EnrichedItem], top_n: usize) -> Vec<TickerRow> {
    let mut order: Vec<&str> = Vec::new();
    let mut stats: HashMap<&str, TickerStats<'_>> = HashMap::new();

    for item in items {
        let mut seen = HashSet::new();
        for ticker in &item.tickers {
            if !seen.insert(ticker.as_str()) {
                continue;
            }
            let entry = stats.entry(ticker.as_str()).or_insert_with(|| {
                order.push(ticker.as_str());
                TickerStats::default()
            });
            entry.scores.push(item.sentiment.score);
            entry.sources.add(&item.raw.source);
            match item.sentiment.label {
                "positive" => entry.bullish += 1,
                "negative" => entry.bearish += 1,
                _ => entry.neutral += 1,
            }
        }
    }

    let mut rows: Vec<TickerRow> = order
        .iter()
        .map(|ticker| {
            let s = &stats[ticker];
            let mentions = s.scores.len();
            let avg = s.scores.iter().sum::<f64>() / mentions as f64;
            let momentum = momentum(&s.scores);
            let hype = mentions as f64 * 6.5 + avg.abs() * 40.0 + momentum.abs() * 22.0;
            TickerRow {
                ticker: ticker.to_string(),
                mentions: mentions as u64,
                average_sentiment: round_to(avg * 100.0, 2),
                bullish: s.bullish,
                bearish: s.bearish,
                neutral: s.neutral,
                momentum: round_to(momentum * 100.0, 2),
                hype_score: round_to(hype, 2),
                source_mix: s
                    .sources
                    .most_common()
                    .into_iter()
                    .map(|(source, n)| (source.to_string(), n as u64))
                    .collect(),
                ..TickerRow::default()
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.hype_score
            .total_cmp(&a.hype_score)
            .then(b.mentions.cmp(&a.mentions))
            .then(b.average_sentiment.abs().total_cmp(&a.average_sentiment.abs()))
    });
    rows.truncate(top_n);
    rows
}

pub fn theme_insights(items: &[EnrichedItem], top_n: usize) -> Vec<ThemeInsight> {
    let mut counts = OrderedCounter::default();
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for item in items {
        for theme in &item.themes {
            counts.add(theme);
            *totals.entry(theme).or_default() += item.sentiment.score;
        }
    }
    counts
        .most_common()
        .into_iter()
        .take(top_n)
        .map(|(theme, n)| ThemeInsight {
            theme: theme.to_string(),
            mentions: n as u64,
            average_sentiment: round_to(totals[theme] / n as f64 * 100.0, 2),
        })
        .collect()
}

/// One narrative per theme (untagged items fall under "Macro"), led by the
/// item with the strongest confident score.
pub fn narratives(items: &[EnrichedItem], limit: usize) -> Vec<Narrative> {
    let mut order: Vec<&str> = Vec::new();
    let mut buckets: HashMap<&str, Vec<&EnrichedItem>> = HashMap::new();
    for item in items {
        let themes: &[&'static str] = if item.themes.is_empty() {
            &[MACRO_THEME]
        } else {
            &item.themes
        };
        for theme in themes {
            buckets
                .entry(theme)
                .or_insert_with(|| {
                    order.push(theme);
                    Vec::new()
                })
                .push(item);
        }
    }

    let mut rows: Vec<Narrative> = order
        .iter()
        .filter_map(|theme| {
            let members = &buckets[theme];
            // first of equals wins
            let lead = members.iter().copied().reduce(|best, item| {
                if strength(item) > strength(best) {
                    item
                } else {
                    best
                }
            })?;
            Some(Narrative {
                theme: theme.to_string(),
                mentions: members.len() as u64,
                sentiment: round_to(mean_score(members) * 100.0, 2),
                headline: lead.raw.title.clone(),
                ticker_focus: lead.tickers.iter().take(3).cloned().collect(),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.mentions
            .cmp(&a.mentions)
            .then(b.sentiment.abs().total_cmp(&a.sentiment.abs()))
    });
    rows.truncate(limit);
    rows
}

fn strength(item: &EnrichedItem) -> f64 {
    item.sentiment.score.abs() * item.sentiment.confidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::build::enrich::{RawFeedItem, SentimentScore};
    use chrono::{Duration, TimeZone, Utc};

    fn item(minute: i64, source: &str, label: &'static str, score: f64, tickers: &[&str], themes: &[&'static str]) -> EnrichedItem {
        EnrichedItem {
            raw: RawFeedItem {
                id: format!("{source}-{minute}"),
                source: source.to_string(),
                title: format!("headline {minute}"),
                url: String::new(),
                published_at: Utc.with_ymd_and_hms(2026, 1, 27, 9, 0, 0).unwrap() + Duration::minutes(minute),
                text: String::new(),
            },
            summary: String::new(),
            sentiment: SentimentScore {
                label,
                score,
                confidence: 0.5,
            },
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            themes: themes.to_vec(),
        }
    }

    fn fixture() -> Vec<EnrichedItem> {
        vec![
            item(0, "news", "positive", 0.5, &["NVDA", "AMD"], &["AI"]),
            item(10, "reddit", "positive", 0.3, &["NVDA"], &["AI"]),
            item(20, "news", "negative", -0.4, &["TSLA"], &["EV"]),
            item(30, "reddit", "neutral", 0.0, &[], &[]),
        ]
    }

    #[test]
    fn breakdowns_and_overview() {
        let items = fixture();
        let b = sentiment_breakdown(&items);
        assert_eq!((b.positive, b.negative, b.neutral), (2, 1, 1));
        assert_eq!(source_breakdown(&items), BTreeMap::from([("news".into(), 2), ("reddit".into(), 2)]));

        let o = overview(&items);
        assert_eq!(o.total_items, 4);
        assert_eq!(o.sentiment_index, 10.0);
        assert_eq!(o.active_tickers, 3);
        assert_eq!(o.positive_ratio, 50.0);
        assert_eq!(o.market_pulse, "Constructive optimism");
        assert_eq!(o.trend_direction, "flat");
        assert!(o.volatility_index > 0.0);
    }

    #[test]
    fn empty_items_aggregate_to_zeros() {
        let o = overview(&[]);
        assert_eq!(o.total_items, 0);
        assert_eq!(o.sentiment_index, 0.0);
        assert_eq!(o.positive_ratio, 0.0);
        assert_eq!(o.market_pulse, "Balanced / mixed");
        assert!(timeline(&[]).is_empty());
        assert!(ticker_insights(&[], 12).is_empty());
        assert!(narratives(&[], 8).is_empty());
    }

    #[test]
    fn trend_compares_halves() {
        let items: Vec<_> = (0..6)
            .map(|i| item(i, "news", "neutral", if i < 3 { -0.2 } else { 0.3 }, &[], &[]))
            .collect();
        assert_eq!(trend_direction(&items), "improving");
    }

    #[test]
    fn momentum_needs_three_points() {
        assert_eq!(momentum(&[0.5, -0.5]), 0.0);
        assert!((momentum(&[-0.2, 0.1, 0.4]) - 0.45).abs() < 1e-9);
        assert_eq!(momentum(&[-1.0, 1.0, 1.0, 1.0]), 1.0);
    }

    #[test]
    fn ticker_rows_rank_by_hype() {
        let rows = ticker_insights(&fixture(), 12);
        let tickers: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["NVDA", "AMD", "TSLA"]);

        let nvda = &rows[0];
        assert_eq!(nvda.mentions, 2);
        assert_eq!(nvda.bullish, 2);
        assert_eq!(nvda.average_sentiment, 40.0);
        assert_eq!(nvda.hype_score, 29.0);
        assert_eq!(nvda.source_mix, BTreeMap::from([("news".into(), 1), ("reddit".into(), 1)]));
        assert_eq!(rows[2].bearish, 1);

        assert_eq!(ticker_insights(&fixture(), 1).len(), 1);
    }

    #[test]
    fn repeated_ticker_in_one_item_counts_once() {
        let rows = ticker_insights(&[item(0, "news", "positive", 0.5, &["NVDA", "NVDA"], &[])], 12);
        assert_eq!(rows[0].mentions, 1);
    }

    #[test]
    fn themes_and_narratives() {
        let items = fixture();
        let themes = theme_insights(&items, 10);
        assert_eq!(themes[0].theme, "AI");
        assert_eq!(themes[0].mentions, 2);
        assert_eq!(themes[0].average_sentiment, 40.0);
        assert_eq!(themes[1].theme, "EV");

        let rows = narratives(&items, 8);
        let names: Vec<_> = rows.iter().map(|n| n.theme.as_str()).collect();
        assert_eq!(names, vec!["AI", "EV", "Macro"]);
        assert_eq!(rows[0].headline, "headline 0");
        assert_eq!(rows[0].ticker_focus, vec!["NVDA", "AMD"]);
        assert_eq!(narratives(&items, 1).len(), 1);
    }

    #[test]
    fn timeline_buckets_chronologically() {
        let items: Vec<_> = (0..25)
            .map(|i| item(i, "news", "positive", 0.1, &["AAPL"], &[]))
            .collect();
        let points = timeline(&items);
        // ceil(25 / 10) = 3 items per bucket -> 9 buckets
        assert_eq!(points.len(), 9);
        assert_eq!(points[0].mentions, 3);
        assert_eq!(points[8].mentions, 1);
        assert_eq!(points[0].label, "Jan 27 09:02");
        assert_eq!(points[0].lead_ticker, "AAPL");
        assert_eq!(points[0].sentiment, 10.0);
        assert_eq!(points[0].confidence, 50.0);
    }
}
