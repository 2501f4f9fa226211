use crate::domain::feed::FeedItem;
use crate::domain::ticker::sanitize_ticker;
use crate::query::params::QueryParams;

/// Conjunctive feed predicates. Blank values impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    source: Option<String>,
    sentiment: Option<String>,
    ticker: Option<String>,
    query: Option<String>,
}

impl FeedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: &QueryParams) -> Self {
        Self::new()
            .source(params.get("source").unwrap_or_default())
            .sentiment(params.get("sentiment").unwrap_or_default())
            .ticker(params.get("ticker").unwrap_or_default())
            .query(params.get("q").unwrap_or_default())
    }

    pub fn source(mut self, value: &str) -> Self {
        self.source = lowered(value);
        self
    }

    pub fn sentiment(mut self, value: &str) -> Self {
        self.sentiment = lowered(value);
        self
    }

    pub fn ticker(mut self, value: &str) -> Self {
        self.ticker = Some(sanitize_ticker(value)).filter(|s| !s.is_empty());
        self
    }

    pub fn query(mut self, value: &str) -> Self {
        self.query = lowered(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.sentiment.is_none()
            && self.ticker.is_none()
            && self.query.is_none()
    }

    pub fn matches(&self, item: &FeedItem) -> bool {
        if let Some(source) = &self.source {
            if item.source.to_lowercase() != *source {
                return false;
            }
        }
        if let Some(sentiment) = &self.sentiment {
            if item.sentiment.label.to_lowercase() != *sentiment {
                return false;
            }
        }
        if let Some(ticker) = &self.ticker {
            if !item.mentions_ticker(ticker) {
                return false;
            }
        }
        if let Some(query) = &self.query {
            let haystack = format!("{} {}", item.title, item.text).to_lowercase();
            if !haystack.contains(query.as_str()) {
                return false;
            }
        }
        true
    }

    /// Order-preserving subsequence of `items` that pass every predicate.
    pub fn apply<'a>(&self, items: &'a [FeedItem]) -> Vec<&'a FeedItem> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

fn lowered(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feed::Sentiment;

    fn item(id: &str, source: &str, label: &str, tickers: Option<&[&str]>, title: &str) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            source: source.to_string(),
            title: title.to_string(),
            sentiment: Sentiment {
                label: label.to_string(),
                ..Sentiment::default()
            },
            tickers: tickers.map(|t| t.iter().map(|s| s.to_string()).collect()),
            ..FeedItem::default()
        }
    }

    fn fixture() -> Vec<FeedItem> {
        vec![
            item("a", "news", "positive", Some(&["AAPL"]), "Apple beats estimates"),
            item("b", "reddit", "negative", Some(&["TSLA"]), "Tesla deliveries slump"),
            item("c", "news", "neutral", None, "Fed holds rates"),
            item("d", "Reddit", "Positive", Some(&["aapl", "NVDA"]), "AAPL and NVDA to the moon"),
        ]
    }

    fn ids(items: &[&FeedItem]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn empty_filter_is_identity() {
        let items = fixture();
        let filter = FeedFilter::from_params(&QueryParams::new());
        assert!(filter.is_empty());
        let out: Vec<FeedItem> = filter.apply(&items).into_iter().cloned().collect();
        assert_eq!(out, items);
    }

    #[test]
    fn blank_values_impose_nothing() {
        let params = QueryParams::new()
            .with("source", "  ")
            .with("ticker", "123")
            .with("q", " ");
        assert!(FeedFilter::from_params(&params).is_empty());
    }

    #[test]
    fn source_and_sentiment_are_case_insensitive() {
        let items = fixture();
        assert_eq!(ids(&FeedFilter::new().source("NEWS").apply(&items)), vec!["a", "c"]);
        assert_eq!(ids(&FeedFilter::new().source("reddit").apply(&items)), vec!["b", "d"]);
        assert_eq!(
            ids(&FeedFilter::new().sentiment("positive").apply(&items)),
            vec!["a", "d"]
        );
    }

    #[test]
    fn ticker_filter_excludes_items_without_tickers() {
        let items = fixture();
        assert_eq!(ids(&FeedFilter::new().ticker("$aapl").apply(&items)), vec!["a", "d"]);
        assert!(FeedFilter::new().ticker("MSFT").apply(&items).is_empty());
    }

    #[test]
    fn text_search_covers_title_and_body() {
        let mut items = fixture();
        items[2].text = "Powell signals patience on rate cuts".to_string();
        assert_eq!(ids(&FeedFilter::new().query("RATE CUT").apply(&items)), vec!["c"]);
        assert_eq!(ids(&FeedFilter::new().query(" moon ").apply(&items)), vec!["d"]);
    }

    #[test]
    fn predicates_are_conjunctive() {
        let items = fixture();
        let filter = FeedFilter::new().source("reddit").ticker("AAPL").sentiment("positive");
        assert_eq!(ids(&filter.apply(&items)), vec!["d"]);
        let filter = FeedFilter::new().source("news").ticker("TSLA");
        assert!(filter.apply(&items).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let items = fixture();
        let filters = [
            FeedFilter::new().source("news"),
            FeedFilter::new().ticker("aapl").query("a"),
            FeedFilter::new().sentiment("negative"),
        ];
        for filter in filters {
            let once: Vec<FeedItem> = filter.apply(&items).into_iter().cloned().collect();
            let twice: Vec<FeedItem> = filter.apply(&once).into_iter().cloned().collect();
            assert_eq!(once, twice);
        }
    }
}
