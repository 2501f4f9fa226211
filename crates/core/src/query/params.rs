/// Query-string multimap. Lookups return the first value for a key, matching
/// `URLSearchParams.get` on the consuming side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` query (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Reads an integer parameter, rounding fractional input and clamping to
    /// `[min, max]`. Absent, blank or non-numeric values yield `default`.
    pub fn bounded_limit(&self, key: &str, default: usize, min: usize, max: usize) -> usize {
        let Some(raw) = self.get(key).map(str::trim).filter(|s| !s.is_empty()) else {
            return default;
        };
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => n.round().clamp(min as f64, max as f64) as usize,
            _ => default,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Extend<(String, String)> for QueryParams {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.pairs.extend(iter);
    }
}

impl IntoIterator for QueryParams {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// Splits `"/api/feed?source=news#top"` into the route and its query pairs.
pub fn split_path(path: &str) -> (&str, QueryParams) {
    let path = path.split_once('#').map_or(path, |(before, _)| before);
    match path.split_once('?') {
        Some((route, query)) => (route, QueryParams::parse(query)),
        None => (path, QueryParams::new()),
    }
}
