//! RSS 2.0 and Atom feed collection.

use crate::snapshot::build::enrich::{normalize_whitespace, stable_hash, RawFeedItem};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

pub const NEWS_RSS_URL: &str = "https://finance.yahoo.com/news/rssindex";
pub const REDDIT_RSS_URL: &str = "https://www.reddit.com/r/wallstreetbets/.rss";

const MAX_ENTRIES_PER_FEED: usize = 80;
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// Fetches a feed body. Failures are logged and yield an empty body so one
/// dead feed does not stop the run.
pub async fn fetch_feed_xml(http: &reqwest::Client, url: &str) -> String {
    match fetch_once(http, url).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(url, error = %err, "feed fetch failed");
            String::new()
        }
    }
}

async fn fetch_once(http: &reqwest::Client, url: &str) -> Result<String> {
    let res = http
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .context("feed request failed")?;
    let status = res.status();
    if !status.is_success() {
        anyhow::bail!("feed HTTP {status}");
    }
    res.text().await.context("failed to read feed body")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Body,
    Link,
    Published,
    Skip,
}

#[derive(Debug, Default)]
struct Entry {
    title: String,
    body: String,
    link: String,
    published: String,
}

impl Entry {
    fn buffer(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.title),
            Field::Body => Some(&mut self.body),
            Field::Link => Some(&mut self.link),
            Field::Published => Some(&mut self.published),
            Field::Skip => None,
        }
    }

    /// The first occurrence of a field wins; repeats are skipped.
    fn field_for(&self, name: &[u8]) -> Field {
        let (field, current) = match name {
            b"title" => (Field::Title, &self.title),
            b"description" | b"content" | b"summary" => (Field::Body, &self.body),
            b"link" => (Field::Link, &self.link),
            b"pubDate" | b"updated" | b"published" => (Field::Published, &self.published),
            _ => return Field::Skip,
        };
        if current.is_empty() {
            field
        } else {
            Field::Skip
        }
    }

    fn take_href(&mut self, element: &BytesStart<'_>) {
        if !self.link.is_empty() {
            return;
        }
        for attr in element.attributes().flatten() {
            if attr.key.local_name().as_ref() == b"href" {
                if let Ok(value) = attr.unescape_value() {
                    self.link = normalize_whitespace(&value);
                }
            }
        }
    }

    fn into_raw(self, source: &str, now: DateTime<Utc>) -> Option<RawFeedItem> {
        let title = match normalize_whitespace(&self.title) {
            t if t.is_empty() => "Untitled".to_string(),
            t => t,
        };
        let body = html_to_text(&self.body);
        let link = normalize_whitespace(&self.link);
        let joined = format!("{title}. {body}");
        let text = normalize_whitespace(joined.trim_matches(|c| c == '.' || c == ' '));
        if text.is_empty() {
            return None;
        }
        Some(RawFeedItem {
            id: format!("{source}-{}", stable_hash(&format!("{title}{link}"))),
            source: source.to_string(),
            published_at: parse_datetime(self.published.trim(), now),
            title,
            url: link,
            text,
        })
    }
}

/// Reads `<item>` (RSS) and `<entry>` (Atom) elements, keeping at most 80.
/// A document that fails to parse yields nothing.
pub fn parse_feed(xml: &str, source: &str, now: DateTime<Utc>) -> Vec<RawFeedItem> {
    if xml.trim().is_empty() {
        return Vec::new();
    }
    match read_entries(xml) {
        Ok(entries) => entries
            .into_iter()
            .filter_map(|entry| entry.into_raw(source, now))
            .collect(),
        Err(err) => {
            tracing::warn!(source, error = %err, "feed is not valid XML");
            Vec::new()
        }
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

fn read_entries(xml: &str) -> Result<Vec<Entry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<Entry> = None;
    let mut field = Field::Skip;
    // elements opened inside the current field
    let mut nested = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match current.as_mut() {
                    None if is_entry(name.as_ref()) => current = Some(Entry::default()),
                    None => {}
                    Some(_) if field != Field::Skip || nested > 0 => nested += 1,
                    Some(entry) => {
                        field = entry.field_for(name.as_ref());
                        if field == Field::Link {
                            entry.take_href(&e);
                        }
                        if field == Field::Skip {
                            nested += 1;
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    if e.local_name().as_ref() == b"link" {
                        entry.take_href(&e);
                    }
                }
            }
            Event::Text(e) => {
                if let Some(buffer) = current.as_mut().and_then(|entry| entry.buffer(field)) {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    push_text(buffer, &text);
                }
            }
            Event::CData(e) => {
                if let Some(buffer) = current.as_mut().and_then(|entry| entry.buffer(field)) {
                    push_text(buffer, &String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => {
                if current.is_none() {
                    continue;
                }
                if nested > 0 {
                    nested -= 1;
                } else if field != Field::Skip {
                    field = Field::Skip;
                } else if is_entry(e.local_name().as_ref()) {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                    if entries.len() == MAX_ENTRIES_PER_FEED {
                        break;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(entries)
}

fn push_text(buffer: &mut String, text: &str) {
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(text);
}

/// Drops markup and entities from an HTML fragment.
pub fn html_to_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    let decoded = quick_xml::escape::unescape(&stripped)
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| stripped.into_owned());
    normalize_whitespace(&decoded)
}

/// RFC 2822 (RSS), then RFC 3339 (Atom), then a bare ISO timestamp taken as
/// UTC. Anything else falls back to `now`.
pub fn parse_datetime(value: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    if value.is_empty() {
        return now;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

const FALLBACK_SEED: &[(&str, &str, &str, &str, i64)] = &[
    (
        "news",
        "Nvidia leads AI stocks after upbeat guidance",
        "https://finance.yahoo.com",
        "Nvidia and other semiconductor leaders rallied after strong guidance and a surge in enterprise AI demand.",
        15,
    ),
    (
        "news",
        "Federal Reserve signals caution as inflation cools",
        "https://finance.yahoo.com",
        "Markets stayed mixed as the Fed highlighted ongoing inflation risks despite softer CPI prints.",
        37,
    ),
    (
        "news",
        "Apple supplier concerns pressure hardware outlook",
        "https://finance.yahoo.com",
        "Investors weighed weaker hardware demand and margin pressure, though service revenue remained resilient.",
        58,
    ),
    (
        "reddit",
        "$TSLA breakout or bull trap?",
        "https://reddit.com/r/wallstreetbets",
        "WSB traders debate whether Tesla momentum is a real breakout or a short-term squeeze before a pullback.",
        77,
    ),
    (
        "reddit",
        "Rotation into $MSFT and $AMZN",
        "https://reddit.com/r/wallstreetbets",
        "Comments show bullish rotation into mega-cap software as risk appetite improves.",
        94,
    ),
    (
        "reddit",
        "Bears circle regional banks",
        "https://reddit.com/r/wallstreetbets",
        "Posts mention rising credit losses and higher funding costs, keeping bank sentiment negative.",
        122,
    ),
];

/// Built-in items used when no feed produced anything.
pub fn fallback_items(now: DateTime<Utc>) -> Vec<RawFeedItem> {
    FALLBACK_SEED
        .iter()
        .map(|(source, title, url, text, minutes)| RawFeedItem {
            id: format!("fallback-{}", stable_hash(title)),
            source: source.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            published_at: now - Duration::minutes(*minutes),
            text: text.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 27, 12, 0, 0).unwrap()
    }

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Yahoo Finance</title>
  <item>
    <title>Nvidia  rallies on
      guidance</title>
    <link>https://finance.yahoo.com/a</link>
    <description>&lt;p&gt;Chipmakers &lt;b&gt;surge&lt;/b&gt; &amp;amp; more&lt;/p&gt;</description>
    <pubDate>Tue, 27 Jan 2026 10:30:00 +0000</pubDate>
  </item>
  <item>
    <title></title>
    <description><![CDATA[<div>Only a body</div>]]></description>
  </item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>wallstreetbets</title>
  <entry>
    <author><name>someone</name></author>
    <title>$TSLA breakout or bull trap?</title>
    <link href="https://reddit.com/r/wallstreetbets/1"/>
    <content type="html">&lt;div&gt;Tesla squeeze&lt;/div&gt;</content>
    <updated>2026-01-27T09:15:00+00:00</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let items = parse_feed(RSS, "news", now());
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "Nvidia rallies on guidance");
        assert_eq!(first.url, "https://finance.yahoo.com/a");
        assert_eq!(first.text, "Nvidia rallies on guidance. Chipmakers surge & more");
        assert_eq!(first.published_at, Utc.with_ymd_and_hms(2026, 1, 27, 10, 30, 0).unwrap());
        assert_eq!(
            first.id,
            format!("news-{}", stable_hash("Nvidia rallies on guidancehttps://finance.yahoo.com/a"))
        );

        let second = &items[1];
        assert_eq!(second.title, "Untitled");
        assert_eq!(second.text, "Untitled. Only a body");
        assert_eq!(second.published_at, now());
    }

    #[test]
    fn parses_atom_entries_with_href_links() {
        let items = parse_feed(ATOM, "reddit", now());
        assert_eq!(items.len(), 1);
        let entry = &items[0];
        assert_eq!(entry.source, "reddit");
        assert_eq!(entry.title, "$TSLA breakout or bull trap?");
        assert_eq!(entry.url, "https://reddit.com/r/wallstreetbets/1");
        assert_eq!(entry.text, "$TSLA breakout or bull trap?. Tesla squeeze");
        assert_eq!(entry.published_at, Utc.with_ymd_and_hms(2026, 1, 27, 9, 15, 0).unwrap());
    }

    #[test]
    fn broken_or_empty_documents_yield_nothing() {
        assert!(parse_feed("", "news", now()).is_empty());
        assert!(parse_feed("<rss><item><title>x</item></rss>", "news", now()).is_empty());
    }

    #[test]
    fn keeps_at_most_eighty_entries() {
        let body: String = (0..90)
            .map(|i| format!("<item><title>Story {i}</title></item>"))
            .collect();
        let xml = format!("<rss><channel>{body}</channel></rss>");
        assert_eq!(parse_feed(&xml, "news", now()).len(), MAX_ENTRIES_PER_FEED);
    }

    #[test]
    fn datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 27, 8, 0, 0).unwrap();
        assert_eq!(parse_datetime("Tue, 27 Jan 2026 09:00:00 +0100", now()), expected);
        assert_eq!(parse_datetime("2026-01-27T08:00:00Z", now()), expected);
        assert_eq!(parse_datetime("2026-01-27T08:00:00", now()), expected);
        assert_eq!(parse_datetime("yesterday", now()), now());
        assert_eq!(parse_datetime("", now()), now());
    }

    #[test]
    fn html_is_flattened() {
        assert_eq!(html_to_text("<p>Rates&amp;<i>bonds</i></p>\n  slip"), "Rates& bonds slip");
    }

    #[test]
    fn fallback_items_are_dated_back_from_now() {
        let items = fallback_items(now());
        assert_eq!(items.len(), 6);
        assert_eq!(items[0].published_at, now() - Duration::minutes(15));
        assert_eq!(items[5].source, "reddit");
        assert!(items.iter().all(|i| i.id.starts_with("fallback-")));
    }

    #[tokio::test]
    async fn failed_fetch_yields_an_empty_body() {
        use wiremock::matchers::{header_exists, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let body = fetch_feed_xml(&http, &format!("{}/rss", server.uri())).await;
        assert_eq!(body, RSS);
        assert!(fetch_feed_xml(&http, &format!("{}/missing", server.uri())).await.is_empty());
    }
}
