//! RSS 2.0 and Atom feed source.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::text::parse_timestamp;
use crate::{
    ParserKind, Record, RecordExtras, RecordKind, RequestTemplate, Result, SearchError,
    SearchQuery, SourceAdapter, SourceCategory, SourceConfig,
};

/// Entries taken from one feed when `max_items` is unset.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// One `<item>` or `<entry>` as read from the document.
#[derive(Debug, Default, Clone, PartialEq)]
struct FeedEntry {
    title: String,
    link: String,
    content: String,
    summary: String,
    author: String,
    published: Option<String>,
    updated: Option<String>,
    categories: Vec<String>,
}

impl FeedEntry {
    fn body(&self) -> &str {
        if self.content.trim().is_empty() {
            &self.summary
        } else {
            &self.content
        }
    }

    fn timestamp(&self) -> Option<&str> {
        self.published.as_deref().or(self.updated.as_deref())
    }
}

/// A syndication feed, polled through the shared fetcher.
pub struct Feed {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl Feed {
    /// Creates the Google News search feed.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(Self::default_config(), fetcher)
    }

    /// Default source configuration: Google News RSS search.
    pub fn default_config() -> SourceConfig {
        SourceConfig::new(
            "google_news",
            ParserKind::Feed,
            RequestTemplate::new("https://news.google.com/rss/search")
                .with_param("q", "{query}")
                .with_param("hl", "{language}"),
        )
        .with_name("Google News")
        .with_categories(vec![SourceCategory::News])
        .with_weight(1.0)
    }

    /// Creates with custom configuration.
    pub fn with_config(config: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let fetcher = PacedFetcher::new(fetcher, config.min_interval());
        Self { config, fetcher }
    }

    fn record_kind(&self) -> RecordKind {
        if self.config.categories.contains(&SourceCategory::News) {
            RecordKind::News
        } else {
            RecordKind::Feed
        }
    }

    fn parse_results(&self, xml: &str) -> Result<Vec<Record>> {
        let entries = parse_feed(xml)?;
        let max_items = self.config.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
        let kind = self.record_kind();

        let records = entries
            .into_iter()
            .filter(|entry| !entry.link.trim().is_empty())
            .take(max_items)
            .map(|entry| {
                let published = entry.timestamp().and_then(parse_timestamp);
                let extras = RecordExtras {
                    author: Some(entry.author.trim().to_string()).filter(|a| !a.is_empty()),
                    tags: entry.categories.clone(),
                    ..Default::default()
                };
                Record::new(entry.link.as_str(), &entry.title, entry.body())
                    .with_source(&self.config.id)
                    .with_kind(kind)
                    .with_published(published)
                    .with_extras(extras)
            })
            .collect();

        Ok(records)
    }
}

#[async_trait]
impl SourceAdapter for Feed {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let url = self.config.request.render(query)?;
        let body = self.fetcher.fetch(&PageRequest::get(url)).await?;
        self.parse_results(&body)
    }
}

fn is_entry(name: &str) -> bool {
    name == "item" || name == "entry"
}

fn name_of(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(Cow::into_owned))
}

/// Applies attribute-carried values (Atom links and category terms).
fn apply_attributes(entry: &mut FeedEntry, name: &str, element: &BytesStart<'_>) {
    match name {
        "link" => {
            let rel = attribute(element, "rel");
            if entry.link.is_empty() && matches!(rel.as_deref(), None | Some("alternate")) {
                if let Some(href) = attribute(element, "href") {
                    entry.link = href;
                }
            }
        }
        "category" => {
            if let Some(term) = attribute(element, "term") {
                entry.categories.push(term);
            }
        }
        _ => {}
    }
}

/// Applies character data to the field named by the innermost open element.
fn apply_text(entry: &mut FeedEntry, path: &[String], text: &str) {
    let Some(field) = path.last() else {
        return;
    };
    let parent = path.len().checked_sub(2).and_then(|i| path.get(i));
    let in_entry = parent.is_some_and(|p| is_entry(p));

    match field.as_str() {
        "name" if parent.is_some_and(|p| p == "author") => entry.author.push_str(text),
        _ if !in_entry => {}
        "title" => entry.title.push_str(text),
        "link" if entry.link.is_empty() => entry.link = text.trim().to_string(),
        "description" | "summary" => entry.summary.push_str(text),
        "encoded" | "content" => entry.content.push_str(text),
        "author" | "creator" => entry.author.push_str(text),
        "pubDate" | "published" | "date" => entry.published = Some(text.trim().to_string()),
        "updated" => entry.updated = Some(text.trim().to_string()),
        "category" => entry.categories.push(text.trim().to_string()),
        _ => {}
    }
}

/// Reads every entry of an RSS 2.0, RSS 1.0 or Atom document.
fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut path: Vec<String> = Vec::new();
    let mut root: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            SearchError::Parse(format!(
                "Invalid feed XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(element) | Event::Empty(element) if root.is_none() => {
                let name = name_of(element.local_name().as_ref());
                if !matches!(name.as_str(), "rss" | "feed" | "RDF") {
                    return Err(SearchError::Parse(format!(
                        "Unexpected root element <{}>, expected an RSS or Atom feed",
                        name
                    )));
                }
                root = Some(name.clone());
                path.push(name);
            }
            Event::Start(element) => {
                let name = name_of(element.local_name().as_ref());
                if is_entry(&name) {
                    current = Some(FeedEntry::default());
                } else if let Some(entry) = current.as_mut() {
                    if path.last().is_some_and(|p| is_entry(p)) {
                        apply_attributes(entry, &name, &element);
                    }
                }
                path.push(name);
            }
            Event::Empty(element) => {
                let name = name_of(element.local_name().as_ref());
                if let Some(entry) = current.as_mut() {
                    if path.last().is_some_and(|p| is_entry(p)) {
                        apply_attributes(entry, &name, &element);
                    }
                }
            }
            Event::Text(text) => {
                if let Some(entry) = current.as_mut() {
                    let value = text
                        .unescape()
                        .map(Cow::into_owned)
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    apply_text(entry, &path, &value);
                }
            }
            Event::CData(data) => {
                if let Some(entry) = current.as_mut() {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    apply_text(entry, &path, &value);
                }
            }
            Event::End(element) => {
                let name = name_of(element.local_name().as_ref());
                path.pop();
                if is_entry(&name) {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match root {
        Some(root) => {
            debug!("Parsed {} entries from <{}> document", entries.len(), root);
            Ok(entries)
        }
        None => Err(SearchError::Parse("Empty feed document".to_string())),
    }
}
