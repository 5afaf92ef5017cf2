//! Source adapter trait and configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Record, Result, SearchError, SearchQuery};

/// Categories a source can belong to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    #[default]
    General,
    Images,
    Videos,
    News,
    Code,
    Discussion,
    Feeds,
    Custom,
    /// Any category name this build does not know; no source belongs to it.
    #[serde(other)]
    Unknown,
}

impl SourceCategory {
    /// Every category, in display order.
    pub const ALL: [SourceCategory; 8] = [
        SourceCategory::General,
        SourceCategory::Images,
        SourceCategory::Videos,
        SourceCategory::News,
        SourceCategory::Code,
        SourceCategory::Discussion,
        SourceCategory::Feeds,
        SourceCategory::Custom,
    ];

    /// Returns the lowercase category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::General => "general",
            SourceCategory::Images => "images",
            SourceCategory::Videos => "videos",
            SourceCategory::News => "news",
            SourceCategory::Code => "code",
            SourceCategory::Discussion => "discussion",
            SourceCategory::Feeds => "feeds",
            SourceCategory::Custom => "custom",
            SourceCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceCategory {
    type Err = SearchError;

    /// Unrecognized names map to [`SourceCategory::Unknown`], which
    /// resolves to no sources.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Ok(SourceCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .unwrap_or(SourceCategory::Unknown))
    }
}

/// Identifies which adapter logic handles a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// Google HTML results.
    Google,
    /// Brave HTML results.
    Brave,
    /// DuckDuckGo HTML results.
    #[serde(rename = "duckduckgo")]
    DuckDuckGo,
    /// Bing HTML results.
    Bing,
    /// SearXNG-compatible JSON search backend.
    Searx,
    /// RSS 2.0 or Atom feed.
    Feed,
    /// GitHub repository releases.
    GithubReleases,
    /// GitHub repository open issues.
    GithubIssues,
    /// Reddit listing JSON.
    Reddit,
    /// Arbitrary HTML page scraped with configured selectors.
    CustomPage,
}

impl ParserKind {
    /// Whether this parser scrapes markup rather than calling a stable API.
    pub fn is_markup(&self) -> bool {
        matches!(
            self,
            ParserKind::Google
                | ParserKind::Brave
                | ParserKind::DuckDuckGo
                | ParserKind::Bing
                | ParserKind::CustomPage
        )
    }
}

/// How a query is turned into a source-specific request URL.
///
/// The URL and parameter values may contain `{query}`, `{page}`, `{offset}`
/// and `{language}` placeholders. Query text is percent-encoded when it is
/// substituted into the URL itself; parameter values are encoded on append.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Base URL of the request.
    pub url: String,
    /// Query parameters appended to the URL.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl RequestTemplate {
    /// Creates a template for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Renders the template for a query.
    pub fn render(&self, query: &SearchQuery) -> Result<Url> {
        let page = query.page.max(1).to_string();
        let offset = query.offset(10).to_string();
        let language = query.language_or_default();
        let encoded = urlencoding::encode(&query.query);

        let fill = |template: &str, terms: &str| {
            fill_placeholders(template, |name| match name {
                "query" => Some(terms),
                "page" => Some(page.as_str()),
                "offset" => Some(offset.as_str()),
                "language" => Some(language),
                _ => None,
            })
        };

        let mut url = Url::parse(&fill(&self.url, &encoded))?;
        if !self.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, &fill(value, &query.query));
            }
        }
        Ok(url)
    }
}

/// Replaces `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, so placeholder syntax inside
/// the search terms reaches the source unchanged. Unknown names are kept.
fn fill_placeholders<'a>(template: &str, value: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail.find('}').and_then(|close| value(&tail[1..close]).map(|v| (close, v))) {
            Some((close, substituted)) => {
                out.push_str(substituted);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// CSS selectors for the custom page family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    /// Selector for one item block.
    #[serde(default = "default_item_selector")]
    pub item: String,
    /// Selector for the title, relative to the item.
    #[serde(default)]
    pub title: Option<String>,
    /// Selector for the content excerpt, relative to the item.
    #[serde(default)]
    pub content: Option<String>,
    /// Selector for the link element (its `href` is used), relative to the item.
    #[serde(default)]
    pub url: Option<String>,
}

fn default_item_selector() -> String {
    "article".to_string()
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            item: default_item_selector(),
            title: None,
            content: None,
            url: None,
        }
    }
}

/// Configuration for one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique identifier within the registry.
    pub id: String,
    /// Display name; the id is used when empty.
    #[serde(default)]
    pub name: String,
    /// Categories this source belongs to.
    #[serde(default = "default_categories")]
    pub categories: Vec<SourceCategory>,
    /// Adapter logic used for this source.
    pub parser: ParserKind,
    /// Request template.
    pub request: RequestTemplate,
    /// Weight for ranking (higher = more influence).
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Minimum delay between two requests to this source, in milliseconds.
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
    /// Per-source timeout in milliseconds; the dispatcher default applies when unset.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Whether the source is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Whether pagination is supported.
    #[serde(default)]
    pub paging: bool,
    /// Upper bound on records taken from one response.
    #[serde(default)]
    pub max_items: Option<usize>,
    /// Selectors for the custom page family.
    #[serde(default)]
    pub selectors: Option<SelectorSet>,
    /// API token, sent by adapters that support authentication.
    #[serde(default)]
    pub token: Option<String>,
    /// Keep pinned discussion posts.
    #[serde(default)]
    pub include_stickied: bool,
}

fn default_categories() -> Vec<SourceCategory> {
    vec![SourceCategory::General]
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    /// Creates a configuration with defaults for everything but identity,
    /// parser and request.
    pub fn new(id: impl Into<String>, parser: ParserKind, request: RequestTemplate) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            categories: default_categories(),
            parser,
            request,
            weight: default_weight(),
            min_interval_ms: None,
            timeout_ms: None,
            enabled: default_enabled(),
            paging: false,
            max_items: None,
            selectors: None,
            token: None,
            include_stickied: false,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the categories.
    pub fn with_categories(mut self, categories: Vec<SourceCategory>) -> Self {
        self.categories = categories;
        self
    }

    /// Sets the ranking weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the politeness interval.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Sets the per-source timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Marks the source as supporting pagination.
    pub fn with_paging(mut self, paging: bool) -> Self {
        self.paging = paging;
        self
    }

    /// Sets the per-response item cap.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Sets the custom page selectors.
    pub fn with_selectors(mut self, selectors: SelectorSet) -> Self {
        self.selectors = Some(selectors);
        self
    }

    /// Enables or disables the source.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Politeness interval, if any.
    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Per-source timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Checks invariants that deserialization alone cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SearchError::Config("source id cannot be empty".into()));
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(SearchError::Config(format!(
                "source '{}' must have a positive weight",
                self.id
            )));
        }
        if self.categories.is_empty() {
            return Err(SearchError::Config(format!(
                "source '{}' must belong to at least one category",
                self.id
            )));
        }
        if self.categories.contains(&SourceCategory::Unknown) {
            return Err(SearchError::Config(format!(
                "source '{}' lists an unknown category",
                self.id
            )));
        }
        if self.parser == ParserKind::CustomPage && self.selectors.is_none() {
            return Err(SearchError::Config(format!(
                "custom page source '{}' needs a selector set",
                self.id
            )));
        }
        Ok(())
    }
}

/// Trait implemented by every source adapter.
///
/// An adapter turns a query into zero or more [`Record`]s. Failures are
/// returned as errors and converted into a per-source outcome by the
/// dispatcher; they never reach the caller of a search.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Returns the source configuration.
    fn config(&self) -> &SourceConfig;

    /// Queries the source and returns normalized records.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>>;

    /// Returns the source id.
    fn id(&self) -> &str {
        &self.config().id
    }

    /// Returns the ranking weight.
    fn weight(&self) -> f64 {
        self.config().weight
    }

    /// Returns the categories this source belongs to.
    fn categories(&self) -> &[SourceCategory] {
        &self.config().categories
    }

    /// Returns whether the source is enabled.
    fn is_enabled(&self) -> bool {
        self.config().enabled
    }

    /// Returns the per-source timeout, if configured.
    fn timeout(&self) -> Option<Duration> {
        self.config().timeout()
    }
}
