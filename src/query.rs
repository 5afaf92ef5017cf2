//! Search query representation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, SearchError, SourceCategory};

/// Safe search level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    /// No filtering.
    #[default]
    Off = 0,
    /// Moderate filtering.
    Moderate = 1,
    /// Strict filtering.
    Strict = 2,
}

impl FromStr for SafeSearch {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" => Ok(SafeSearch::Off),
            "moderate" | "1" => Ok(SafeSearch::Moderate),
            "strict" | "2" => Ok(SafeSearch::Strict),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown safe search level '{other}'"
            ))),
        }
    }
}

/// Time range filter for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    /// Returns the lowercase name (`day`, `week`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
        }
    }
}

impl FromStr for TimeRange {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "year" => Ok(TimeRange::Year),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown time range '{other}'"
            ))),
        }
    }
}

/// A search query with all parameters.
///
/// Built once by the caller and shared read-only with every source adapter
/// for the duration of one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search terms.
    pub query: String,
    /// Target categories.
    pub categories: Vec<SourceCategory>,
    /// Language/locale (e.g., "en-US").
    pub language: Option<String>,
    /// Safe search level.
    pub safesearch: SafeSearch,
    /// Page number (1-indexed).
    pub page: u32,
    /// Time range filter.
    pub time_range: Option<TimeRange>,
    /// Specific sources to use (by id). Overrides category selection when set.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl SearchQuery {
    /// Creates a new search query with the given terms.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            categories: vec![SourceCategory::General],
            language: None,
            safesearch: SafeSearch::Off,
            page: 1,
            time_range: None,
            sources: Vec::new(),
        }
    }

    /// Creates a query without search terms, used to collect from
    /// feed-like sources of the given categories.
    pub fn collection(categories: Vec<SourceCategory>) -> Self {
        Self::new("").with_categories(categories)
    }

    /// Sets the categories to search. An empty list keeps the general category.
    pub fn with_categories(mut self, categories: Vec<SourceCategory>) -> Self {
        let mut unique = Vec::with_capacity(categories.len());
        for category in categories {
            if !unique.contains(&category) {
                unique.push(category);
            }
        }
        if unique.is_empty() {
            unique.push(SourceCategory::General);
        }
        self.categories = unique;
        self
    }

    /// Sets the language/locale.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the safe search level.
    pub fn with_safesearch(mut self, level: SafeSearch) -> Self {
        self.safesearch = level;
        self
    }

    /// Sets the page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the time range filter.
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// Restricts the search to specific source ids.
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Categories to resolve; falls back to general when none were given.
    pub fn effective_categories(&self) -> Vec<SourceCategory> {
        if self.categories.is_empty() {
            vec![SourceCategory::General]
        } else {
            self.categories.clone()
        }
    }

    /// Language tag used when building requests, `"en"` when unset.
    pub fn language_or_default(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .unwrap_or("en")
    }

    /// Result offset of the first item on the requested page, for
    /// sources paging in steps of `per_page`.
    pub fn offset(&self, per_page: u32) -> u32 {
        self.page.saturating_sub(1) * per_page
    }

    /// Rejects malformed input before any source is contacted.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("Query cannot be empty".into()));
        }
        if self.page == 0 {
            return Err(SearchError::InvalidQuery("Page numbers start at 1".into()));
        }
        Ok(())
    }
}
