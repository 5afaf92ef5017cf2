//! Engine settings loaded from TOML.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::{Bing, Brave, DuckDuckGo, Feed, Google, Searx};
use crate::{Result, SearchError, SourceCategory, SourceConfig};

/// Records kept after ranking when not configured.
pub const DEFAULT_MAX_RESULTS: usize = 20;
/// Per-source timeout when neither the settings nor the source set one.
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 10_000;
/// Overall deadline for one search call.
pub const DEFAULT_DEADLINE_MS: u64 = 15_000;

/// Settings for one engine instance.
///
/// Every field is optional in the file. When `sources` is omitted the
/// built-in catalog is used; when present it replaces the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Records kept after ranking.
    pub max_results: usize,
    /// Default per-source timeout in milliseconds.
    pub source_timeout_ms: u64,
    /// Overall deadline for one call in milliseconds.
    pub deadline_ms: u64,
    /// User agent sent by the HTTP fetcher.
    pub user_agent: Option<String>,
    /// Configured sources.
    pub sources: Vec<SourceConfig>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            source_timeout_ms: DEFAULT_SOURCE_TIMEOUT_MS,
            deadline_ms: DEFAULT_DEADLINE_MS,
            user_agent: None,
            sources: default_catalog(),
        }
    }
}

/// Built-in catalog: four web engines and a local SearXNG instance for the
/// general category, SearXNG for images and videos, Google News for news.
pub fn default_catalog() -> Vec<SourceConfig> {
    vec![
        Google::default_config(),
        Brave::default_config(),
        DuckDuckGo::default_config(),
        Bing::default_config(),
        Searx::default_config(),
        Searx::category_config("searx-images", SourceCategory::Images),
        Searx::category_config("searx-videos", SourceCategory::Videos),
        Feed::default_config(),
    ]
}

impl EngineSettings {
    /// Parses settings from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| SearchError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the file cannot be read, parsed or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serializes the settings back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SearchError::Config(e.to_string()))
    }

    /// Default per-source timeout.
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Overall deadline for one call.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Checks limits and every source, and rejects duplicate ids.
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(SearchError::Config("max_results must be at least 1".into()));
        }
        if self.source_timeout_ms == 0 || self.deadline_ms == 0 {
            return Err(SearchError::Config("timeouts must be positive".into()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.id.as_str()) {
                return Err(SearchError::Config(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParserKind;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_results, 20);
        assert_eq!(settings.source_timeout(), Duration::from_secs(10));
        assert_eq!(settings.deadline(), Duration::from_secs(15));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_catalog_categories() {
        let catalog = default_catalog();
        let in_category = |category: SourceCategory| {
            catalog
                .iter()
                .filter(|s| s.categories.contains(&category))
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(
            in_category(SourceCategory::General),
            vec!["google", "brave", "duckduckgo", "bing", "searx"]
        );
        assert_eq!(in_category(SourceCategory::Images), vec!["searx-images"]);
        assert_eq!(in_category(SourceCategory::Videos), vec!["searx-videos"]);
        assert_eq!(in_category(SourceCategory::News), vec!["google_news"]);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings = EngineSettings::from_toml_str("").unwrap();
        assert_eq!(settings.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(settings.sources.len(), default_catalog().len());
    }

    #[test]
    fn test_sources_replace_catalog() {
        let settings = EngineSettings::from_toml_str(
            r#"
            max_results = 5
            deadline_ms = 2000

            [[sources]]
            id = "rust-blog"
            parser = "feed"
            categories = ["feeds"]
            max_items = 3
            [sources.request]
            url = "https://blog.rust-lang.org/feed.xml"

            [[sources]]
            id = "twir"
            parser = "custom_page"
            categories = ["custom"]
            weight = 0.5
            [sources.request]
            url = "https://this-week-in-rust.org/"
            [sources.selectors]
            item = "div.post"
            title = "h2"
            "#,
        )
        .unwrap();

        assert_eq!(settings.max_results, 5);
        assert_eq!(settings.deadline(), Duration::from_secs(2));
        assert_eq!(settings.source_timeout_ms, DEFAULT_SOURCE_TIMEOUT_MS);
        assert_eq!(settings.sources.len(), 2);
        assert_eq!(settings.sources[0].parser, ParserKind::Feed);
        assert_eq!(settings.sources[0].max_items, Some(3));
        assert_eq!(settings.sources[1].weight, 0.5);
        assert_eq!(
            settings.sources[1].selectors.as_ref().map(|s| s.item.as_str()),
            Some("div.post")
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut settings = EngineSettings::default();
        settings.sources.push(Google::default_config());
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate source id 'google'"));
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let settings = EngineSettings {
            max_results: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        assert!(EngineSettings::from_toml_str("deadline_ms = 0").is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EngineSettings::from_toml_str("max_results = \"many\"").unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_custom_page_without_selectors_rejected() {
        let err = EngineSettings::from_toml_str(
            r#"
            [[sources]]
            id = "page"
            parser = "custom_page"
            [sources.request]
            url = "https://example.com"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineSettings::load(Path::new("/nonexistent/center-search.toml")).unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let settings = EngineSettings::default();
        let text = settings.to_toml_string().unwrap();
        let loaded = EngineSettings::from_toml_str(&text).unwrap();
        assert_eq!(loaded.sources.len(), settings.sources.len());
        assert_eq!(loaded.sources[0].id, "google");
    }
}
