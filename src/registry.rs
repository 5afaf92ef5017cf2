//! Read-only catalog of source adapters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters;
use crate::config::EngineSettings;
use crate::fetcher::PageFetcher;
use crate::{Result, SearchError, SearchQuery, SourceAdapter, SourceCategory};

/// Adapters indexed by category and by id.
///
/// Built once and never mutated; share it behind an `Arc`.
#[derive(Default)]
pub struct Registry {
    sources: Vec<Arc<dyn SourceAdapter>>,
    by_category: HashMap<SourceCategory, Vec<usize>>,
    by_id: HashMap<String, usize>,
}

impl Registry {
    /// Creates a registry from ready-made adapters, keeping their order.
    pub fn from_adapters(sources: Vec<Arc<dyn SourceAdapter>>) -> Result<Self> {
        let mut by_category: HashMap<SourceCategory, Vec<usize>> = HashMap::new();
        let mut by_id = HashMap::new();

        for (index, source) in sources.iter().enumerate() {
            if by_id.insert(source.id().to_string(), index).is_some() {
                return Err(SearchError::Config(format!(
                    "duplicate source id '{}'",
                    source.id()
                )));
            }
            for category in source.categories() {
                if *category == SourceCategory::Unknown {
                    continue;
                }
                let slots = by_category.entry(*category).or_default();
                if !slots.contains(&index) {
                    slots.push(index);
                }
            }
        }

        Ok(Self {
            sources,
            by_category,
            by_id,
        })
    }

    /// Builds every configured source on top of a shared fetcher.
    pub fn from_settings(settings: &EngineSettings, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        settings.validate()?;
        let sources = settings
            .sources
            .iter()
            .cloned()
            .map(|config| adapters::build(config, Arc::clone(&fetcher)))
            .collect::<Result<Vec<_>>>()?;

        let registry = Self::from_adapters(sources)?;
        info!(
            "Loaded {} sources across {} categories",
            registry.len(),
            registry.by_category.len()
        );
        Ok(registry)
    }

    /// Sources of one category in registration order; empty when none exist.
    pub fn by_category(&self, category: SourceCategory) -> Vec<Arc<dyn SourceAdapter>> {
        self.by_category
            .get(&category)
            .map(|slots| slots.iter().map(|&i| Arc::clone(&self.sources[i])).collect())
            .unwrap_or_default()
    }

    /// Looks up a source by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.by_id.get(id).map(|&i| Arc::clone(&self.sources[i]))
    }

    /// Resolves the enabled sources a query should reach.
    ///
    /// Explicit source ids take precedence over categories. Otherwise the
    /// categories are walked in the query's order and their sources are
    /// unioned, each source appearing once at its first position.
    pub fn resolve(&self, query: &SearchQuery) -> Vec<Arc<dyn SourceAdapter>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        let candidates: Vec<usize> = if query.sources.is_empty() {
            query
                .effective_categories()
                .iter()
                .filter_map(|category| self.by_category.get(category))
                .flatten()
                .copied()
                .collect()
        } else {
            query
                .sources
                .iter()
                .filter_map(|id| self.by_id.get(id.as_str()))
                .copied()
                .collect()
        };

        for index in candidates {
            let source = &self.sources[index];
            if source.is_enabled() && seen.insert(index) {
                resolved.push(Arc::clone(source));
            }
        }

        debug!(
            "Resolved {} sources for categories {:?}",
            resolved.len(),
            query.effective_categories()
        );
        resolved
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no source is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All sources in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SourceAdapter>> {
        self.sources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;
    use crate::{ParserKind, Record, RequestTemplate, SourceConfig};
    use async_trait::async_trait;

    struct Named {
        config: SourceConfig,
    }

    #[async_trait]
    impl SourceAdapter for Named {
        fn config(&self) -> &SourceConfig {
            &self.config
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }
    }

    fn named(id: &str, categories: Vec<SourceCategory>) -> Arc<dyn SourceAdapter> {
        Arc::new(Named {
            config: SourceConfig::new(id, ParserKind::Searx, RequestTemplate::new("https://a.com"))
                .with_categories(categories),
        })
    }

    fn ids(sources: &[Arc<dyn SourceAdapter>]) -> Vec<&str> {
        sources.iter().map(|s| s.id()).collect()
    }

    fn registry() -> Registry {
        Registry::from_adapters(vec![
            named("g1", vec![SourceCategory::General]),
            named("g2", vec![SourceCategory::General, SourceCategory::News]),
            named("n1", vec![SourceCategory::News]),
            named("c1", vec![SourceCategory::Code]),
        ])
        .unwrap()
    }

    #[test]
    fn test_by_category() {
        let registry = registry();
        assert_eq!(ids(&registry.by_category(SourceCategory::News)), vec!["g2", "n1"]);
        assert!(registry.by_category(SourceCategory::Images).is_empty());
    }

    #[test]
    fn test_get_by_id() {
        let registry = registry();
        assert_eq!(registry.get("c1").map(|s| s.id().to_string()), Some("c1".into()));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 4);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_resolve_unions_without_duplicates() {
        let registry = registry();
        let query = SearchQuery::new("q")
            .with_categories(vec![SourceCategory::General, SourceCategory::News]);
        assert_eq!(ids(&registry.resolve(&query)), vec!["g1", "g2", "n1"]);
    }

    #[test]
    fn test_resolve_empty_category() {
        let registry = registry();
        let query = SearchQuery::new("q").with_categories(vec![SourceCategory::Videos]);
        assert!(registry.resolve(&query).is_empty());
    }

    #[test]
    fn test_resolve_unknown_category() {
        let registry = registry();
        let query = SearchQuery::new("q").with_categories(vec![
            SourceCategory::General,
            "shopping".parse().unwrap(),
        ]);
        assert_eq!(ids(&registry.resolve(&query)), vec!["g1", "g2"]);

        let query = SearchQuery::new("q").with_categories(vec![SourceCategory::Unknown]);
        assert!(registry.resolve(&query).is_empty());
        assert!(registry.by_category(SourceCategory::Unknown).is_empty());
    }

    #[test]
    fn test_resolve_explicit_sources() {
        let registry = registry();
        let query = SearchQuery::new("q").with_sources(vec![
            "c1".to_string(),
            "unknown".to_string(),
            "g1".to_string(),
            "c1".to_string(),
        ]);
        assert_eq!(ids(&registry.resolve(&query)), vec!["c1", "g1"]);
    }

    #[test]
    fn test_resolve_skips_disabled() {
        let disabled: Arc<dyn SourceAdapter> = Arc::new(Named {
            config: SourceConfig::new("off", ParserKind::Searx, RequestTemplate::new("https://a.com"))
                .with_enabled(false),
        });
        let registry = Registry::from_adapters(vec![disabled, named("on", vec![SourceCategory::General])])
            .unwrap();
        assert_eq!(ids(&registry.resolve(&SearchQuery::new("q"))), vec!["on"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Registry::from_adapters(vec![
            named("a", vec![SourceCategory::General]),
            named("a", vec![SourceCategory::News]),
        ]);
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[test]
    fn test_from_default_settings() {
        let registry =
            Registry::from_settings(&EngineSettings::default(), StaticFetcher::new("")).unwrap();
        assert_eq!(registry.len(), 8);
        assert_eq!(
            ids(&registry.by_category(SourceCategory::General)),
            vec!["google", "brave", "duckduckgo", "bing", "searx"]
        );
        assert_eq!(ids(&registry.by_category(SourceCategory::News)), vec!["google_news"]);
    }
}
