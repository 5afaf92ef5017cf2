//! Arbitrary HTML pages scraped with configured selectors.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::{first_text, selector};
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::{
    Record, RecordExtras, RecordKind, Result, SearchError, SearchQuery, SourceAdapter,
    SourceConfig,
};

/// Items taken from one page when `max_items` is unset.
pub const DEFAULT_MAX_ITEMS: usize = 10;

struct CompiledSelectors {
    item: Selector,
    title: Option<Selector>,
    content: Option<Selector>,
    url: Option<Selector>,
}

/// A page whose items are located by CSS selectors.
pub struct CustomPage {
    config: SourceConfig,
    fetcher: PacedFetcher,
    selectors: CompiledSelectors,
}

impl CustomPage {
    /// Creates the adapter, compiling the configured selectors.
    pub fn with_config(config: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let set = config.selectors.as_ref().ok_or_else(|| {
            SearchError::Config(format!(
                "custom page source '{}' needs a selector set",
                config.id
            ))
        })?;
        let optional = |css: &Option<String>| css.as_deref().map(selector).transpose();
        let selectors = CompiledSelectors {
            item: selector(&set.item)?,
            title: optional(&set.title)?,
            content: optional(&set.content)?,
            url: optional(&set.url)?,
        };

        let fetcher = PacedFetcher::new(fetcher, config.min_interval());
        Ok(Self {
            config,
            fetcher,
            selectors,
        })
    }

    fn parse_results(&self, html: &str, page: &Url) -> Vec<Record> {
        let document = Html::parse_document(html);
        let max_items = self.config.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
        let domain = page.host_str().map(str::to_string);

        let mut results = Vec::new();

        for item in document.select(&self.selectors.item).take(max_items) {
            let title = self
                .selectors
                .title
                .as_ref()
                .map(|s| first_text(item, s))
                .unwrap_or_default();
            let content = self
                .selectors
                .content
                .as_ref()
                .map(|s| first_text(item, s))
                .unwrap_or_default();

            if title.is_empty() && content.is_empty() {
                continue;
            }

            let link = self
                .selectors
                .url
                .as_ref()
                .and_then(|s| item.select(s).next())
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page.join(href.trim()).ok())
                .unwrap_or_else(|| page.clone());

            let extras = RecordExtras {
                domain: domain.clone(),
                ..Default::default()
            };
            results.push(
                Record::new(link.as_str(), &title, &content)
                    .with_source(&self.config.id)
                    .with_kind(RecordKind::Page)
                    .with_extras(extras),
            );
        }

        results
    }
}

#[async_trait]
impl SourceAdapter for CustomPage {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let page = self.config.request.render(query)?;
        let html = self.fetcher.fetch(&PageRequest::get(page.clone())).await?;
        Ok(self.parse_results(&html, &page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;
    use crate::{ParserKind, RequestTemplate, SelectorSet, SourceCategory};

    const PAGE: &str = r#"
        <html><body>
            <div class="post">
                <h2>This Week in Rust 550</h2>
                <p class="excerpt">Hello and welcome to another issue</p>
                <a class="more" href="/blog/twir-550/">Read more</a>
            </div>
            <div class="post">
                <h2>Absolute link</h2>
                <a class="more" href="https://other.example.org/post">Read more</a>
            </div>
            <div class="post">
                <p class="excerpt">No heading or link</p>
            </div>
            <div class="post"><span>nothing useful</span></div>
        </body></html>
    "#;

    fn config(max_items: Option<usize>) -> SourceConfig {
        let mut config = SourceConfig::new(
            "twir",
            ParserKind::CustomPage,
            RequestTemplate::new("https://this-week-in-rust.org/"),
        )
        .with_categories(vec![SourceCategory::Custom])
        .with_selectors(SelectorSet {
            item: "div.post".into(),
            title: Some("h2".into()),
            content: Some(".excerpt".into()),
            url: Some("a.more".into()),
        });
        config.max_items = max_items;
        config
    }

    fn page() -> Url {
        Url::parse("https://this-week-in-rust.org/").unwrap()
    }

    #[test]
    fn test_with_config_requires_selectors() {
        let mut missing = config(None);
        missing.selectors = None;
        assert!(CustomPage::with_config(missing, StaticFetcher::new("")).is_err());
    }

    #[test]
    fn test_with_config_rejects_bad_selector() {
        let mut bad = config(None);
        if let Some(set) = bad.selectors.as_mut() {
            set.title = Some("h2[[".into());
        }
        let err = CustomPage::with_config(bad, StaticFetcher::new("")).err().unwrap();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn test_parse_resolves_links_and_skips_empty_items() {
        let adapter = CustomPage::with_config(config(None), StaticFetcher::new("")).unwrap();
        let records = adapter.parse_results(PAGE, &page());
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].url, "https://this-week-in-rust.org/blog/twir-550/");
        assert_eq!(records[0].title, "This Week in Rust 550");
        assert_eq!(records[0].content, "Hello and welcome to another issue");
        assert_eq!(records[0].kind, RecordKind::Page);
        assert_eq!(
            records[0].extras.domain.as_deref(),
            Some("this-week-in-rust.org")
        );

        assert_eq!(records[1].url, "https://other.example.org/post");
        assert!(records[1].content.is_empty());

        assert_eq!(records[2].url, "https://this-week-in-rust.org/");
        assert!(records[2].title.is_empty());
    }

    #[test]
    fn test_parse_respects_max_items() {
        let adapter = CustomPage::with_config(config(Some(1)), StaticFetcher::new("")).unwrap();
        assert_eq!(adapter.parse_results(PAGE, &page()).len(), 1);
    }

    #[test]
    fn test_default_item_selector() {
        let mut cfg = config(None);
        cfg.selectors = Some(SelectorSet {
            title: Some("h1".into()),
            ..Default::default()
        });
        let adapter = CustomPage::with_config(cfg, StaticFetcher::new("")).unwrap();
        let html = "<article><h1>One</h1></article><article><h1>Two</h1></article>";
        let records = adapter.parse_results(html, &page());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].title, "Two");
    }

    #[tokio::test]
    async fn test_search_fetches_configured_page() {
        let fetcher = StaticFetcher::new(PAGE);
        let adapter = CustomPage::with_config(config(None), fetcher.clone()).unwrap();
        let records = adapter.search(&SearchQuery::collection(vec![])).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(fetcher.last_url(), "https://this-week-in-rust.org/");
        assert!(records.iter().all(|r| r.source == "twir"));
    }
}
