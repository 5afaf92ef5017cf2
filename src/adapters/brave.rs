//! Brave search engine implementation.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{append_params, element_text, first_text, selector};
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::{
    ParserKind, Record, RequestTemplate, Result, SafeSearch, SearchQuery, SourceAdapter,
    SourceCategory, SourceConfig, TimeRange,
};

/// Brave search engine.
pub struct Brave {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl Brave {
    /// Creates a new Brave engine.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(Self::default_config(), fetcher)
    }

    /// Default source configuration.
    pub fn default_config() -> SourceConfig {
        SourceConfig::new(
            "brave",
            ParserKind::Brave,
            RequestTemplate::new("https://search.brave.com/search")
                .with_param("q", "{query}")
                .with_param("source", "web"),
        )
        .with_name("Brave")
        .with_categories(vec![SourceCategory::General])
        .with_weight(1.0)
        .with_paging(true)
    }

    /// Creates with custom configuration.
    pub fn with_config(config: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let fetcher = PacedFetcher::new(fetcher, config.min_interval());
        Self { config, fetcher }
    }

    fn build_request(&self, query: &SearchQuery) -> Result<PageRequest> {
        let mut url = self.config.request.render(query)?;
        let mut params = Vec::new();

        if self.config.paging && query.page > 1 {
            params.push(("offset", (query.page - 1).to_string()));
        }
        if let Some(range) = query.time_range {
            let tf = match range {
                TimeRange::Day => "pd",
                TimeRange::Week => "pw",
                TimeRange::Month => "pm",
                TimeRange::Year => "py",
            };
            params.push(("tf", tf.to_string()));
        }

        append_params(&mut url, &params);

        // Brave reads the safe search level from a cookie.
        let level = match query.safesearch {
            SafeSearch::Off => "off",
            SafeSearch::Moderate => "moderate",
            SafeSearch::Strict => "strict",
        };
        Ok(PageRequest::get(url).with_header("Cookie", format!("safesearch={}", level)))
    }

    fn parse_results(&self, html: &str) -> Result<Vec<Record>> {
        let document = Html::parse_document(html);

        let result_selector = selector(r#"div.snippet[data-type="web"], div.snippet[data-pos]"#)?;
        let title_selector = selector(".search-snippet-title, .title")?;
        let desc_selector = selector(".generic-snippet .content, .snippet-description")?;
        let url_selector = selector(r#"a[href^="http"]"#)?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let title = first_text(element, &title_selector);

            let url = element
                .select(&url_selector)
                .next()
                .and_then(|e| e.value().attr("href"))
                .unwrap_or_default()
                .to_string();

            let content = element
                .select(&desc_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            if !url.is_empty() && !title.is_empty() && url.starts_with("http") {
                results.push(Record::new(url, &title, &content).with_source(&self.config.id));
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl SourceAdapter for Brave {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let request = self.build_request(query)?;
        let html = self.fetcher.fetch(&request).await?;
        self.parse_results(&html)
    }
}
