//! Google search engine implementation.
//!
//! Results are scraped from the plain HTML page. Google answers automated
//! clients with a CAPTCHA page now and then; that is reported as a parse
//! failure so the source shows up in the outcome list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;

use super::{append_params, element_text, first_text, selector};
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::{
    ParserKind, Record, RequestTemplate, Result, SafeSearch, SearchError, SearchQuery,
    SourceAdapter, SourceCategory, SourceConfig, TimeRange,
};

/// Google search engine.
pub struct Google {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl Google {
    /// Creates a new Google engine with the given page fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(Self::default_config(), fetcher)
    }

    /// Default source configuration.
    pub fn default_config() -> SourceConfig {
        SourceConfig::new(
            "google",
            ParserKind::Google,
            RequestTemplate::new("https://www.google.com/search").with_param("q", "{query}"),
        )
        .with_name("Google")
        .with_categories(vec![SourceCategory::General])
        .with_weight(1.5)
        .with_paging(true)
        .with_min_interval(Duration::from_secs(1))
    }

    /// Creates with custom configuration.
    pub fn with_config(config: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let fetcher = PacedFetcher::new(fetcher, config.min_interval());
        Self { config, fetcher }
    }

    fn build_request(&self, query: &SearchQuery) -> Result<PageRequest> {
        let mut url = self.config.request.render(query)?;
        let mut params = vec![("hl", query.language_or_default().to_string())];

        if self.config.paging && query.page > 1 {
            params.push(("start", query.offset(10).to_string()));
        }
        if let Some(range) = query.time_range {
            let qdr = match range {
                TimeRange::Day => "d",
                TimeRange::Week => "w",
                TimeRange::Month => "m",
                TimeRange::Year => "y",
            };
            params.push(("tbs", format!("qdr:{}", qdr)));
        }
        if query.safesearch == SafeSearch::Strict {
            params.push(("safe", "active".to_string()));
        }

        append_params(&mut url, &params);
        Ok(PageRequest::get(url))
    }

    fn parse_results(&self, html: &str) -> Result<Vec<Record>> {
        // Detect CAPTCHA / bot-block pages before parsing
        if html.contains("/sorry/index") || html.contains("recaptcha") {
            return Err(SearchError::Parse(
                "Google returned a CAPTCHA page (bot detected)".to_string(),
            ));
        }

        let document = Html::parse_document(html);

        let container_selector = selector("div.g")?;
        let title_selector = selector("h3")?;
        let link_selector = selector("a[href]")?;
        let snippet_selector = selector("div[data-sncf], div.VwiC3b, span.st")?;

        let mut results = Vec::new();

        for element in document.select(&container_selector) {
            let title = match element.select(&title_selector).next() {
                Some(el) => element_text(el),
                None => continue,
            };

            let url = match element.select(&link_selector).next() {
                Some(el) => {
                    let href = el.value().attr("href").unwrap_or_default();
                    match resolve_href(href) {
                        Some(url) => url,
                        None => continue,
                    }
                }
                None => continue,
            };

            let content = first_text(element, &snippet_selector);

            if !url.is_empty() && !title.is_empty() {
                results.push(Record::new(url, &title, &content).with_source(&self.config.id));
            }
        }

        Ok(results)
    }
}

/// Returns the target of a result link, unwrapping `/url?q=` redirects and
/// skipping Google's internal links.
fn resolve_href(href: &str) -> Option<String> {
    if let Some(rest) = href.strip_prefix("/url?q=") {
        let target = rest.split('&').next().unwrap_or(rest);
        let decoded = urlencoding::decode(target)
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| target.to_string());
        return Some(decoded);
    }
    if href.starts_with('/') {
        return None;
    }
    Some(href.to_string())
}

#[async_trait]
impl SourceAdapter for Google {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let request = self.build_request(query)?;
        let html = self.fetcher.fetch(&request).await?;
        self.parse_results(&html)
    }
}
