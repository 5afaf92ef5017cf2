//! DuckDuckGo search engine implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::{append_params, element_text, first_text, selector};
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::{
    ParserKind, Record, RequestTemplate, Result, SafeSearch, SearchQuery, SourceAdapter,
    SourceCategory, SourceConfig, TimeRange,
};

/// DuckDuckGo search engine, scraped from its HTML endpoint.
pub struct DuckDuckGo {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl DuckDuckGo {
    /// Creates a new DuckDuckGo engine.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(Self::default_config(), fetcher)
    }

    /// Default source configuration.
    pub fn default_config() -> SourceConfig {
        SourceConfig::new(
            "duckduckgo",
            ParserKind::DuckDuckGo,
            RequestTemplate::new("https://html.duckduckgo.com/html/").with_param("q", "{query}"),
        )
        .with_name("DuckDuckGo")
        .with_categories(vec![SourceCategory::General])
        .with_weight(1.1)
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
        let mut params = Vec::new();

        if self.config.paging && query.page > 1 {
            let offset = query.offset(30);
            params.push(("s", offset.to_string()));
            params.push(("dc", (offset + 1).to_string()));
        }
        if let Some(region) = region(query.language.as_deref()) {
            params.push(("kl", region));
        }
        if let Some(range) = query.time_range {
            let df = match range {
                TimeRange::Day => "d",
                TimeRange::Week => "w",
                TimeRange::Month => "m",
                TimeRange::Year => "y",
            };
            params.push(("df", df.to_string()));
        }
        let kp = match query.safesearch {
            SafeSearch::Off => "-2",
            SafeSearch::Moderate => "-1",
            SafeSearch::Strict => "1",
        };
        params.push(("kp", kp.to_string()));

        append_params(&mut url, &params);
        Ok(PageRequest::get(url))
    }

    fn parse_results(&self, html: &str) -> Result<Vec<Record>> {
        let document = Html::parse_document(html);
        let result_selector = selector(".result, .results_links")?;
        let ad_selector = selector(".result--ad")?;
        let title_selector = selector("a.result__a, .result__title a")?;
        let snippet_selector = selector(".result__snippet")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            if ad_selector.matches(&element) {
                continue;
            }
            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };

            let title = element_text(title_elem);
            let href = title_elem.value().attr("href").unwrap_or_default();
            let url = extract_redirect_url(href).unwrap_or_else(|| href.to_string());
            let content = first_text(element, &snippet_selector);

            if !url.is_empty() && !title.is_empty() {
                results.push(Record::new(url, &title, &content).with_source(&self.config.id));
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl SourceAdapter for DuckDuckGo {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let request = self.build_request(query)?;
        let html = self.fetcher.fetch(&request).await?;
        self.parse_results(&html)
    }
}

/// Unwraps `//duckduckgo.com/l/?uddg=<target>` redirect links.
fn extract_redirect_url(href: &str) -> Option<String> {
    if !href.contains("duckduckgo.com/l/") {
        return None;
    }
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, value)| value.into_owned())
}

/// Maps `en-US` style tags to DuckDuckGo's `us-en` region codes.
fn region(language: Option<&str>) -> Option<String> {
    let (lang, country) = language?.split_once(['-', '_'])?;
    Some(format!(
        "{}-{}",
        country.to_ascii_lowercase(),
        lang.to_ascii_lowercase()
    ))
}
