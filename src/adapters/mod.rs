//! Source adapter implementations.

use std::sync::Arc;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::fetcher::PageFetcher;
use crate::{ParserKind, Result, SearchError, SourceAdapter, SourceConfig};

// Markup-backed engines
mod bing;
mod brave;
mod duckduckgo;
mod google;

// API-backed sources
mod feed;
mod github;
mod reddit;
mod searx;

// Configured scraping
mod custom_page;

pub use bing::Bing;
pub use brave::Brave;
pub use duckduckgo::DuckDuckGo;
pub use google::Google;

pub use feed::Feed;
pub use github::GitHub;
pub use reddit::Reddit;
pub use searx::Searx;

pub use custom_page::CustomPage;

/// Builds the adapter selected by the config's parser identifier.
pub fn build(config: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Arc<dyn SourceAdapter>> {
    config.validate()?;
    let adapter: Arc<dyn SourceAdapter> = match config.parser {
        ParserKind::Google => Arc::new(Google::with_config(config, fetcher)),
        ParserKind::Brave => Arc::new(Brave::with_config(config, fetcher)),
        ParserKind::DuckDuckGo => Arc::new(DuckDuckGo::with_config(config, fetcher)),
        ParserKind::Bing => Arc::new(Bing::with_config(config, fetcher)),
        ParserKind::Searx => Arc::new(Searx::with_config(config, fetcher)),
        ParserKind::Feed => Arc::new(Feed::with_config(config, fetcher)),
        ParserKind::GithubReleases | ParserKind::GithubIssues => {
            Arc::new(GitHub::with_config(config, fetcher))
        }
        ParserKind::Reddit => Arc::new(Reddit::with_config(config, fetcher)),
        ParserKind::CustomPage => Arc::new(CustomPage::with_config(config, fetcher)?),
    };
    Ok(adapter)
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn first_text(element: ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

pub(crate) fn append_params(url: &mut Url, params: &[(&str, String)]) {
    if params.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in params {
        pairs.append_pair(key, value);
    }
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| SearchError::Parse(format!("Invalid JSON: {}", e)))
}
