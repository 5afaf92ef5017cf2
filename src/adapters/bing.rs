//! Bing search engine implementation.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{append_params, element_text, first_text, selector};
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::{
    ParserKind, Record, RequestTemplate, Result, SafeSearch, SearchQuery, SourceAdapter,
    SourceCategory, SourceConfig, TimeRange,
};

/// Bing search engine.
pub struct Bing {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl Bing {
    /// Creates a new Bing engine.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(Self::default_config(), fetcher)
    }

    /// Default source configuration.
    pub fn default_config() -> SourceConfig {
        SourceConfig::new(
            "bing",
            ParserKind::Bing,
            RequestTemplate::new("https://www.bing.com/search").with_param("q", "{query}"),
        )
        .with_name("Bing")
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
            params.push(("first", (query.offset(10) + 1).to_string()));
        }
        if let Some(language) = &query.language {
            params.push(("setlang", language.clone()));
        }
        // Bing has no fixed "past year" filter.
        let freshness = match query.time_range {
            Some(TimeRange::Day) => Some("ez1"),
            Some(TimeRange::Week) => Some("ez2"),
            Some(TimeRange::Month) => Some("ez3"),
            Some(TimeRange::Year) | None => None,
        };
        if let Some(freshness) = freshness {
            params.push(("filters", format!("ex1:\"{}\"", freshness)));
        }
        let adlt = match query.safesearch {
            SafeSearch::Off => "off",
            SafeSearch::Moderate => "moderate",
            SafeSearch::Strict => "strict",
        };
        params.push(("adlt", adlt.to_string()));

        append_params(&mut url, &params);
        Ok(PageRequest::get(url))
    }

    fn parse_results(&self, html: &str) -> Result<Vec<Record>> {
        let document = Html::parse_document(html);

        let result_selector = selector("li.b_algo")?;
        let title_selector = selector("h2 a")?;
        let snippet_selector = selector(".b_caption p, .b_algoSlug")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };

            let title = element_text(title_elem);
            let url = title_elem.value().attr("href").unwrap_or_default();
            let content = first_text(element, &snippet_selector);

            if !url.is_empty() && !title.is_empty() && url.starts_with("http") {
                results.push(Record::new(url, &title, &content).with_source(&self.config.id));
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl SourceAdapter for Bing {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let request = self.build_request(query)?;
        let html = self.fetcher.fetch(&request).await?;
        self.parse_results(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fetcher::testing::StaticFetcher;

    fn engine() -> Bing {
        Bing::new(StaticFetcher::new(""))
    }

    #[test]
    fn test_bing_new() {
        let engine = engine();
        assert_eq!(engine.config.display_name(), "Bing");
        assert_eq!(engine.config.id, "bing");
        assert_eq!(engine.config.weight, 1.0);
        assert!(engine.config.paging);
    }

    #[test]
    fn test_bing_with_config() {
        let config = Bing::default_config()
            .with_name("Bing Images")
            .with_categories(vec![SourceCategory::Images]);
        let engine = Bing::with_config(config, StaticFetcher::new(""));
        assert_eq!(engine.config().display_name(), "Bing Images");
        assert_eq!(engine.categories(), &[SourceCategory::Images]);
    }

    #[test]
    fn test_bing_build_request_first_page() {
        let request = engine().build_request(&SearchQuery::new("rust")).unwrap();
        assert_eq!(request.url.as_str(), "https://www.bing.com/search?q=rust&adlt=off");
    }

    #[test]
    fn test_bing_build_request_paging_and_filters() {
        let query = SearchQuery::new("rust")
            .with_page(3)
            .with_language("fr")
            .with_time_range(TimeRange::Week)
            .with_safesearch(SafeSearch::Moderate);
        let url = engine().build_request(&query).unwrap().url;
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "rust".to_string()),
                ("first".to_string(), "21".to_string()),
                ("setlang".to_string(), "fr".to_string()),
                ("filters".to_string(), "ex1:\"ez2\"".to_string()),
                ("adlt".to_string(), "moderate".to_string()),
            ]
        );
    }

    #[test]
    fn test_bing_year_range_has_no_filter() {
        let query = SearchQuery::new("rust").with_time_range(TimeRange::Year);
        let url = engine().build_request(&query).unwrap().url;
        assert!(!url.as_str().contains("filters"));
    }

    #[test]
    fn test_bing_parse_results_empty() {
        let results = engine().parse_results("<html><body></body></html>").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_bing_parse_results_with_results() {
        let html = r#"
            <html>
            <body>
                <ol id="b_results">
                    <li class="b_algo">
                        <h2><a href="https://www.rust-lang.org/">Rust Programming Language</a></h2>
                        <div class="b_caption"><p>Rust is blazingly fast.</p></div>
                    </li>
                    <li class="b_algo">
                        <h2><a href="https://crates.io/">crates.io</a></h2>
                        <p class="b_algoSlug">The Rust community's crate registry</p>
                    </li>
                    <li class="b_algo">
                        <h2><a href="javascript:void(0)">Broken</a></h2>
                    </li>
                </ol>
            </body>
            </html>
        "#;
        let results = engine().parse_results(html).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].content, "Rust is blazingly fast.");
        assert_eq!(results[1].url, "https://crates.io/");
        assert_eq!(results[1].content, "The Rust community's crate registry");
        assert_eq!(results[1].source, "bing");
    }
}
