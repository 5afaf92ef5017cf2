//! SearXNG-compatible JSON search backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{append_params, parse_json};
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::text::parse_timestamp;
use crate::{
    ParserKind, Record, RecordExtras, RecordKind, RequestTemplate, Result, SafeSearch,
    SearchQuery, SourceAdapter, SourceCategory, SourceConfig,
};

/// Default local instance queried by the built-in catalog.
pub const DEFAULT_INSTANCE: &str = "http://localhost:8888/search";

#[derive(Debug, Deserialize)]
struct SearxResponse {
    #[serde(default)]
    results: Vec<SearxResult>,
}

#[derive(Debug, Deserialize)]
struct SearxResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    img_src: Option<String>,
}

/// Client for a SearXNG-style `/search?format=json` endpoint.
pub struct Searx {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl Searx {
    /// Creates a Searx source for the general category.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(Self::default_config(), fetcher)
    }

    /// Default source configuration.
    pub fn default_config() -> SourceConfig {
        Self::category_config("searx", SourceCategory::General)
    }

    /// Configuration querying one upstream category of the instance.
    pub fn category_config(id: &str, category: SourceCategory) -> SourceConfig {
        SourceConfig::new(
            id,
            ParserKind::Searx,
            RequestTemplate::new(DEFAULT_INSTANCE)
                .with_param("q", "{query}")
                .with_param("format", "json")
                .with_param("categories", category.as_str()),
        )
        .with_name("SearXNG")
        .with_categories(vec![category])
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

        if self.config.paging {
            params.push(("pageno", query.page.max(1).to_string()));
        }
        if let Some(language) = &query.language {
            params.push(("language", language.clone()));
        }
        let safesearch = match query.safesearch {
            SafeSearch::Off => "0",
            SafeSearch::Moderate => "1",
            SafeSearch::Strict => "2",
        };
        params.push(("safesearch", safesearch.to_string()));
        if let Some(range) = query.time_range {
            params.push(("time_range", range.as_str().to_string()));
        }

        append_params(&mut url, &params);
        Ok(PageRequest::get(url).with_header("Accept", "application/json"))
    }

    fn parse_results(&self, body: &str) -> Result<Vec<Record>> {
        let response: SearxResponse = parse_json(body)?;

        let results = response
            .results
            .into_iter()
            .filter(|item| !item.url.is_empty())
            .map(|item| {
                let kind = match item.category.as_deref() {
                    Some("images") => RecordKind::Image,
                    Some("videos") => RecordKind::Video,
                    Some("news") => RecordKind::News,
                    _ => RecordKind::Web,
                };
                let published = item.published_date.as_deref().and_then(parse_timestamp);
                let extras = RecordExtras {
                    thumbnail: item.thumbnail.or(item.img_src),
                    upstream_engine: item.engine,
                    ..Default::default()
                };

                let mut record = Record::new(item.url, &item.title, &item.content)
                    .with_source(&self.config.id)
                    .with_kind(kind)
                    .with_published(published)
                    .with_extras(extras);
                if let Some(score) = item.score.filter(|score| score.is_finite()) {
                    record = record.with_relevance(score);
                }
                record
            })
            .collect();

        Ok(results)
    }
}

#[async_trait]
impl SourceAdapter for Searx {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let request = self.build_request(query)?;
        let body = self.fetcher.fetch(&request).await?;
        self.parse_results(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher_http::HttpFetcher;
    use crate::{SearchError, TimeRange};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::fetcher::testing::StaticFetcher;

    const BODY: &str = r#"{
        "query": "rust",
        "results": [
            {
                "url": "https://www.rust-lang.org/",
                "title": "Rust",
                "content": "A language empowering everyone",
                "engine": "duckduckgo",
                "score": 2.5,
                "category": "general",
                "publishedDate": "2024-03-01T12:00:00"
            },
            {
                "url": "https://example.com/cat.jpg",
                "title": "Cat",
                "content": "",
                "engine": "bing images",
                "category": "images",
                "img_src": "https://example.com/cat_small.jpg"
            },
            {
                "url": "",
                "title": "No url"
            }
        ]
    }"#;

    fn engine() -> Searx {
        Searx::new(StaticFetcher::new(""))
    }

    #[test]
    fn test_searx_default_config() {
        let config = Searx::default_config();
        assert_eq!(config.id, "searx");
        assert_eq!(config.categories, vec![SourceCategory::General]);
        assert_eq!(config.request.params.get("format").map(String::as_str), Some("json"));
    }

    #[test]
    fn test_searx_category_config() {
        let config = Searx::category_config("searx-images", SourceCategory::Images);
        assert_eq!(config.id, "searx-images");
        assert_eq!(config.categories, vec![SourceCategory::Images]);
        assert_eq!(
            config.request.params.get("categories").map(String::as_str),
            Some("images")
        );
    }

    #[test]
    fn test_searx_build_request() {
        let query = SearchQuery::new("rust")
            .with_page(2)
            .with_language("en-US")
            .with_safesearch(SafeSearch::Moderate)
            .with_time_range(TimeRange::Month);
        let request = engine().build_request(&query).unwrap();
        assert_eq!(
            request.url.as_str(),
            "http://localhost:8888/search?categories=general&format=json&q=rust&pageno=2&language=en-US&safesearch=1&time_range=month"
        );
    }

    #[test]
    fn test_searx_parse_results() {
        let results = engine().parse_results(BODY).unwrap();
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.url, "https://www.rust-lang.org/");
        assert_eq!(first.relevance, Some(2.5));
        assert_eq!(first.kind, RecordKind::Web);
        assert_eq!(first.extras.upstream_engine.as_deref(), Some("duckduckgo"));
        assert!(first.published.is_some());
        assert_eq!(first.source, "searx");

        let second = &results[1];
        assert_eq!(second.kind, RecordKind::Image);
        assert!(second.relevance.is_none());
        assert_eq!(
            second.extras.thumbnail.as_deref(),
            Some("https://example.com/cat_small.jpg")
        );
    }

    #[test]
    fn test_searx_invalid_json() {
        let err = engine().parse_results("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn test_searx_missing_results_is_empty() {
        assert!(engine().parse_results("{}").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_searx_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "rust"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = Searx::default_config();
        config.request.url = format!("{}/search", server.uri());
        let engine = Searx::with_config(config, Arc::new(HttpFetcher::new()));

        let results = engine.search(&SearchQuery::new("rust")).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
