//! HTTP-based page fetcher using reqwest.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::fetcher::{PageFetcher, PageRequest};
use crate::{Result, SearchError};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (compatible; center-search/0.1)";

/// A page fetcher that uses plain HTTP requests via reqwest.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a new `HttpFetcher` with default settings.
    pub fn new() -> Self {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Creates an `HttpFetcher` sending the given user agent.
    pub fn with_user_agent(user_agent: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent(user_agent)
                .gzip(true)
                .brotli(true)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Creates an `HttpFetcher` with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<String> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!("GET {} -> {}", request.url, status);
        if !status.is_success() {
            return Err(SearchError::HttpStatus {
                status: status.as_u16(),
                url: request.url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(server: &MockServer, route: &str) -> PageRequest {
        PageRequest::get(Url::parse(&format!("{}{}", server.uri(), route)).unwrap())
    }

    #[test]
    fn test_http_fetcher_new() {
        let _fetcher = HttpFetcher::new();
    }

    #[test]
    fn test_http_fetcher_default() {
        let _fetcher = HttpFetcher::default();
    }

    #[test]
    fn test_http_fetcher_with_client() {
        let client = Client::builder().user_agent("test-agent").build().unwrap();
        let _fetcher = HttpFetcher::with_client(client);
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = HttpFetcher::new().fetch(&request(&server, "/page")).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let req = request(&server, "/api").with_header("Accept", "application/json");
        assert_eq!(HttpFetcher::new().fetch(&req).await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_fetch_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = HttpFetcher::new()
            .fetch(&request(&server, "/busy"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::HttpStatus { status: 503, .. }));
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_error() {
        let req = PageRequest::get(Url::parse("http://127.0.0.1:1/").unwrap());
        let err = HttpFetcher::new().fetch(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
