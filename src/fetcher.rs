//! Page fetcher abstraction for retrieving raw source responses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::throttle::Throttle;
use crate::Result;

/// A GET request issued by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Target URL.
    pub url: Url,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl PageRequest {
    /// Creates a plain GET request.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Trait for fetching the body of a URL.
///
/// Implementations must map a non-success status to
/// [`crate::SearchError::HttpStatus`] so the dispatcher can report it.
/// All configuration (user-agent, compression) is set at construction
/// time; `fetch` is a simple request-in, body-out interface.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the body of the given request.
    async fn fetch(&self, request: &PageRequest) -> Result<String>;
}

/// A fetcher shared by all adapters, paced per source.
///
/// Each adapter owns one of these; the pacing state lives here so it is
/// shared by every call made to the same source.
pub struct PacedFetcher {
    inner: Arc<dyn PageFetcher>,
    throttle: Option<Throttle>,
}

impl PacedFetcher {
    /// Wraps a fetcher, pacing requests when `min_interval` is set.
    pub fn new(inner: Arc<dyn PageFetcher>, min_interval: Option<Duration>) -> Self {
        Self {
            inner,
            throttle: min_interval.map(Throttle::new),
        }
    }

    /// Returns the politeness interval, if any.
    pub fn min_interval(&self) -> Option<Duration> {
        self.throttle.as_ref().map(Throttle::interval)
    }

    /// Waits for the politeness interval, then fetches.
    pub async fn fetch(&self, request: &PageRequest) -> Result<String> {
        if let Some(throttle) = &self.throttle {
            throttle.wait().await;
        }
        self.inner.fetch(request).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Canned fetcher used by adapter tests.

    use std::sync::Mutex;

    use super::*;

    /// Returns a fixed body and records every request it sees.
    pub struct StaticFetcher {
        body: String,
        pub requests: Mutex<Vec<PageRequest>>,
    }

    impl StaticFetcher {
        pub fn new(body: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                body: body.into(),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn last_url(&self) -> String {
            self.requests
                .lock()
                .unwrap()
                .last()
                .map(|request| request.url.to_string())
                .unwrap_or_default()
        }

        pub fn last_headers(&self) -> Vec<(String, String)> {
            self.requests
                .lock()
                .unwrap()
                .last()
                .map(|request| request.headers.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, request: &PageRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.body.clone())
        }
    }
}
