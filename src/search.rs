//! Search orchestration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::EngineSettings;
use crate::fetcher::PageFetcher;
use crate::fetcher_http::{HttpFetcher, DEFAULT_USER_AGENT};
use crate::{
    Aggregator, Collection, Dispatcher, Registry, Result, ResultSet, SearchQuery, SourceCategory,
};

/// Aggregation engine driving the dispatcher and aggregator over a
/// read-only registry.
pub struct Search {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    aggregator: Aggregator,
}

impl Search {
    /// Creates a search over the given registry with default limits.
    pub fn new(registry: Arc<Registry>) -> Self {
        let mut aggregator = Aggregator::new();
        for source in registry.iter() {
            aggregator.set_source_weight(source.id(), source.weight());
        }
        Self {
            registry,
            dispatcher: Dispatcher::new(),
            aggregator,
        }
    }

    /// Builds the registry and limits from settings, fetching over HTTP.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        let user_agent = settings.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        Self::with_fetcher(settings, Arc::new(HttpFetcher::with_user_agent(user_agent)))
    }

    /// Builds the registry and limits from settings on top of a custom fetcher.
    pub fn with_fetcher(settings: &EngineSettings, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let registry = Registry::from_settings(settings, fetcher)?;
        let mut search = Self::new(Arc::new(registry));
        search.set_timeout(settings.source_timeout());
        search.set_deadline(settings.deadline());
        search.set_max_results(settings.max_results);
        Ok(search)
    }

    /// Sets the timeout for sources without their own.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.dispatcher.set_source_timeout(timeout);
    }

    /// Sets the overall deadline of one call.
    pub fn set_deadline(&mut self, deadline: Duration) {
        self.dispatcher.set_deadline(deadline);
    }

    /// Sets the number of records kept after ranking.
    pub fn set_max_results(&mut self, max_results: usize) {
        self.aggregator.set_max_results(max_results);
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the number of registered sources.
    pub fn source_count(&self) -> usize {
        self.registry.len()
    }

    /// Performs a search across the sources of the requested categories.
    ///
    /// Only a malformed query is an error; every source failure is reported
    /// in the outcomes of the returned set.
    pub async fn search(&self, query: SearchQuery) -> Result<ResultSet> {
        query.validate()?;

        let start = Instant::now();
        let sources = self.registry.resolve(&query);
        debug!("Searching {} sources for '{}'", sources.len(), query.query);

        let (records, outcomes) = self.dispatcher.dispatch(&sources, &query).await.into_records();

        let mut results = self.aggregator.aggregate(records);
        results.set_query(query.query.as_str());
        results.set_outcomes(outcomes);
        results.set_duration(start.elapsed().as_millis() as u64);

        info!(
            "Search '{}' returned {} of {} results from {} sources in {}ms",
            query.query,
            results.len(),
            results.total,
            sources.len(),
            results.duration_ms
        );
        Ok(results)
    }

    /// Gathers every record from the sources of `categories` without
    /// search terms or ranking.
    ///
    /// Records are deduplicated by canonical URL and kept in source order.
    pub async fn collect(&self, categories: Vec<SourceCategory>) -> Collection {
        let query = SearchQuery::collection(categories);
        let sources = self.registry.resolve(&query);

        let (records, outcomes) = self.dispatcher.dispatch(&sources, &query).await.into_records();
        let records = self.aggregator.dedupe(records);

        info!(
            "Collected {} records from {} sources",
            records.len(),
            sources.len()
        );
        Collection { records, outcomes }
    }
}
