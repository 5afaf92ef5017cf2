//! Result aggregation and ranking.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::DEFAULT_MAX_RESULTS;
use crate::url_normalize::canonical_url;
use crate::{Record, ResultSet};

/// Deduplicates, scores and orders records from multiple sources.
#[derive(Debug)]
pub struct Aggregator {
    /// Source weights for scoring.
    source_weights: HashMap<String, f64>,
    /// Records kept after ranking.
    max_results: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            source_weights: HashMap::new(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl Aggregator {
    /// Creates a new aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the weight for a source.
    pub fn set_source_weight(&mut self, source: impl Into<String>, weight: f64) {
        self.source_weights.insert(source.into(), weight);
    }

    /// Weight of a source, 1.0 when unknown.
    pub fn source_weight(&self, source: &str) -> f64 {
        self.source_weights.get(source).copied().unwrap_or(1.0)
    }

    /// Sets the maximum number of records kept.
    pub fn set_max_results(&mut self, max_results: usize) {
        self.max_results = max_results;
    }

    /// Maximum number of records kept.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Canonicalizes URLs and drops duplicates.
    ///
    /// Records are walked in delivery order and the first one seen for a
    /// canonical URL wins; later duplicates are dropped without merging.
    /// Records whose URL is empty or not an absolute http(s) URL are
    /// discarded.
    pub fn dedupe(&self, records: Vec<Record>) -> Vec<Record> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(records.len());
        let mut discarded = 0usize;

        for mut record in records {
            let Some(canonical) = canonical_url(&record.url) else {
                discarded += 1;
                continue;
            };
            if seen.insert(canonical.clone()) {
                record.url = canonical;
                unique.push(record);
            }
        }

        if discarded > 0 {
            debug!("Discarded {} records without a usable URL", discarded);
        }
        unique
    }

    /// Aggregates records delivered in source resolution order.
    ///
    /// This performs:
    /// 1. Deduplication based on canonical URL
    /// 2. Score calculation
    /// 3. Stable sorting by score, ties keeping delivery order
    /// 4. Truncation to the configured maximum
    pub fn aggregate(&self, records: Vec<Record>) -> ResultSet {
        let mut results = self.dedupe(records);

        for result in &mut results {
            result.score = self.calculate_score(result);
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = results.len();
        results.truncate(self.max_results);
        ResultSet::new(results, total)
    }

    /// Calculates the score for a record.
    ///
    /// A finite relevance supplied by the source takes precedence over the
    /// source weight.
    fn calculate_score(&self, record: &Record) -> f64 {
        match record.relevance {
            Some(relevance) if relevance.is_finite() => relevance,
            _ => self.source_weight(&record.source),
        }
    }
}
