//! Record, outcome and result set types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::text::clean_text;

/// Type of record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Standard web result.
    #[default]
    Web,
    /// Image result.
    Image,
    /// Video result.
    Video,
    /// News article.
    News,
    /// Feed entry.
    Feed,
    /// Code release.
    Release,
    /// Issue tracker entry.
    Issue,
    /// Discussion thread.
    Discussion,
    /// Item scraped from a custom page.
    Page,
}

/// Source-specific metadata carried alongside a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordExtras {
    /// Author or poster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Community vote count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<i64>,
    /// Number of comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
    /// Free-form tags (feed categories, issue labels, subreddit).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Single label such as a release version or post flair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Thumbnail URL (for images/videos).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Site the record was scraped from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Engine that produced the record upstream, for search backends that aggregate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_engine: Option<String>,
}

impl RecordExtras {
    /// Returns true when no extra is set.
    pub fn is_empty(&self) -> bool {
        self == &RecordExtras::default()
    }
}

/// A single normalized record.
///
/// Title and content are cleaned on construction: whitespace runs collapse to
/// single spaces, bracketed annotations and markup tags are removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record URL. Canonicalized during aggregation.
    pub url: String,
    /// Record title.
    pub title: String,
    /// Record description/snippet.
    pub content: String,
    /// Id of the source that produced this record.
    pub source: String,
    /// Type of record.
    pub kind: RecordKind,
    /// Published timestamp.
    pub published: Option<DateTime<Utc>>,
    /// Source-specific metadata.
    #[serde(default, skip_serializing_if = "RecordExtras::is_empty")]
    pub extras: RecordExtras,
    /// Per-record relevance supplied by the source, overriding the source weight.
    pub relevance: Option<f64>,
    /// Calculated score for ranking.
    pub score: f64,
}

impl Record {
    /// Creates a new record, cleaning title and content.
    pub fn new(url: impl Into<String>, title: &str, content: &str) -> Self {
        Self {
            url: url.into().trim().to_string(),
            title: clean_text(title),
            content: clean_text(content),
            source: String::new(),
            kind: RecordKind::Web,
            published: None,
            extras: RecordExtras::default(),
            relevance: None,
            score: 0.0,
        }
    }

    /// Sets the originating source id.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Sets the record kind.
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the published timestamp.
    pub fn with_published(mut self, published: Option<DateTime<Utc>>) -> Self {
        self.published = published;
        self
    }

    /// Sets the extras.
    pub fn with_extras(mut self, extras: RecordExtras) -> Self {
        self.extras = extras;
        self
    }

    /// Sets the upstream relevance score.
    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance);
        self
    }
}

/// Status of one source for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The source returned records.
    Success { records: usize },
    /// The source answered but nothing could be extracted.
    Empty,
    /// The source failed.
    Error { kind: ErrorKind, cause: String },
}

/// What happened to one source during a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutcome {
    /// Source id.
    pub source: String,
    /// Outcome status.
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Time spent on the source in milliseconds.
    pub elapsed_ms: u64,
}

impl SourceOutcome {
    /// Builds an outcome from the number of records a source produced.
    pub fn from_count(source: impl Into<String>, records: usize, elapsed_ms: u64) -> Self {
        let status = if records == 0 {
            OutcomeStatus::Empty
        } else {
            OutcomeStatus::Success { records }
        };
        Self {
            source: source.into(),
            status,
            elapsed_ms,
        }
    }

    /// Builds a failed outcome.
    pub fn failed(
        source: impl Into<String>,
        kind: ErrorKind,
        cause: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            source: source.into(),
            status: OutcomeStatus::Error {
                kind,
                cause: cause.into(),
            },
            elapsed_ms,
        }
    }

    /// Returns true if the source failed.
    pub fn is_error(&self) -> bool {
        matches!(self.status, OutcomeStatus::Error { .. })
    }

    /// Returns the failure kind, if the source failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.status {
            OutcomeStatus::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Human-readable error line, if the source failed.
    pub fn error_message(&self) -> Option<String> {
        match &self.status {
            OutcomeStatus::Error { kind, cause } => {
                Some(format!("{}: {}: {}", self.source, kind, cause))
            }
            _ => None,
        }
    }
}

fn error_lines(outcomes: &[SourceOutcome]) -> Option<Vec<String>> {
    let errors: Vec<String> = outcomes
        .iter()
        .filter_map(SourceOutcome::error_message)
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

/// Aggregated, ranked and truncated records for one query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    /// Query text the set was produced for.
    pub query: String,
    /// Ranked records.
    records: Vec<Record>,
    /// Number of unique records before truncation.
    pub total: usize,
    /// Per-source outcomes, in source resolution order.
    outcomes: Vec<SourceOutcome>,
    /// Search duration in milliseconds.
    pub duration_ms: u64,
}

impl ResultSet {
    /// Creates a result set from already ranked records.
    pub fn new(records: Vec<Record>, total: usize) -> Self {
        Self {
            records,
            total,
            ..Self::default()
        }
    }

    /// Returns the records.
    pub fn items(&self) -> &[Record] {
        &self.records
    }

    /// Consumes the set, returning its records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Number of records after truncation.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the per-source outcomes.
    pub fn outcomes(&self) -> &[SourceOutcome] {
        &self.outcomes
    }

    /// Sets the per-source outcomes.
    pub fn set_outcomes(&mut self, outcomes: Vec<SourceOutcome>) {
        self.outcomes = outcomes;
    }

    /// Sets the query text.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Sets the search duration.
    pub fn set_duration(&mut self, duration_ms: u64) {
        self.duration_ms = duration_ms;
    }

    /// Error lines for failed sources, `None` when every source answered.
    pub fn errors(&self) -> Option<Vec<String>> {
        error_lines(&self.outcomes)
    }

    /// Builds the wire response.
    pub fn to_response(&self) -> SearchResponse {
        SearchResponse {
            query: self.query.clone(),
            results: self.records.iter().map(ResponseItem::from).collect(),
            number_of_results: self.total,
            errors: self.errors(),
        }
    }
}

/// One record in the wire response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseItem {
    /// Record title.
    pub title: String,
    /// Canonical URL.
    pub url: String,
    /// Snippet or content excerpt.
    pub content: String,
    /// Id of the source that produced the record.
    pub engine: String,
    /// Aggregation score.
    pub score: f64,
}

impl From<&Record> for ResponseItem {
    fn from(record: &Record) -> Self {
        Self {
            title: record.title.clone(),
            url: record.url.clone(),
            content: record.content.clone(),
            engine: record.source.clone(),
            score: record.score,
        }
    }
}

/// Serialized shape of a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Query text.
    pub query: String,
    /// Ranked records after truncation.
    pub results: Vec<ResponseItem>,
    /// Number of unique records before truncation.
    pub number_of_results: usize,
    /// One line per failed source, `None` when every source answered.
    pub errors: Option<Vec<String>>,
}

/// Records gathered by the collection entry point, unranked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    /// Deduplicated records in source order.
    pub records: Vec<Record>,
    /// Per-source outcomes.
    pub outcomes: Vec<SourceOutcome>,
}

impl Collection {
    /// Error lines for failed sources.
    pub fn errors(&self) -> Option<Vec<String>> {
        error_lines(&self.outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_default() {
        let default: RecordKind = Default::default();
        assert_eq!(default, RecordKind::Web);
    }

    #[test]
    fn test_record_new_cleans_text() {
        let record = Record::new(
            " https://example.com ",
            "  Rust\n\n<b>1.80</b>  released ",
            "Notes [edit] on   the release",
        );
        assert_eq!(record.url, "https://example.com");
        assert_eq!(record.title, "Rust 1.80 released");
        assert_eq!(record.content, "Notes on the release");
        assert!(record.source.is_empty());
        assert_eq!(record.score, 0.0);
        assert!(record.relevance.is_none());
    }

    #[test]
    fn test_record_builders() {
        let published = DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = Record::new("https://example.com", "t", "c")
            .with_source("feed")
            .with_kind(RecordKind::Feed)
            .with_published(Some(published))
            .with_relevance(0.75)
            .with_extras(RecordExtras {
                author: Some("ferris".into()),
                ..Default::default()
            });
        assert_eq!(record.source, "feed");
        assert_eq!(record.kind, RecordKind::Feed);
        assert_eq!(record.published, Some(published));
        assert_eq!(record.relevance, Some(0.75));
        assert_eq!(record.extras.author.as_deref(), Some("ferris"));
    }

    #[test]
    fn test_record_extras_is_empty() {
        assert!(RecordExtras::default().is_empty());
        let extras = RecordExtras {
            tags: vec!["rust".into()],
            ..Default::default()
        };
        assert!(!extras.is_empty());
    }

    #[test]
    fn test_outcome_from_count() {
        assert_eq!(SourceOutcome::from_count("a", 0, 5).status, OutcomeStatus::Empty);
        assert_eq!(
            SourceOutcome::from_count("a", 3, 5).status,
            OutcomeStatus::Success { records: 3 }
        );
    }

    #[test]
    fn test_outcome_error_message() {
        let outcome = SourceOutcome::failed("bing", ErrorKind::Timeout, "timed out after 10ms", 10);
        assert!(outcome.is_error());
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Timeout));
        assert_eq!(
            outcome.error_message().unwrap(),
            "bing: TimeoutError: timed out after 10ms"
        );
        assert!(SourceOutcome::from_count("a", 1, 0).error_message().is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = SourceOutcome::failed("gh", ErrorKind::HttpStatus, "HTTP status 403", 12);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["source"], "gh");
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "HTTPStatusError");
        assert_eq!(json["elapsed_ms"], 12);
    }

    #[test]
    fn test_result_set_errors_none_when_all_ok() {
        let mut set = ResultSet::new(vec![], 0);
        set.set_outcomes(vec![SourceOutcome::from_count("a", 0, 1)]);
        assert!(set.errors().is_none());
        assert!(set.is_empty());
    }

    #[test]
    fn test_result_set_response_shape() {
        let mut record = Record::new("https://x.com/a", "A", "content").with_source("a");
        record.score = 1.0;
        let mut set = ResultSet::new(vec![record], 4);
        set.set_query("rust programming");
        set.set_outcomes(vec![
            SourceOutcome::from_count("a", 1, 3),
            SourceOutcome::failed("b", ErrorKind::Network, "connection refused", 2),
        ]);

        let json = serde_json::to_value(set.to_response()).unwrap();
        assert_eq!(json["query"], "rust programming");
        assert_eq!(json["number_of_results"], 4);
        assert_eq!(json["results"][0]["url"], "https://x.com/a");
        assert_eq!(json["results"][0]["engine"], "a");
        assert_eq!(json["results"][0]["score"], 1.0);
        assert_eq!(json["errors"][0], "b: NetworkError: connection refused");
    }

    #[test]
    fn test_response_errors_null_without_failures() {
        let set = ResultSet::new(vec![], 0);
        let json = serde_json::to_value(set.to_response()).unwrap();
        assert!(json["errors"].is_null());
    }

    #[test]
    fn test_collection_errors() {
        let collection = Collection {
            records: vec![],
            outcomes: vec![SourceOutcome::failed("r", ErrorKind::Parse, "bad json", 1)],
        };
        assert_eq!(collection.errors().unwrap().len(), 1);
    }
}
