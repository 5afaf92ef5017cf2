//! # center-search
//!
//! A multi-source aggregation engine. One query fans out concurrently to
//! web search engines, metasearch instances, feeds and public APIs; the
//! answers are normalized into a single record shape, deduplicated by
//! canonical URL and ranked.
//!
//! Every source failure is isolated and reported per source. A call always
//! returns within its overall deadline.
//!
//! ## Example
//!
//! ```rust,no_run
//! use center_search::{EngineSettings, Search, SearchQuery, SourceCategory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let search = Search::from_settings(&EngineSettings::default())?;
//!
//!     let query = SearchQuery::new("rust programming")
//!         .with_categories(vec![SourceCategory::General, SourceCategory::News]);
//!     let results = search.search(query).await?;
//!
//!     for result in results.items() {
//!         println!("{}: {} ({})", result.source, result.title, result.url);
//!     }
//!     if let Some(errors) = results.errors() {
//!         eprintln!("{:?}", errors);
//!     }
//!     Ok(())
//! }
//! ```

mod aggregator;
mod dispatcher;
mod error;
mod query;
mod registry;
mod result;
mod search;
mod source;
mod throttle;

pub mod adapters;
pub mod config;
pub mod fetcher;
pub mod fetcher_http;
pub mod text;
pub mod url_normalize;

pub use aggregator::Aggregator;
pub use config::EngineSettings;
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{ErrorKind, Result, SearchError};
pub use fetcher::{PageFetcher, PageRequest};
pub use fetcher_http::HttpFetcher;
pub use query::{SafeSearch, SearchQuery, TimeRange};
pub use registry::Registry;
pub use result::{
    Collection, OutcomeStatus, Record, RecordExtras, RecordKind, ResponseItem, ResultSet,
    SearchResponse, SourceOutcome,
};
pub use search::Search;
pub use source::{
    ParserKind, RequestTemplate, SelectorSet, SourceAdapter, SourceCategory, SourceConfig,
};
