//! Reddit listing source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use super::parse_json;
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::{
    ParserKind, Record, RecordExtras, RecordKind, RequestTemplate, Result, SearchQuery,
    SourceAdapter, SourceCategory, SourceConfig,
};

const REDDIT_ROOT: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    num_comments: Option<u64>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    link_flair_text: Option<String>,
    #[serde(default)]
    stickied: bool,
}

/// Reddit search or subreddit listing.
pub struct Reddit {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl Reddit {
    /// Creates a Reddit-wide search source.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_config(Self::default_config(), fetcher)
    }

    /// Default source configuration: site-wide search.
    pub fn default_config() -> SourceConfig {
        SourceConfig::new(
            "reddit",
            ParserKind::Reddit,
            RequestTemplate::new(format!("{}/search.json", REDDIT_ROOT))
                .with_param("q", "{query}")
                .with_param("limit", "10"),
        )
        .with_name("Reddit")
        .with_categories(vec![SourceCategory::Discussion])
        .with_min_interval(Duration::from_secs(2))
    }

    /// Configuration polling one subreddit sorted by `sort` (hot, new, top).
    pub fn subreddit_config(subreddit: &str, sort: &str, limit: usize) -> SourceConfig {
        SourceConfig::new(
            format!("reddit-{}", subreddit.to_ascii_lowercase()),
            ParserKind::Reddit,
            RequestTemplate::new(format!("{}/r/{}/{}.json", REDDIT_ROOT, subreddit, sort))
                .with_param("limit", limit.to_string()),
        )
        .with_name(format!("Reddit - r/{}", subreddit))
        .with_categories(vec![SourceCategory::Discussion])
        .with_min_interval(Duration::from_secs(2))
    }

    /// Creates with custom configuration.
    pub fn with_config(config: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let fetcher = PacedFetcher::new(fetcher, config.min_interval());
        Self { config, fetcher }
    }

    fn parse_results(&self, body: &str) -> Result<Vec<Record>> {
        let listing: Listing = parse_json(body)?;

        let records = listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .filter(|post| !post.stickied || self.config.include_stickied)
            .take(self.config.max_items.unwrap_or(usize::MAX))
            .map(|post| {
                let content = if !post.selftext.trim().is_empty() {
                    post.selftext.clone()
                } else {
                    match post.url.as_deref() {
                        Some(link) if !link.starts_with(REDDIT_ROOT) && !link.is_empty() => {
                            format!("Link post: {}", link)
                        }
                        _ => String::new(),
                    }
                };
                let published = post
                    .created_utc
                    .and_then(|secs| DateTime::from_timestamp(secs as i64, 0));
                let extras = RecordExtras {
                    author: post.author,
                    votes: post.score,
                    comments: post.num_comments,
                    tags: post.subreddit.into_iter().collect(),
                    label: post.link_flair_text.filter(|f| !f.is_empty()),
                    ..Default::default()
                };

                Record::new(
                    format!("{}{}", REDDIT_ROOT, post.permalink),
                    &post.title,
                    &content,
                )
                .with_source(&self.config.id)
                .with_kind(RecordKind::Discussion)
                .with_published(published)
                .with_extras(extras)
            })
            .collect();

        Ok(records)
    }
}

#[async_trait]
impl SourceAdapter for Reddit {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let url = self.config.request.render(query)?;
        let body = self.fetcher.fetch(&PageRequest::get(url)).await?;
        self.parse_results(&body)
    }
}
