//! GitHub repository activity: releases and open issues.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{append_params, parse_json};
use crate::fetcher::{PacedFetcher, PageFetcher, PageRequest};
use crate::text::parse_timestamp;
use crate::{
    ParserKind, Record, RecordExtras, RecordKind, RequestTemplate, Result, SearchQuery,
    SourceAdapter, SourceCategory, SourceConfig,
};

/// Releases taken from one repository when `max_items` is unset.
pub const DEFAULT_MAX_RELEASES: usize = 5;

const API_ROOT: &str = "https://api.github.com/repos";

#[derive(Debug, Default, Deserialize)]
struct Account {
    #[serde(default)]
    login: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    name: Option<String>,
    tag_name: String,
    html_url: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    author: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Issue {
    title: String,
    html_url: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    user: Option<Account>,
    #[serde(default)]
    labels: Vec<Label>,
    #[serde(default)]
    comments: Option<u64>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

/// A GitHub repository polled through the REST API.
///
/// The parser identifier selects the mode: `github_releases` lists recent
/// releases, `github_issues` lists open issues with pull requests removed.
pub struct GitHub {
    config: SourceConfig,
    fetcher: PacedFetcher,
}

impl GitHub {
    /// Configuration listing the releases of `owner/repo`.
    pub fn releases_config(repo: &str) -> SourceConfig {
        SourceConfig::new(
            format!("github-releases-{}", repo.replace('/', "-")),
            ParserKind::GithubReleases,
            RequestTemplate::new(format!("{}/{}/releases", API_ROOT, repo)),
        )
        .with_name(format!("GitHub - {}", repo))
        .with_categories(vec![SourceCategory::Code])
        .with_min_interval(Duration::from_secs(1))
    }

    /// Configuration listing the open issues of `owner/repo`.
    pub fn issues_config(repo: &str) -> SourceConfig {
        SourceConfig::new(
            format!("github-issues-{}", repo.replace('/', "-")),
            ParserKind::GithubIssues,
            RequestTemplate::new(format!("{}/{}/issues", API_ROOT, repo))
                .with_param("state", "open")
                .with_param("sort", "created")
                .with_param("per_page", "5"),
        )
        .with_name(format!("GitHub Issues - {}", repo))
        .with_categories(vec![SourceCategory::Code])
        .with_min_interval(Duration::from_secs(1))
    }

    /// Creates with custom configuration.
    pub fn with_config(config: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let fetcher = PacedFetcher::new(fetcher, config.min_interval());
        Self { config, fetcher }
    }

    /// `owner/repo` taken from the request URL, or the display name.
    fn repository(&self) -> String {
        Url::parse(&self.config.request.url)
            .ok()
            .and_then(|url| {
                let segments: Vec<String> = url.path_segments()?.map(str::to_string).collect();
                let at = segments.iter().position(|s| s == "repos")?;
                match (segments.get(at + 1), segments.get(at + 2)) {
                    (Some(owner), Some(repo)) => Some(format!("{}/{}", owner, repo)),
                    _ => None,
                }
            })
            .unwrap_or_else(|| self.config.display_name().to_string())
    }

    fn build_request(&self, query: &SearchQuery) -> Result<PageRequest> {
        let mut url = self.config.request.render(query)?;
        if self.config.paging && query.page > 1 {
            append_params(&mut url, &[("page", query.page.to_string())]);
        }

        let mut request = PageRequest::get(url).with_header("Accept", "application/vnd.github+json");
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.with_header("Authorization", format!("Bearer {}", token));
        }
        Ok(request)
    }

    fn parse_releases(&self, body: &str) -> Result<Vec<Record>> {
        let releases: Vec<Release> = parse_json(body)?;
        let repo = self.repository();
        let max_items = self.config.max_items.unwrap_or(DEFAULT_MAX_RELEASES);

        let records = releases
            .into_iter()
            .take(max_items)
            .map(|release| {
                let name = release
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| release.tag_name.clone());
                let extras = RecordExtras {
                    author: release.author.map(|a| a.login).filter(|l| !l.is_empty()),
                    label: Some(release.tag_name),
                    ..Default::default()
                };
                Record::new(
                    release.html_url,
                    &format!("New Release: {} - {}", name, repo),
                    release.body.as_deref().unwrap_or_default(),
                )
                .with_source(&self.config.id)
                .with_kind(RecordKind::Release)
                .with_published(release.published_at.as_deref().and_then(parse_timestamp))
                .with_extras(extras)
            })
            .collect();

        Ok(records)
    }

    fn parse_issues(&self, body: &str) -> Result<Vec<Record>> {
        let issues: Vec<Issue> = parse_json(body)?;
        let repo = self.repository();

        let records = issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .take(self.config.max_items.unwrap_or(usize::MAX))
            .map(|issue| {
                let extras = RecordExtras {
                    author: issue.user.map(|u| u.login).filter(|l| !l.is_empty()),
                    tags: issue.labels.into_iter().map(|label| label.name).collect(),
                    comments: issue.comments,
                    ..Default::default()
                };
                Record::new(
                    issue.html_url,
                    &format!("Issue: {} - {}", issue.title, repo),
                    issue.body.as_deref().unwrap_or_default(),
                )
                .with_source(&self.config.id)
                .with_kind(RecordKind::Issue)
                .with_published(issue.created_at.as_deref().and_then(parse_timestamp))
                .with_extras(extras)
            })
            .collect();

        Ok(records)
    }
}

#[async_trait]
impl SourceAdapter for GitHub {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>> {
        let request = self.build_request(query)?;
        let body = self.fetcher.fetch(&request).await?;
        match self.config.parser {
            ParserKind::GithubIssues => self.parse_issues(&body),
            _ => self.parse_releases(&body),
        }
    }
}
