//! Paginated retrieval of issues from the GitHub REST API.
//!
//! The pagination loop is written once over [`PageSource`]; [`GitHubClient`]
//! is the network implementation.

use std::fmt::Display;

use reqwest::header::HeaderMap;
use tracing::{debug, info, warn};

use crate::error::{FetchError, RateLimit};
use crate::models::{Issue, RawIssue, RecordError};

/// GitHub refuses to return more than this many items per page
pub const MAX_PAGE_SIZE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    Open,
    Closed,
    All,
}

impl StateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        }
    }
}

impl Display for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueQuery {
    pub state: StateFilter,
    pub label: Option<String>,
}

impl IssueQuery {
    pub fn new(state: StateFilter) -> Self {
        Self { state, label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Display for IssueQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "state={} label={label:?}", self.state),
            None => write!(f, "state={}", self.state),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub page_size: u8,
    pub max_pages: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_pages: 10,
        }
    }
}

/// Something that can hand out one page of raw issue objects at a time.
pub trait PageSource: Sync {
    /// Fetch page `page` (1-based) of the issues matching `query`.
    fn fetch_page(
        &self,
        query: &IssueQuery,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<serde_json::Value>, FetchError>;

    /// Current counters of the anonymous rate limit window.
    fn fetch_rate_limit(&self) -> Result<RateLimit, FetchError>;
}

/// Fetch every issue matching `query`, walking pages in order until a short
/// or empty page, or until `max_pages` pages have been requested.
///
/// Any failed page fails the whole fetch: pages already received are dropped.
pub fn fetch_issues<S: PageSource + ?Sized>(
    source: &S,
    query: &IssueQuery,
    options: FetchOptions,
) -> Result<Vec<Issue>, FetchError> {
    let per_page = options.page_size.clamp(1, MAX_PAGE_SIZE);
    if per_page != options.page_size {
        warn!(
            requested = options.page_size,
            used = per_page,
            "page size out of range, clamping"
        );
    }

    info!("fetching issues with {query}");

    let mut issues = Vec::new();
    for page in 1..=options.max_pages {
        let items = source.fetch_page(query, page, per_page)?;
        let received = items.len();
        debug!(page, received, "received page");

        issues.extend(items.into_iter().filter_map(into_issue));

        // A short page is the last one; an empty page means we went past it
        if received < usize::from(per_page) {
            break;
        }
        if page == options.max_pages {
            warn!(max_pages = options.max_pages, "page limit reached, there may be more issues");
        }
    }

    info!("found {} issues with {query}", issues.len());
    Ok(issues)
}

fn into_issue(value: serde_json::Value) -> Option<Issue> {
    let raw = match serde_json::from_value::<RawIssue>(value) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("skipping issue record that does not deserialise: {e}");
            return None;
        }
    };
    let number = raw.number;
    match raw.validate() {
        Ok(issue) => Some(issue),
        Err(RecordError::PullRequest) => {
            debug!(?number, "skipping pull request");
            None
        }
        Err(e) => {
            warn!(?number, "skipping issue record: {e}");
            None
        }
    }
}

#[derive(Debug, serde::Deserialize, Hash, Eq, PartialEq)]
struct GitHubError {
    pub message: String,
    pub documentation_url: Option<String>,
}

impl Display for GitHubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.documentation_url {
            Some(url) => write!(f, "{} ({url})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum GitHubResponse<T> {
    Data(Vec<T>),
    Error(GitHubError),
}

#[derive(Debug, serde::Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, serde::Deserialize)]
struct RateLimitResources {
    core: RateLimitCounters,
}

#[derive(Debug, serde::Deserialize)]
struct RateLimitCounters {
    limit: u32,
    remaining: u32,
    reset: i64,
}

/// Read the `x-ratelimit-*` headers, if GitHub sent them.
fn rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimit> {
    let read = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    Some(RateLimit {
        limit: read("x-ratelimit-limit").and_then(|v| v.parse().ok()),
        remaining: read("x-ratelimit-remaining")?.parse().ok()?,
        reset: read("x-ratelimit-reset")?.parse().ok()?,
    })
}

/// Anonymous, read-only client for the issues of one repository.
pub struct GitHubClient {
    http: reqwest::blocking::Client,
    api_base: String,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(
        api_base: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("gh-buddy-stats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let api_base: String = api_base.into();
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn issues_url(&self, query: &IssueQuery, page: u32, per_page: u8) -> String {
        let label = match &query.label {
            Some(label) => format!("&labels={}", urlencoding::encode(label)),
            None => String::new(),
        };
        format!(
            "{}/repos/{}/{}/issues?state={}&sort=created&direction=desc&per_page={per_page}&page={page}{label}",
            self.api_base, self.owner, self.repo, query.state
        )
    }

    /// GET `url` and return the body of a 2xx response.
    fn get(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        let rate_limit = rate_limit_from_headers(response.headers());
        let content = response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<GitHubError>(&content) {
                Ok(e) => e.to_string(),
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            };
            return Err(FetchError::Transient {
                status: status.as_u16(),
                message,
                rate_limit,
            });
        }

        Ok(content)
    }
}

impl PageSource for GitHubClient {
    fn fetch_page(
        &self,
        query: &IssueQuery,
        page: u32,
        per_page: u8,
    ) -> Result<Vec<serde_json::Value>, FetchError> {
        let content = self.get(&self.issues_url(query, page, per_page))?;
        parse_page(&content)
    }

    fn fetch_rate_limit(&self) -> Result<RateLimit, FetchError> {
        let content = self.get(&format!("{}/rate_limit", self.api_base))?;
        let response: RateLimitResponse = serde_json::from_str(&content)
            .map_err(|e| FetchError::Malformed(format!("rate limit payload: {e}")))?;
        let core = response.resources.core;
        Ok(RateLimit {
            limit: Some(core.limit),
            remaining: core.remaining,
            reset: core.reset,
        })
    }
}

/// A page must be a JSON array; anything else fails the fetch.
fn parse_page(content: &str) -> Result<Vec<serde_json::Value>, FetchError> {
    match serde_json::from_str::<GitHubResponse<serde_json::Value>>(content) {
        Ok(GitHubResponse::Data(items)) => Ok(items),
        Ok(GitHubResponse::Error(e)) => Err(FetchError::Malformed(e.to_string())),
        Err(e) => Err(FetchError::Malformed(format!("expected an array of issues: {e}"))),
    }
}
