pub mod normalize;

use codequest_core::{ResultItem, ResultSet, Source};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "CodeQuestSearch/1.0";
pub const DEFAULT_REDDIT_BASE: &str = "https://www.reddit.com";
pub const DEFAULT_STACK_EXCHANGE_BASE: &str = "https://api.stackexchange.com";

#[derive(Debug, Error)]
pub enum SearchFailure {
    #[error("Search query is required")]
    EmptyQuery,
    #[error("{upstream} search request failed: {detail}")]
    Request { upstream: Source, detail: String },
    #[error("{upstream} returned an unreadable payload: {detail}")]
    Decode { upstream: Source, detail: String },
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub reddit_base: Url,
    pub stack_exchange_base: Url,
    pub user_agent: String,
    pub timeout: Duration,
    /// `limit` sent to Reddit.
    pub reddit_limit: u32,
    /// Stack Exchange `site` id.
    pub site: String,
    /// Stack Exchange content filter; `withbody` includes question bodies.
    pub content_filter: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            reddit_base: Url::parse(DEFAULT_REDDIT_BASE).expect("valid default url"),
            stack_exchange_base: Url::parse(DEFAULT_STACK_EXCHANGE_BASE)
                .expect("valid default url"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(12),
            reddit_limit: 10,
            site: "stackoverflow".to_string(),
            content_filter: "withbody".to_string(),
        }
    }
}

/// Issues the two upstream searches and normalizes both payloads.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> reqwest::Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn reddit_url(&self, query: &str) -> Result<Url, SearchFailure> {
        let mut url = endpoint(&self.config.reddit_base, &["search.json"], Source::Reddit)?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &self.config.reddit_limit.to_string());
        Ok(url)
    }

    pub fn stack_exchange_url(&self, query: &str) -> Result<Url, SearchFailure> {
        let base = &self.config.stack_exchange_base;
        let mut url = endpoint(base, &["2.3", "search"], Source::StackOverflow)?;
        url.query_pairs_mut()
            .append_pair("order", "desc")
            .append_pair("sort", "relevance")
            .append_pair("intitle", query)
            .append_pair("site", &self.config.site)
            .append_pair("filter", &self.config.content_filter);
        Ok(url)
    }

    /// Run both searches concurrently. Either failing fails the whole call; nothing is retried.
    pub async fn fetch_results(&self, query: &str) -> Result<ResultSet, SearchFailure> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchFailure::EmptyQuery);
        }
        tracing::info!(query = %query, "searching upstreams");
        let (reddit, stack_overflow) =
            tokio::try_join!(self.fetch_reddit(query), self.fetch_stack_overflow(query))
            .map_err(|e| {
                tracing::warn!(query = %query, error = %e, "upstream search failed");
                e
            })?;
        tracing::info!(
            query = %query,
            reddit = reddit.len(),
            stack_overflow = stack_overflow.len(),
            "search complete"
        );
        Ok(ResultSet::new(reddit, stack_overflow))
    }

    async fn fetch_reddit(&self, query: &str) -> Result<Vec<ResultItem>, SearchFailure> {
        let bytes = self.get(Source::Reddit, self.reddit_url(query)?).await?;
        normalize::parse_reddit(&bytes)
            .map_err(|e| SearchFailure::Decode { upstream: Source::Reddit, detail: e.to_string() })
    }

    async fn fetch_stack_overflow(&self, query: &str) -> Result<Vec<ResultItem>, SearchFailure> {
        let bytes = self.get(Source::StackOverflow, self.stack_exchange_url(query)?).await?;
        normalize::parse_stack_exchange(&bytes)
            .map_err(|e| SearchFailure::Decode {
                upstream: Source::StackOverflow,
                detail: e.to_string(),
            })
    }

    async fn get(&self, upstream: Source, url: Url) -> Result<Vec<u8>, SearchFailure> {
        let request_failed =
            |e: reqwest::Error| SearchFailure::Request { upstream, detail: e.to_string() };
        tracing::debug!(%url, "upstream request");
        let resp = self.http.get(url).send().await.map_err(request_failed)?;
        let resp = resp.error_for_status().map_err(request_failed)?;
        let bytes = resp.bytes().await.map_err(request_failed)?;
        Ok(bytes.to_vec())
    }
}

fn endpoint(base: &Url, segments: &[&str], upstream: Source) -> Result<Url, SearchFailure> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SearchFailure::Request {
            upstream,
            detail: format!("invalid base url '{}'", base),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
