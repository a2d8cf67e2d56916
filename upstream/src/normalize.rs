//! Payload shapes for both upstream APIs and their mapping onto [`ResultItem`].

use codequest_core::{ResultItem, Source};
use html_escape::decode_html_entities;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct RedditListing {
    #[serde(default)]
    pub data: Option<RedditListingData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RedditListingData {
    #[serde(default)]
    pub children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
pub struct RedditChild {
    pub data: RedditPost,
}

#[derive(Debug, Deserialize)]
pub struct RedditPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    /// Reddit reports fractional epoch seconds.
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub permalink: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StackExchangeResponse {
    #[serde(default)]
    pub items: Vec<StackExchangeQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct StackExchangeQuestion {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body_markdown: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub answer_count: u64,
    #[serde(default)]
    pub creation_date: i64,
    #[serde(default)]
    pub link: String,
}

impl From<RedditPost> for ResultItem {
    fn from(post: RedditPost) -> Self {
        ResultItem {
            source: Source::Reddit,
            title: decode_html_entities(&post.title).into_owned(),
            body: post.selftext.unwrap_or_default(),
            score: post.score,
            secondary_metric: post.num_comments,
            // Rounded up so a post half a second inside a window stays inside it.
            created_at: post.created_utc.ceil() as i64,
            link: Source::Reddit.absolute_link(&post.permalink),
        }
    }
}

impl From<StackExchangeQuestion> for ResultItem {
    fn from(q: StackExchangeQuestion) -> Self {
        // The API entity-encodes titles and markdown bodies.
        let body = q.body_markdown.or(q.body).unwrap_or_default();
        ResultItem {
            source: Source::StackOverflow,
            title: decode_html_entities(&q.title).into_owned(),
            body: decode_html_entities(&body).into_owned(),
            score: q.score,
            secondary_metric: q.answer_count,
            created_at: q.creation_date,
            link: Source::StackOverflow.absolute_link(&q.link),
        }
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Parse a Reddit search listing. An empty payload yields no items.
pub fn parse_reddit(bytes: &[u8]) -> Result<Vec<ResultItem>, serde_json::Error> {
    if is_blank(bytes) {
        return Ok(Vec::new());
    }
    let listing: RedditListing = serde_json::from_slice(bytes)?;
    Ok(listing
        .data
        .unwrap_or_default()
        .children
        .into_iter()
        .map(|child| child.data.into())
        .collect())
}

/// Parse a Stack Exchange search response. An empty payload yields no items.
pub fn parse_stack_exchange(bytes: &[u8]) -> Result<Vec<ResultItem>, serde_json::Error> {
    if is_blank(bytes) {
        return Ok(Vec::new());
    }
    let resp: StackExchangeResponse = serde_json::from_slice(bytes)?;
    Ok(resp.items.into_iter().map(ResultItem::from).collect())
}
