use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch.
pub type Timestamp = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    Reddit,
    StackOverflow,
}

impl Source {
    /// Human-readable tag used to prefix digest rows, e.g. "Reddit: <title>".
    pub fn tag(self) -> &'static str {
        match self {
            Source::Reddit => "Reddit",
            Source::StackOverflow => "Stack Overflow",
        }
    }

    /// Site that relative links from this source are resolved against.
    pub fn site_root(self) -> &'static str {
        match self {
            Source::Reddit => "https://reddit.com",
            Source::StackOverflow => "https://stackoverflow.com",
        }
    }

    /// Joins a relative permalink onto the source's site root; absolute links pass through.
    pub fn absolute_link(self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            return link.to_string();
        }
        if link.starts_with('/') {
            format!("{}{}", self.site_root(), link)
        } else {
            format!("{}/{}", self.site_root(), link)
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One search hit, normalized from either upstream's payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub source: Source,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub score: i64,
    /// Comments for Reddit, answers for Stack Overflow.
    #[serde(default)]
    pub secondary_metric: u64,
    pub created_at: Timestamp,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    #[serde(default)]
    pub reddit: Vec<ResultItem>,
    #[serde(default)]
    pub stack_overflow: Vec<ResultItem>,
}

impl ResultSet {
    pub fn new(reddit: Vec<ResultItem>, stack_overflow: Vec<ResultItem>) -> Self {
        Self { reddit, stack_overflow }
    }

    pub fn is_empty(&self) -> bool {
        self.reddit.is_empty() && self.stack_overflow.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reddit.len() + self.stack_overflow.len()
    }
}
