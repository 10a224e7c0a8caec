use crate::client::Article;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Query parameters shared by every provider capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleQuery {
    /// Category or section to browse
    pub category: Option<String>,
    /// Free-text keyword (search only)
    pub keyword: Option<String>,
    /// Location or country hint, interpreted per provider
    pub location: Option<String>,
    /// Maximum results to return
    pub limit: usize,
    /// Offset for pagination
    pub offset: usize,
}

impl ArticleQuery {
    /// Query for a category page
    pub fn category(
        category: impl Into<String>,
        location: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Self {
        Self {
            category: Some(category.into()),
            keyword: None,
            location: location.map(ToString::to_string),
            limit,
            offset,
        }
    }

    /// Query for a keyword search
    pub fn search(
        keyword: impl Into<String>,
        category: Option<&str>,
        location: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Self {
        Self {
            category: category.map(ToString::to_string),
            keyword: Some(keyword.into()),
            location: location.map(ToString::to_string),
            limit,
            offset,
        }
    }

    /// Query for top headlines
    #[must_use]
    pub fn headlines(category: Option<&str>, location: Option<&str>, limit: usize) -> Self {
        Self {
            category: category.map(ToString::to_string),
            keyword: None,
            location: location.map(ToString::to_string),
            limit,
            offset: 0,
        }
    }

    /// Stable fragment used when caching raw provider results
    #[must_use]
    pub fn cache_fragment(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.category.as_deref().unwrap_or("-"),
            self.keyword.as_deref().unwrap_or("-"),
            self.location.as_deref().unwrap_or("-"),
            self.limit,
            self.offset
        )
    }

    /// Page request covering `offset..offset + limit` for APIs that paginate
    /// by page number rather than offset.
    ///
    /// Picks the smallest page size, starting at `limit`, whose page holding
    /// `offset` also reaches `offset + limit`. Aligned offsets keep
    /// `page_size == limit` and `skip == 0`.
    #[must_use]
    pub fn page_window(&self) -> PageWindow {
        let limit = self.limit.max(1);
        let end = self.offset + limit;
        let mut page_size = limit;
        while (self.offset / page_size + 1) * page_size < end {
            page_size += 1;
        }
        let page = self.offset / page_size + 1;
        PageWindow {
            page,
            page_size,
            skip: self.offset - (page - 1) * page_size,
        }
    }
}

/// One provider page plus the leading records to drop from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// One-based page number
    pub page: usize,
    /// Records per page to request
    pub page_size: usize,
    /// Records before `offset` at the head of the page
    pub skip: usize,
}

impl PageWindow {
    /// Trim a fetched page down to the requested slice
    #[must_use]
    pub fn slice<T>(&self, records: Vec<T>, limit: usize) -> Vec<T> {
        records.into_iter().skip(self.skip).take(limit.max(1)).collect()
    }
}

/// Errors that can occur during provider operations
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider error: {0}")]
    Other(String),
}

impl AdapterError {
    /// Stable machine-readable code surfaced in `ProviderError::code`
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "NETWORK_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::RateLimit => "RATE_LIMITED",
            Self::Auth(_) => "AUTH_ERROR",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Other(_) => "PROVIDER_ERROR",
        }
    }

    /// Map a reqwest transport error onto the adapter taxonomy
    pub fn from_transport(provider: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("{provider} request timed out: {err}"))
        } else if err.is_connect() {
            Self::Network(format!("{provider} connection failed: {err}"))
        } else {
            Self::Network(format!("{provider} request failed: {err}"))
        }
    }

    /// Map a non-success HTTP status onto the adapter taxonomy
    #[must_use]
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("{provider} rejected credentials (HTTP {status})")),
            400 => Self::InvalidQuery(format!("{provider}: {body}")),
            429 => Self::RateLimit,
            502..=504 => {
                Self::ServiceUnavailable(format!("{provider} temporarily unavailable ({status})"))
            }
            _ => Self::Network(format!("{provider} HTTP {status}: {body}")),
        }
    }
}

/// Contract every content source implements
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Unique name/identifier for this provider
    fn name(&self) -> &str;

    /// Human-readable description of the provider
    fn description(&self) -> &str;

    /// Whether the provider looks usable right now.
    ///
    /// Must not fail: transport problems report `true` so the request path
    /// attempts the provider and records an explicit error instead.
    async fn is_available(&self) -> bool;

    /// Articles for a category, honoring `limit` and `offset`
    async fn get_articles_by_category(
        &self,
        query: &ArticleQuery,
    ) -> Result<Vec<Article>, AdapterError>;

    /// Keyword search, optionally narrowed by category and location
    async fn search_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, AdapterError>;

    /// Current top headlines
    async fn get_top_headlines(&self, query: &ArticleQuery)
        -> Result<Vec<Article>, AdapterError>;

    /// Turn one raw provider record into an [`Article`], substituting defaults
    /// for missing fields rather than rejecting the record
    fn normalize_article(&self, raw: &serde_json::Value, category: Option<&str>) -> Article;
}

/// Default title for records that arrive without one
pub const MISSING_TITLE: &str = "No title available";

/// Read a string field from a raw record, treating blanks as missing
#[must_use]
pub fn raw_str<'a>(raw: &'a serde_json::Value, pointer: &str) -> Option<&'a str> {
    raw.pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse an RFC 3339 timestamp from a raw record
#[must_use]
pub fn raw_timestamp(
    raw: &serde_json::Value,
    pointer: &str,
) -> Option<chrono::DateTime<chrono::Utc>> {
    raw_str(raw, pointer)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
}
