//! Cursor-based pagination envelope returned by every aggregation entry point.

use crate::client::providers::AdapterError;
use crate::client::Article;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A provider failure reported next to partial results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProviderError {
    /// Provider name
    pub source: String,
    pub message: String,
    /// Machine-readable failure code
    pub code: String,
    /// Whether retrying the request may succeed
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(
        source: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            code: code.into(),
            retryable: true,
        }
    }

    /// Record a provider failure under its stable code
    #[must_use]
    pub fn from_adapter(source: impl Into<String>, error: &AdapterError) -> Self {
        Self::new(source, error.to_string(), error.code())
    }
}

/// Position of an article within a result set.
///
/// Callers only ever see the encoded form; the layout is private to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub id: String,
    #[serde(rename = "p")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "i")]
    pub index: usize,
}

impl Cursor {
    #[must_use]
    pub fn for_article(article: &Article, index: usize) -> Self {
        Self {
            id: article.id.clone(),
            published_at: article.published_at,
            index,
        }
    }

    /// Encode into an opaque token
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing a struct of plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(json)
    }

    /// Decode a token produced by [`Cursor::encode`]
    pub fn decode(token: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidInput {
            field: "after".to_string(),
            reason,
        };
        let bytes = hex::decode(token.trim()).map_err(|e| invalid(format!("malformed cursor: {e}")))?;
        serde_json::from_slice(&bytes).map_err(|e| invalid(format!("malformed cursor: {e}")))
    }

    /// Offset at which the page after this cursor starts
    #[must_use]
    pub const fn next_offset(&self) -> usize {
        self.index + 1
    }
}

/// Offset for a page that starts after the given opaque cursor
pub fn offset_after(after: Option<&str>) -> Result<usize> {
    after.map_or(Ok(0), |token| Cursor::decode(token).map(|c| c.next_offset()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Edge {
    pub node: Article,
    pub cursor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Paginated result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
    pub total_count: usize,
    /// Provider failures collected while building this page; `None` when clean
    pub errors: Option<Vec<ProviderError>>,
}

impl Connection {
    /// JSON Schema describing the serialized envelope, articles included
    #[must_use]
    pub fn json_schema() -> serde_json::Value {
        schemars::schema_for!(Connection).to_value()
    }

    /// Wrap a page of articles that starts at absolute position `offset`
    #[must_use]
    pub fn from_page(
        articles: Vec<Article>,
        offset: usize,
        total_count: usize,
        has_next_page: bool,
        errors: Vec<ProviderError>,
    ) -> Self {
        let edges: Vec<Edge> = articles
            .into_iter()
            .enumerate()
            .map(|(i, node)| {
                let cursor = Cursor::for_article(&node, offset + i).encode();
                Edge { node, cursor }
            })
            .collect();

        let page_info = PageInfo {
            has_next_page,
            has_previous_page: offset > 0,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };

        Self {
            edges,
            page_info,
            total_count,
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    /// Slice `offset..offset + limit` out of a fully materialized result set
    #[must_use]
    pub fn paginate(
        articles: Vec<Article>,
        offset: usize,
        limit: usize,
        errors: Vec<ProviderError>,
    ) -> Self {
        let total_count = articles.len();
        let page: Vec<Article> = articles.into_iter().skip(offset).take(limit).collect();
        let has_next_page = offset + page.len() < total_count;
        Self::from_page(page, offset, total_count, has_next_page, errors)
    }

    /// Empty result carrying only errors
    #[must_use]
    pub fn empty(errors: Vec<ProviderError>) -> Self {
        Self::from_page(Vec::new(), 0, 0, false, errors)
    }

    /// Articles in edge order
    pub fn nodes(&self) -> impl Iterator<Item = &Article> {
        self.edges.iter().map(|e| &e.node)
    }

    #[must_use]
    pub fn into_nodes(self) -> Vec<Article> {
        self.edges.into_iter().map(|e| e.node).collect()
    }

    #[must_use]
    pub fn errors(&self) -> &[ProviderError] {
        self.errors.as_deref().unwrap_or_default()
    }
}
