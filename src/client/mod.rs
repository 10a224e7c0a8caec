pub mod aggregator;
pub mod pagination;
pub mod providers;

pub use aggregator::{Aggregator, AggregatorConfig, Operation};
pub use pagination::{Connection, Cursor, Edge, PageInfo, ProviderError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// HTTP client configuration shared by the provider adapters
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            user_agent: concat!("newsflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Build a reqwest client from this configuration
    pub fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent)
            .build()
    }
}

/// Derive the stable article id from `(source, url, title)`.
///
/// The id is the first 32 hex characters of a SHA-256 over the three fields,
/// so the same article from the same provider always maps to the same id.
#[must_use]
pub fn article_id(source: &str, url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

/// Sentiment label assigned by the extraction stage
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Parse a free-form label returned by a model; anything unknown is neutral
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Self::Positive,
            "negative" | "neg" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

/// Sentiment with the classifier's confidence in `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl Sentiment {
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            confidence: 0.5,
        }
    }
}

/// AI-derived annotations, filled in stage by stage.
///
/// A `None` field means the stage was skipped, disabled, or degraded without a
/// usable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
}

/// Normalized article shared by every provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Content-hash id, see [`article_id`]
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    /// Deduplication key; empty when the provider supplied none
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

impl Article {
    /// Create an article, deriving its id from source, url and title
    pub fn new(
        source: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let url = url.into();
        let title = title.into();
        Self {
            id: article_id(&source, &url, &title),
            title,
            description: String::new(),
            content: None,
            url,
            source,
            published_at: None,
            category: None,
            image_url: None,
            enrichment: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub const fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Cache identity: the url, or the title when the url is empty
    #[must_use]
    pub fn identity(&self) -> &str {
        if self.url.is_empty() {
            &self.title
        } else {
            &self.url
        }
    }

    /// Body text, falling back to the description when content is absent
    #[must_use]
    pub fn body(&self) -> &str {
        match self.content.as_deref() {
            Some(content) if !content.trim().is_empty() => content,
            _ => &self.description,
        }
    }

    /// Text handed to enrichment capabilities
    #[must_use]
    pub fn analysis_text(&self) -> String {
        let body = self.body();
        if body.is_empty() {
            self.title.clone()
        } else {
            format!("{}. {}", self.title, body)
        }
    }

    /// Final score from enrichment, if the scoring stage produced one
    #[must_use]
    pub fn final_score(&self) -> Option<f64> {
        self.enrichment.as_ref().and_then(|e| e.final_score)
    }

    /// Category after enrichment, falling back to the provider's category
    #[must_use]
    pub fn effective_category(&self) -> Option<&str> {
        self.enrichment
            .as_ref()
            .and_then(|e| e.category.as_deref())
            .or(self.category.as_deref())
    }

    /// Attach enrichment without touching any identity field
    #[must_use]
    pub fn enriched(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = Some(enrichment);
        self
    }
}
