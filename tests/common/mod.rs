//! Fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use newsflow::client::providers::{AdapterError, ArticleQuery, ProviderAdapter};
use newsflow::client::Sentiment;
use newsflow::enrichment::ExtractedInfo;
use newsflow::{Article, EnrichmentCapability, Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scriptable provider: serves a fixed article list, honoring limit and offset
pub struct FakeProvider {
    name: String,
    articles: Vec<Article>,
    fail: bool,
    available: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(name: &str, articles: Vec<Article>) -> Self {
        Self {
            name: name.to_string(),
            articles,
            fail: false,
            available: true,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, Vec::new())
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn serve(&self, query: &ArticleQuery) -> std::result::Result<Vec<Article>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AdapterError::ServiceUnavailable(format!(
                "{} is down",
                self.name
            )));
        }
        Ok(self
            .articles
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProviderAdapter for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "in-memory test provider"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn get_articles_by_category(
        &self,
        query: &ArticleQuery,
    ) -> std::result::Result<Vec<Article>, AdapterError> {
        self.serve(query).await
    }

    async fn search_articles(
        &self,
        query: &ArticleQuery,
    ) -> std::result::Result<Vec<Article>, AdapterError> {
        self.serve(query).await
    }

    async fn get_top_headlines(
        &self,
        query: &ArticleQuery,
    ) -> std::result::Result<Vec<Article>, AdapterError> {
        self.serve(query).await
    }

    fn normalize_article(&self, _raw: &serde_json::Value, _category: Option<&str>) -> Article {
        Article::new(self.name.as_str(), "", "raw")
    }
}

/// Capability with canned answers; `fail` makes every call error
pub struct FakeCapability {
    pub category: String,
    pub relevance: f64,
    pub importance: f64,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeCapability {
    pub fn new(category: &str, relevance: f64, importance: f64) -> Self {
        Self {
            category: category.to_string(),
            relevance,
            importance,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("unused", 0.0, 0.0)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T>(&self, value: T) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(Error::enrichment("fake", "model unavailable"))
        } else {
            Ok(value)
        }
    }
}

#[async_trait]
impl EnrichmentCapability for FakeCapability {
    fn name(&self) -> &str {
        "fake"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.answer(format!("summary of {} chars", text.len()))
    }

    async fn categorize(&self, _text: &str) -> Result<String> {
        self.answer(self.category.clone())
    }

    async fn extract_info(&self, _text: &str) -> Result<ExtractedInfo> {
        self.answer(ExtractedInfo {
            entities: vec!["Acme".to_string()],
            topics: vec!["markets".to_string()],
            sentiment: Sentiment::neutral(),
            importance: self.importance,
        })
    }

    async fn score_relevance(&self, _text: &str, _context: &str) -> Result<f64> {
        self.answer(self.relevance)
    }
}

pub fn article(source: &str, n: usize) -> Article {
    Article::new(source, format!("https://{source}.test/{n}"), format!("{source} story {n}"))
        .with_description(format!("Description for {source} story number {n}"))
}

pub fn articles(source: &str, count: usize) -> Vec<Article> {
    (0..count).map(|n| article(source, n)).collect()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::hours(hours)
}

pub fn shared<P: ProviderAdapter + 'static>(provider: P) -> Arc<P> {
    Arc::new(provider)
}
