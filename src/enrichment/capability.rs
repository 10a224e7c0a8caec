use crate::client::Sentiment;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Structured facts pulled out of an article body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    pub entities: Vec<String>,
    pub topics: Vec<String>,
    pub sentiment: Sentiment,
    /// Editorial importance in `[0, 10]`
    pub importance: f64,
}

/// AI surface the enrichment pipeline calls into.
///
/// Every method may fail; the pipeline substitutes a local heuristic for any
/// failure, so implementations should return errors rather than guesses.
#[async_trait]
pub trait EnrichmentCapability: Send + Sync {
    /// Get the name of this capability for logs
    fn name(&self) -> &str;

    /// Short abstract of `text`
    async fn summarize(&self, text: &str) -> Result<String>;

    /// Single lowercase category label for `text`
    async fn categorize(&self, text: &str) -> Result<String>;

    /// Entities, topics, sentiment and importance
    async fn extract_info(&self, text: &str) -> Result<ExtractedInfo>;

    /// Relevance of `text` to `context`, in `[0, 10]`
    async fn score_relevance(&self, text: &str, context: &str) -> Result<f64>;

    /// Whether two texts report the same story.
    ///
    /// Optional; the default reports the capability as unsupported and callers
    /// fall back to title similarity.
    async fn detect_duplicate(&self, _a: &str, _b: &str) -> Result<bool> {
        Err(Error::Unsupported {
            capability: "detect_duplicate".to_string(),
        })
    }
}
