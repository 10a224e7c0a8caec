//! # Repository Layer
//!
//! Storage abstractions used by the aggregation and enrichment paths. The only
//! backend is the in-process [`InMemoryCache`]; nothing here is persisted.
//!
//! ## Usage Example
//!
//! ```no_run
//! use newsflow::repositories::{ContentType, InMemoryCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = InMemoryCache::default();
//! cache.set("summarize:https://x/1", "A summary".to_string(), None, Some(ContentType::Summary)).await?;
//!
//! let summary: Option<String> = cache.get("summarize:https://x/1").await?;
//! assert!(summary.is_some());
//! # Ok(())
//! # }
//! ```

pub mod cache;

pub use cache::{CacheEntry, CacheSettings, CacheStats, ContentType, InMemoryCache};

/// Errors raised by the cache
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },
}

/// Repository result type
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
