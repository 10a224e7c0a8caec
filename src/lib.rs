pub mod client;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod ranking;
pub mod repositories;
pub mod resilience;
pub mod service;

pub use client::{Aggregator, AggregatorConfig, Article, Connection, Enrichment, ProviderError};
pub use config::{Config, ConfigOverrides};
pub use enrichment::{EnrichmentCapability, EnrichmentPipeline, PipelineOptions};
pub use error::{Error, Result};
pub use ranking::{RankOptions, Ranker, TopStories};
pub use repositories::{ContentType, InMemoryCache};
pub use resilience::{Deadline, TimeoutExt};
pub use service::{NewsService, ServiceStats};
