use crate::client::pagination::offset_after;
use crate::client::{Aggregator, Connection};
use crate::enrichment::{EnrichmentPipeline, PipelineOptions};
use crate::ranking::{RankOptions, Ranker, TopStories};
use crate::repositories::InMemoryCache;
use crate::{Config, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// Running totals for the service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub requests_handled: u64,
    /// Provider failures reported alongside results
    pub provider_errors: u64,
    /// Requests that came back with no articles at all
    pub empty_results: u64,
}

/// The four news operations exposed to callers.
///
/// Provider and enrichment failures never surface as `Err`; they end up in
/// `Connection::errors`. Only caller mistakes, such as a malformed cursor, do.
pub struct NewsService {
    aggregator: Arc<Aggregator>,
    pipeline: Arc<EnrichmentPipeline>,
    top_stories: TopStories,
    cache: Arc<InMemoryCache>,
    enrich_results: bool,
    availability_refresh: Duration,
    stats: RwLock<ServiceStats>,
}

impl NewsService {
    /// Wire a service from already-built parts
    #[must_use]
    pub fn new(
        aggregator: Arc<Aggregator>,
        pipeline: Arc<EnrichmentPipeline>,
        ranker: Ranker,
        enrich_results: bool,
    ) -> Self {
        let availability_refresh = aggregator.config().availability_refresh;
        Self {
            top_stories: TopStories::new(Arc::clone(&pipeline), ranker),
            cache: Arc::clone(pipeline.cache()),
            aggregator,
            pipeline,
            enrich_results,
            availability_refresh,
            stats: RwLock::new(ServiceStats::default()),
        }
    }

    /// Build the whole stack from configuration, with heuristic-only enrichment
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Arc::new(InMemoryCache::new(config.cache.settings()));
        let aggregator = Aggregator::from_config(config, Some(Arc::clone(&cache)))?;
        let pipeline = EnrichmentPipeline::new(cache, PipelineOptions::from(&config.pipeline));

        info!(
            "News service ready (enrich_results = {})",
            config.service.enrich_results
        );
        Ok(Self::new(
            Arc::new(aggregator),
            Arc::new(pipeline),
            Ranker::new(RankOptions::from(&config.ranking)),
            config.service.enrich_results,
        ))
    }

    /// Start the cache sweeper and the provider availability refresh
    pub fn start_background_tasks(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.cache.spawn_sweeper(),
            self.aggregator
                .spawn_availability_refresh(self.availability_refresh),
        ]
    }

    #[must_use]
    pub const fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    #[must_use]
    pub const fn pipeline(&self) -> &Arc<EnrichmentPipeline> {
        &self.pipeline
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<InMemoryCache> {
        &self.cache
    }

    pub async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }

    /// Enrich page nodes in place when asked to; cursors and edge order stay put
    async fn finish(&self, mut connection: Connection, enrich: bool) -> Connection {
        if enrich && !connection.edges.is_empty() {
            let nodes = connection.edges.iter().map(|e| e.node.clone()).collect();
            let enriched = self.pipeline.enrich_in_order(nodes).await;
            for (edge, node) in connection.edges.iter_mut().zip(enriched) {
                edge.node = node;
            }
        }

        let mut stats = self.stats.write().await;
        stats.requests_handled += 1;
        stats.provider_errors += connection.errors().len() as u64;
        if connection.edges.is_empty() {
            stats.empty_results += 1;
        }
        connection
    }

    /// Articles in a category, resuming after an optional cursor
    #[instrument(skip(self))]
    pub async fn fetch_by_category(
        &self,
        category: &str,
        location: Option<&str>,
        first: usize,
        after: Option<&str>,
    ) -> Result<Connection> {
        let offset = offset_after(after)?;
        let connection = self
            .aggregator
            .fetch_by_category(category, location, first, offset, None)
            .await;
        Ok(self.finish(connection, self.enrich_results).await)
    }

    /// Keyword search, resuming after an optional cursor
    #[instrument(skip(self))]
    pub async fn search_articles(
        &self,
        keyword: &str,
        category: Option<&str>,
        location: Option<&str>,
        first: usize,
        after: Option<&str>,
    ) -> Result<Connection> {
        let offset = offset_after(after)?;
        let connection = self
            .aggregator
            .search_articles(keyword, category, location, first, offset, None)
            .await;
        Ok(self.finish(connection, self.enrich_results).await)
    }

    /// Current top headlines
    #[instrument(skip(self))]
    pub async fn fetch_top_headlines(
        &self,
        category: Option<&str>,
        location: Option<&str>,
        first: usize,
    ) -> Result<Connection> {
        let connection = self
            .aggregator
            .get_top_headlines(category, location, first, None)
            .await;
        Ok(self.finish(connection, self.enrich_results).await)
    }

    /// Best stories across several categories, always enriched and ranked
    #[instrument(skip(self))]
    pub async fn fetch_top_stories_across_categories(
        &self,
        categories: &[String],
        location: Option<&str>,
        first: usize,
    ) -> Result<Connection> {
        if categories.is_empty() || first == 0 {
            return Ok(self.finish(Connection::empty(Vec::new()), false).await);
        }

        let (by_category, errors) = self
            .aggregator
            .fetch_categories(categories, location, first)
            .await;
        let stories = self.top_stories.get_top_stories(by_category, first).await;
        let total_count = stories.len();

        // Stories are already enriched.
        let connection = Connection::from_page(stories, 0, total_count, false, errors);
        Ok(self.finish(connection, false).await)
    }
}
