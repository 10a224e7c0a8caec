use crate::client::pagination::{Connection, ProviderError};
use crate::client::providers::{
    AdapterError, ArticleQuery, GuardianProvider, NewsApiProvider, ProviderAdapter,
};
use crate::client::{Article, HttpClientConfig};
use crate::config::{AggregatorSettings, Config};
use crate::repositories::{ContentType, InMemoryCache};
use crate::resilience::{Deadline, TimeoutExt};
use crate::Result;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Code reported for providers never attempted because the request ran out of time
pub const DEADLINE_EXCEEDED: &str = "DEADLINE_EXCEEDED";
/// Code reported when no provider is registered at all
pub const NO_PROVIDERS: &str = "NO_PROVIDERS";

/// Configuration for aggregation behavior
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Provider priority used when a request names none
    pub default_order: Vec<String>,
    /// Timeout for each provider call
    pub provider_timeout: Duration,
    /// Upper bound on a whole request, across every provider attempt
    pub request_deadline: Duration,
    /// Interval of the background availability probe
    pub availability_refresh: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::from(&AggregatorSettings::default())
    }
}

impl From<&AggregatorSettings> for AggregatorConfig {
    fn from(settings: &AggregatorSettings) -> Self {
        Self {
            default_order: settings.default_order.clone(),
            provider_timeout: Duration::from_secs(settings.provider_timeout_secs),
            request_deadline: Duration::from_secs(settings.request_deadline_secs),
            availability_refresh: Duration::from_secs(settings.availability_refresh_secs),
        }
    }
}

/// Provider capability a request maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Category,
    Search,
    Headlines,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Search => "search",
            Self::Headlines => "headlines",
        }
    }
}

/// What one pass over the provider list produced
#[derive(Debug, Default)]
struct Collected {
    articles: Vec<Article>,
    errors: Vec<ProviderError>,
    /// Some provider filled the whole requested page
    full_page: bool,
}

impl Collected {
    fn into_connection(self, limit: usize, offset: usize) -> Connection {
        let mut unique = dedupe_by_url(self.articles);
        let total_count = unique.len();
        let has_next_page = total_count > limit || self.full_page;
        unique.truncate(limit);
        Connection::from_page(unique, offset, total_count, has_next_page, self.errors)
    }
}

/// Keep the first article seen for each non-empty URL.
///
/// Articles without a URL are never considered duplicates of one another.
#[must_use]
pub fn dedupe_by_url(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| article.url.is_empty() || seen.insert(article.url.clone()))
        .collect()
}

/// Multi-source aggregator with prioritized fallback between providers
pub struct Aggregator {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    config: AggregatorConfig,
    cache: Option<Arc<InMemoryCache>>,
    /// Last probed availability; replaced wholesale by `refresh_availability`
    availability: RwLock<Arc<HashMap<String, bool>>>,
}

impl Aggregator {
    /// Create an aggregator with no providers registered
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            providers: HashMap::new(),
            config,
            cache: None,
            availability: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Build an aggregator with every enabled provider from the configuration
    pub fn from_config(config: &Config, cache: Option<Arc<InMemoryCache>>) -> Result<Self> {
        let http = HttpClientConfig::default();
        let mut aggregator = Self::new(AggregatorConfig::from(&config.aggregator));
        if let Some(cache) = cache {
            aggregator = aggregator.with_cache(cache);
        }

        if config.providers.newsapi.enabled {
            aggregator.register(Arc::new(NewsApiProvider::new(&config.providers.newsapi, &http)?));
        }
        if config.providers.guardian.enabled {
            aggregator.register(Arc::new(GuardianProvider::new(
                &config.providers.guardian,
                &http,
            )?));
        }

        info!(
            "Initialized aggregator with {} providers: {:?}",
            aggregator.providers.len(),
            aggregator.providers()
        );
        Ok(aggregator)
    }

    /// Share a cache for raw provider results
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<InMemoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Register a provider under its own name, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn ProviderAdapter>) {
        debug!("Registering provider {}", provider.name());
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Names of the registered providers, sorted
    #[must_use]
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Current availability snapshot; providers never probed are absent
    pub async fn availability(&self) -> Arc<HashMap<String, bool>> {
        Arc::clone(&*self.availability.read().await)
    }

    /// Probe every provider and publish a fresh availability snapshot
    #[instrument(skip(self))]
    pub async fn refresh_availability(&self) -> Arc<HashMap<String, bool>> {
        let probe_timeout = self.config.provider_timeout;
        let probes: Vec<_> = self
            .providers
            .iter()
            .map(|(name, provider)| async move {
                let available = provider
                    .is_available()
                    .with_timeout_duration(probe_timeout)
                    .await
                    .unwrap_or(true);
                (name.clone(), available)
            })
            .collect();

        let snapshot: HashMap<String, bool> = join_all(probes).await.into_iter().collect();
        for (name, available) in &snapshot {
            if *available {
                debug!("Provider {} is available", name);
            } else {
                warn!("Provider {} is unavailable", name);
            }
        }

        let snapshot = Arc::new(snapshot);
        *self.availability.write().await = Arc::clone(&snapshot);
        snapshot
    }

    /// Re-probe availability on a fixed interval, starting immediately.
    ///
    /// The task holds only a weak reference and exits once the aggregator is
    /// dropped.
    pub fn spawn_availability_refresh(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now(), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let Some(aggregator) = weak.upgrade() else {
                    debug!("Aggregator dropped, stopping availability refresh");
                    break;
                };
                aggregator.refresh_availability().await;
            }
        })
    }

    /// Providers to try, in order, for one request
    async fn provider_order(&self, preferred: Option<&[String]>) -> Vec<Arc<dyn ProviderAdapter>> {
        let known = |names: &[String]| -> Vec<Arc<dyn ProviderAdapter>> {
            names
                .iter()
                .filter_map(|name| {
                    let provider = self.providers.get(name);
                    if provider.is_none() {
                        debug!("Skipping unknown provider {}", name);
                    }
                    provider.cloned()
                })
                .collect()
        };

        let availability = self.availability().await;
        let order = preferred.unwrap_or(&self.config.default_order);
        let filtered: Vec<_> = known(order)
            .into_iter()
            .filter(|p| availability.get(p.name()).copied().unwrap_or(true))
            .collect();

        if filtered.is_empty() {
            debug!("No available providers in requested order, using default order");
            known(&self.config.default_order)
        } else {
            filtered
        }
    }

    async fn call_provider(
        &self,
        provider: &dyn ProviderAdapter,
        operation: Operation,
        query: &ArticleQuery,
        budget: Duration,
    ) -> std::result::Result<Vec<Article>, AdapterError> {
        let key = format!(
            "articles:{}:{}:{}",
            provider.name(),
            operation.as_str(),
            query.cache_fragment()
        );

        if let Some(cache) = &self.cache {
            match cache.get::<Vec<Article>>(&key).await {
                Ok(Some(articles)) => {
                    debug!("Using cached {} results from {}", operation.as_str(), provider.name());
                    return Ok(articles);
                }
                Ok(None) => {}
                Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
            }
        }

        let call = async {
            match operation {
                Operation::Category => provider.get_articles_by_category(query).await,
                Operation::Search => provider.search_articles(query).await,
                Operation::Headlines => provider.get_top_headlines(query).await,
            }
        };
        let articles = timeout(budget, call)
            .await
            .map_err(|_| AdapterError::Timeout(budget))??;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache
                .set(&key, articles.clone(), None, Some(ContentType::Articles))
                .await
            {
                warn!("Failed to cache results for {}: {}", key, e);
            }
        }

        Ok(articles)
    }

    /// Try providers one after another until enough articles are collected
    async fn collect(
        &self,
        operation: Operation,
        query: &ArticleQuery,
        preferred: Option<&[String]>,
    ) -> Collected {
        let order = self.provider_order(preferred).await;
        let mut collected = Collected::default();

        if order.is_empty() {
            warn!("No providers registered");
            collected.errors.push(ProviderError::new(
                "aggregator",
                "no providers are configured",
                NO_PROVIDERS,
            ));
            return collected;
        }

        let deadline = Deadline::after(self.config.request_deadline);

        for provider in order {
            if collected.articles.len() >= query.limit {
                debug!("Collected {} articles, skipping remaining providers", collected.articles.len());
                break;
            }

            if deadline.is_expired() {
                warn!("Request deadline exceeded before trying {}", provider.name());
                collected.errors.push(ProviderError::new(
                    provider.name(),
                    format!(
                        "request deadline of {:?} exceeded",
                        self.config.request_deadline
                    ),
                    DEADLINE_EXCEEDED,
                ));
                continue;
            }

            let budget = deadline.clamp(self.config.provider_timeout);
            match self.call_provider(provider.as_ref(), operation, query, budget).await {
                Ok(articles) => {
                    info!("Provider {} returned {} articles", provider.name(), articles.len());
                    collected.full_page |= query.limit > 0 && articles.len() >= query.limit;
                    collected.articles.extend(articles);
                }
                Err(error) => {
                    warn!("Provider {} failed: {}", provider.name(), error);
                    collected
                        .errors
                        .push(ProviderError::from_adapter(provider.name(), &error));
                }
            }
        }

        collected
    }

    /// Articles in one category, falling back across providers
    #[instrument(skip(self))]
    pub async fn fetch_by_category(
        &self,
        category: &str,
        location: Option<&str>,
        limit: usize,
        offset: usize,
        preferred_order: Option<&[String]>,
    ) -> Connection {
        let query = ArticleQuery::category(category, location, limit, offset);
        self.collect(Operation::Category, &query, preferred_order)
            .await
            .into_connection(limit, offset)
    }

    /// Keyword search, falling back across providers
    #[instrument(skip(self))]
    pub async fn search_articles(
        &self,
        keyword: &str,
        category: Option<&str>,
        location: Option<&str>,
        limit: usize,
        offset: usize,
        preferred_order: Option<&[String]>,
    ) -> Connection {
        let query = ArticleQuery::search(keyword, category, location, limit, offset);
        self.collect(Operation::Search, &query, preferred_order)
            .await
            .into_connection(limit, offset)
    }

    /// Top headlines, falling back across providers
    #[instrument(skip(self))]
    pub async fn get_top_headlines(
        &self,
        category: Option<&str>,
        location: Option<&str>,
        limit: usize,
        preferred_order: Option<&[String]>,
    ) -> Connection {
        let query = ArticleQuery::headlines(category, location, limit);
        self.collect(Operation::Headlines, &query, preferred_order)
            .await
            .into_connection(limit, 0)
    }

    /// Fetch up to `limit` articles for each category concurrently.
    ///
    /// Results keep the order of `categories`; provider errors from every
    /// category are returned together.
    #[instrument(skip(self))]
    pub async fn fetch_categories(
        &self,
        categories: &[String],
        location: Option<&str>,
        limit: usize,
    ) -> (Vec<(String, Vec<Article>)>, Vec<ProviderError>) {
        let fetches = categories.iter().map(|category| async move {
            let query = ArticleQuery::category(category.as_str(), location, limit, 0);
            let collected = self.collect(Operation::Category, &query, None).await;
            (category.clone(), collected)
        });

        let mut by_category = Vec::with_capacity(categories.len());
        let mut errors = Vec::new();
        for (category, collected) in join_all(fetches).await {
            errors.extend(collected.errors);
            let mut articles = dedupe_by_url(collected.articles);
            articles.truncate(limit);
            by_category.push((category, articles));
        }
        (by_category, errors)
    }

    /// Merge several categories into one deduplicated, paginated result
    #[instrument(skip(self))]
    pub async fn aggregate_across_categories(
        &self,
        categories: &[String],
        location: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Connection {
        let (by_category, errors) = self
            .fetch_categories(categories, location, offset + limit)
            .await;
        let merged = dedupe_by_url(
            by_category
                .into_iter()
                .flat_map(|(_, articles)| articles)
                .collect(),
        );
        Connection::paginate(merged, offset, limit, errors)
    }
}
