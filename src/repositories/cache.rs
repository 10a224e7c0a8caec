//! # Cache Repository
//!
//! Content-addressed in-memory cache shared by the aggregator (short-lived raw
//! provider results) and the enrichment pipeline (long-lived per-stage results).
//!
//! Entries carry an absolute expiry and a last-access mark. Expired entries are
//! dropped on read and by a periodic sweeper; when the cache is full, inserting
//! a new key evicts the least recently accessed entry.

use super::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Kind of cached content; each kind has its own default TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Raw provider results and fully processed articles
    Articles,
    Summary,
    Categorization,
    /// Entity, topic and sentiment extraction
    Analysis,
    Scoring,
}

impl ContentType {
    pub const ALL: [Self; 5] = [
        Self::Articles,
        Self::Summary,
        Self::Categorization,
        Self::Analysis,
        Self::Scoring,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Articles => "articles",
            Self::Summary => "summary",
            Self::Categorization => "categorization",
            Self::Analysis => "analysis",
            Self::Scoring => "scoring",
        }
    }

    /// Built-in TTL used when configuration does not override it
    #[must_use]
    pub const fn default_ttl(self) -> Duration {
        match self {
            Self::Articles => Duration::from_secs(15 * 60),
            Self::Summary | Self::Categorization => Duration::from_secs(24 * 60 * 60),
            Self::Analysis => Duration::from_secs(12 * 60 * 60),
            Self::Scoring => Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Runtime cache settings, built from [`crate::config::CacheConfig`]
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// TTL used when neither an explicit TTL nor a content type is given
    pub default_ttl: Duration,
    /// Maximum number of entries (0 = unlimited)
    pub max_size: usize,
    /// Period of the background expiry sweep
    pub sweep_interval: Duration,
    /// Per content type TTL overrides
    pub content_ttls: HashMap<ContentType, Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_size: 1000,
            sweep_interval: Duration::from_secs(300),
            content_ttls: ContentType::ALL
                .iter()
                .map(|ct| (*ct, ct.default_ttl()))
                .collect(),
        }
    }
}

impl CacheSettings {
    /// Resolve the TTL for an insert: explicit > content type > global default
    #[must_use]
    pub fn resolve_ttl(&self, ttl: Option<Duration>, content_type: Option<ContentType>) -> Duration {
        ttl.or_else(|| {
            content_type.map(|ct| {
                self.content_ttls
                    .get(&ct)
                    .copied()
                    .unwrap_or_else(|| ct.default_ttl())
            })
        })
        .unwrap_or(self.default_ttl)
    }
}

/// A cache entry with expiration support
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,
    /// When this entry expires
    pub expires_at: Instant,
    /// When this entry was created
    pub created_at: Instant,
    /// Last access time
    pub last_accessed: Instant,
    /// Number of times this entry has been read
    pub access_count: u64,
    /// Monotonic access ordinal; breaks ties between equal timestamps
    access_seq: u64,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration, now: Instant, seq: u64) -> Self {
        Self {
            value,
            expires_at: now + ttl,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            access_seq: seq,
        }
    }

    /// Check if this entry has expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Check if this entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Get remaining TTL
    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    fn touch(&mut self, now: Instant, seq: u64) {
        self.access_count += 1;
        self.last_accessed = now;
        self.access_seq = seq;
    }

    fn lru_key(&self) -> (Instant, u64) {
        (self.last_accessed, self.access_seq)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,
    /// Total number of cache misses
    pub misses: u64,
    /// Total number of successful inserts
    pub sets: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries removed to make room or deleted explicitly
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as `hits / (hits + misses)`, 0 before any lookup
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type ErasedEntry = CacheEntry<Box<dyn Any + Send + Sync>>;

enum Lookup<T> {
    Missing,
    Expired,
    Mismatch,
    Hit(T),
}

/// Concurrency-safe in-memory cache with TTL and LRU eviction
#[derive(Debug)]
pub struct InMemoryCache {
    /// Cache entries stored by key
    entries: RwLock<HashMap<String, ErasedEntry>>,
    /// Cache statistics
    stats: RwLock<CacheStats>,
    settings: CacheSettings,
    access_clock: AtomicU64,
}

impl InMemoryCache {
    /// Create a cache with the given settings
    #[must_use]
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            settings,
            access_clock: AtomicU64::new(0),
        }
    }

    /// Create a cache with a default TTL and capacity, other settings default
    #[must_use]
    pub fn with_config(default_ttl: Duration, max_size: usize) -> Self {
        Self::new(CacheSettings {
            default_ttl,
            max_size,
            ..CacheSettings::default()
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    fn next_seq(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed)
    }

    fn validate_key(key: &str) -> RepositoryResult<()> {
        if key.trim().is_empty() {
            return Err(RepositoryError::Validation {
                field: "key".to_string(),
                message: "Cache key cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Get a value; an expired entry is removed and counts as a miss
    pub async fn get<T>(&self, key: &str) -> RepositoryResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let seq = self.next_seq();

        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;

        let lookup = match entries.get_mut(key) {
            None => Lookup::Missing,
            Some(entry) if entry.is_expired_at(now) => Lookup::Expired,
            Some(entry) => match entry.value.downcast_ref::<T>() {
                Some(value) => {
                    let value = value.clone();
                    entry.touch(now, seq);
                    Lookup::Hit(value)
                }
                None => Lookup::Mismatch,
            },
        };

        match lookup {
            Lookup::Hit(value) => {
                stats.hits += 1;
                debug!("Cache hit for key: {}", key);
                Ok(Some(value))
            }
            Lookup::Expired => {
                entries.remove(key);
                stats.expirations += 1;
                stats.misses += 1;
                debug!("Cache entry expired and removed: {}", key);
                Ok(None)
            }
            Lookup::Mismatch => {
                entries.remove(key);
                stats.misses += 1;
                warn!("Type mismatch for cache key {}, removing entry", key);
                Ok(None)
            }
            Lookup::Missing => {
                stats.misses += 1;
                debug!("Cache miss for key: {}", key);
                Ok(None)
            }
        }
    }

    /// Store a value.
    ///
    /// TTL resolution is explicit `ttl`, then the `content_type` default, then
    /// the global default. Inserting a new key into a full cache first evicts
    /// the least recently accessed entry.
    pub async fn set<T>(
        &self,
        key: &str,
        value: T,
        ttl: Option<Duration>,
        content_type: Option<ContentType>,
    ) -> RepositoryResult<()>
    where
        T: Send + Sync + 'static,
    {
        Self::validate_key(key)?;

        let ttl = self.settings.resolve_ttl(ttl, content_type);
        let entry = CacheEntry::new(
            Box::new(value) as Box<dyn Any + Send + Sync>,
            ttl,
            Instant::now(),
            self.next_seq(),
        );

        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;

        if self.settings.max_size > 0
            && !entries.contains_key(key)
            && entries.len() >= self.settings.max_size
        {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.lru_key())
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                stats.evictions += 1;
                debug!("Evicted least recently used cache entry: {}", victim);
            }
        }

        entries.insert(key.to_string(), entry);
        stats.sets += 1;

        debug!("Cached entry with key: {} (TTL: {:?})", key, ttl);
        Ok(())
    }

    /// Return the cached value for `key`, or run `compute`, cache its result
    /// and return it.
    ///
    /// `compute` is never called while a valid entry exists. An error from
    /// `compute` is returned unchanged and nothing is cached.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        compute: F,
        ttl: Option<Duration>,
        content_type: Option<ContentType>,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<RepositoryError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key).await? {
            return Ok(value);
        }

        let value = compute().await?;
        self.set(key, value.clone(), ttl, content_type).await?;
        Ok(value)
    }

    /// Remove a specific key from the cache
    pub async fn delete(&self, key: &str) -> RepositoryResult<bool> {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            self.stats.write().await.evictions += 1;
            debug!("Manually removed cache entry: {}", key);
        }
        Ok(removed)
    }

    /// Check if a live entry exists without touching access statistics
    pub async fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Remove expired entries from the cache
    pub async fn cleanup_expired(&self) -> RepositoryResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = (before - entries.len()) as u64;

        if removed > 0 {
            self.stats.write().await.expirations += removed;
            info!("Cleaned up {} expired cache entries", removed);
        }

        Ok(removed)
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    /// Get all live keys in the cache
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of live entries
    pub async fn size(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    /// Remaining TTL for a live key
    pub async fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(CacheEntry::remaining_ttl)
    }

    /// Drop every entry and reset the statistics
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;
        entries.clear();
        *stats = CacheStats::default();
        info!("Cleared all cache entries");
    }

    /// Spawn the periodic expiry sweep.
    ///
    /// The task holds a weak reference and exits once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let period = self.settings.sweep_interval.max(Duration::from_millis(1));
        let first_tick = Instant::now() + period;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped, stopping expiry sweeper");
                    break;
                };
                if let Err(e) = cache.cleanup_expired().await {
                    warn!("Cache sweep failed: {}", e);
                }
            }
        })
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
