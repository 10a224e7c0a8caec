//! # Configuration
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, else `<config dir>/newsflow/config.toml`)
//! 3. environment variables prefixed with `NEWSFLOW__`, for example
//!    `NEWSFLOW__PROVIDERS__NEWSAPI__API_KEY` or `NEWSFLOW__PIPELINE__BATCH_SIZE`
//! 4. [`ConfigOverrides`] collected from the command line

use crate::repositories::{CacheSettings, ContentType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "NEWSFLOW";
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub aggregator: AggregatorSettings,
    pub pipeline: PipelineConfig,
    pub ranking: RankingConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_secs: u64,
    /// Zero disables the size bound
    pub max_size: usize,
    pub sweep_interval_secs: u64,
    /// Per content type TTL overrides, keyed by `articles`, `summary`, ...
    pub content_ttl_secs: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            max_size: 1000,
            sweep_interval_secs: 300,
            content_ttl_secs: HashMap::new(),
        }
    }
}

impl CacheConfig {
    /// Resolve into runtime cache settings, applying per-type overrides
    #[must_use]
    pub fn settings(&self) -> CacheSettings {
        let mut settings = CacheSettings {
            default_ttl: Duration::from_secs(self.default_ttl_secs),
            max_size: self.max_size,
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            ..CacheSettings::default()
        };
        for content_type in ContentType::ALL {
            if let Some(secs) = self.content_ttl_secs.get(content_type.as_str()) {
                settings
                    .content_ttls
                    .insert(content_type, Duration::from_secs(*secs));
            }
        }
        settings
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorSettings {
    /// Provider priority when a request names none
    pub default_order: Vec<String>,
    pub provider_timeout_secs: u64,
    pub request_deadline_secs: u64,
    /// How often provider availability is re-probed
    pub availability_refresh_secs: u64,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            default_order: vec!["newsapi".to_string(), "guardian".to_string()],
            provider_timeout_secs: 10,
            request_deadline_secs: 30,
            availability_refresh_secs: 3600,
        }
    }
}

/// Per-stage switches for the enrichment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub summarize: bool,
    pub categorize: bool,
    pub extract_info: bool,
    pub calculate_score: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            summarize: true,
            categorize: true,
            extract_info: true,
            calculate_score: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    /// Pause between batches; zero disables throttling
    pub batch_delay_ms: u64,
    pub stage_timeout_secs: u64,
    /// Title overlap above which two articles are duplicates
    pub similarity_threshold: f64,
    pub features: FeatureFlags,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 200,
            stage_timeout_secs: 30,
            similarity_threshold: 0.6,
            features: FeatureFlags::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub recency_weight: f64,
    pub score_weight: f64,
    pub diversity_boost: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            recency_weight: 0.3,
            score_weight: 0.7,
            diversity_boost: 0.0,
        }
    }
}

/// Settings shared by every provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    /// Override the provider's public endpoint
    pub base_url: Option<String>,
    /// Country or edition used when a request gives none
    pub default_location: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: None,
            default_location: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub newsapi: ProviderSettings,
    pub guardian: ProviderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Run page results through the enrichment pipeline
    pub enrich_results: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enrich_results: true,
        }
    }
}

/// Values supplied on the command line, applied after every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub json_logs: bool,
    pub enrich_results: Option<bool>,
    pub newsapi_key: Option<String>,
    pub guardian_key: Option<String>,
}

impl Config {
    /// Default location of the configuration file
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("newsflow").join("config.toml"))
    }

    /// Load from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Loading configuration file {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(false));
        }

        let config: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("aggregator.default_order")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(level) = &overrides.log_level {
            self.logging.level.clone_from(level);
        }
        if overrides.json_logs {
            self.logging.format = "json".to_string();
        }
        if let Some(enrich) = overrides.enrich_results {
            self.service.enrich_results = enrich;
        }
        if let Some(key) = &overrides.newsapi_key {
            self.providers.newsapi.api_key = Some(key.clone());
        }
        if let Some(key) = &overrides.guardian_key {
            self.providers.guardian.api_key = Some(key.clone());
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| {
            Err(Error::InvalidInput {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.pipeline.batch_size == 0 {
            return invalid("pipeline.batch_size", "must be at least 1");
        }
        if self.pipeline.stage_timeout_secs == 0 {
            return invalid("pipeline.stage_timeout_secs", "must be positive");
        }
        if !(0.0..=1.0).contains(&self.pipeline.similarity_threshold) {
            return invalid("pipeline.similarity_threshold", "must be within [0, 1]");
        }
        if self.aggregator.provider_timeout_secs == 0 {
            return invalid("aggregator.provider_timeout_secs", "must be positive");
        }
        if self.aggregator.request_deadline_secs == 0 {
            return invalid("aggregator.request_deadline_secs", "must be positive");
        }
        if self.aggregator.availability_refresh_secs == 0 {
            return invalid("aggregator.availability_refresh_secs", "must be positive");
        }
        if self.aggregator.default_order.is_empty() {
            return invalid("aggregator.default_order", "must name at least one provider");
        }
        if self.cache.default_ttl_secs == 0 {
            return invalid("cache.default_ttl_secs", "must be positive");
        }
        if self.cache.sweep_interval_secs == 0 {
            return invalid("cache.sweep_interval_secs", "must be positive");
        }

        let ranking = &self.ranking;
        if ranking.recency_weight < 0.0 || ranking.score_weight < 0.0 || ranking.diversity_boost < 0.0
        {
            return invalid("ranking", "weights must not be negative");
        }
        if ranking.recency_weight == 0.0 && ranking.score_weight == 0.0 {
            return invalid("ranking", "recency_weight and score_weight cannot both be zero");
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return invalid("logging.level", "must be one of trace, debug, info, warn, error");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return invalid("logging.format", "must be `pretty` or `json`");
        }

        Ok(())
    }

    #[must_use]
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregator.provider_timeout_secs)
    }

    #[must_use]
    pub const fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.aggregator.request_deadline_secs)
    }

    #[must_use]
    pub const fn availability_refresh(&self) -> Duration {
        Duration::from_secs(self.aggregator.availability_refresh_secs)
    }
}
