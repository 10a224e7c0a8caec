use crate::client::providers::MISSING_TITLE;
use crate::client::{Article, Enrichment, Sentiment};
use crate::config::{FeatureFlags, PipelineConfig};
use crate::enrichment::{heuristics, EnrichmentCapability, ExtractedInfo};
use crate::repositories::{ContentType, InMemoryCache};
use crate::resilience::run_logged;
use crate::{Error, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const RELEVANCE_WEIGHT: f64 = 0.6;
const IMPORTANCE_WEIGHT: f64 = 0.4;
/// Importance assumed when the extraction stage is switched off
const NEUTRAL_IMPORTANCE: f64 = 5.0;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Summarize,
    Categorize,
    ExtractInfo,
    CalculateScore,
}

impl Stage {
    pub const ALL: [Self; 4] = [
        Self::Summarize,
        Self::Categorize,
        Self::ExtractInfo,
        Self::CalculateScore,
    ];

    /// Stable name, also the cache key prefix
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Categorize => "categorize",
            Self::ExtractInfo => "extractInfo",
            Self::CalculateScore => "calculateScore",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> ContentType {
        match self {
            Self::Summarize => ContentType::Summary,
            Self::Categorize => ContentType::Categorization,
            Self::ExtractInfo => ContentType::Analysis,
            Self::CalculateScore => ContentType::Scoring,
        }
    }

    const fn enabled(self, features: &FeatureFlags) -> bool {
        match self {
            Self::Summarize => features.summarize,
            Self::Categorize => features.categorize,
            Self::ExtractInfo => features.extract_info,
            Self::CalculateScore => features.calculate_score,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage that had to degrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Everything known about one article while it moves through the stages
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub article: Article,
    pub enrichment: Enrichment,
    pub completed: Vec<Stage>,
    pub errors: Vec<StageError>,
}

impl PipelineState {
    #[must_use]
    pub fn new(article: Article) -> Self {
        let enrichment = article.enrichment.clone().unwrap_or_default();
        Self {
            article,
            enrichment,
            completed: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_complete(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    /// The article with the accumulated enrichment attached
    #[must_use]
    pub fn into_article(self) -> Article {
        self.article.enriched(self.enrichment)
    }

    fn record(&mut self, stage: Stage, failure: Option<StageError>) {
        if let Some(error) = failure {
            self.errors.push(error);
        }
        self.completed.push(stage);
    }
}

/// Runtime knobs for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub stage_timeout: Duration,
    pub similarity_threshold: f64,
    pub features: FeatureFlags,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
            similarity_threshold: config.similarity_threshold,
            features: config.features,
        }
    }
}

/// Orders articles by final score, highest first; unscored articles go last
pub fn sort_by_final_score(articles: &mut [Article]) {
    articles.sort_by(|a, b| match (a.final_score(), b.final_score()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Enrichment pipeline: cache-gated stages, each trying the primary
/// capability, then the fallback, then a local heuristic
pub struct EnrichmentPipeline {
    pub(crate) primary: Option<Arc<dyn EnrichmentCapability>>,
    fallback: Option<Arc<dyn EnrichmentCapability>>,
    cache: Arc<InMemoryCache>,
    pub(crate) options: PipelineOptions,
}

impl EnrichmentPipeline {
    /// Heuristic-only pipeline
    #[must_use]
    pub fn new(cache: Arc<InMemoryCache>, options: PipelineOptions) -> Self {
        Self {
            primary: None,
            fallback: None,
            cache,
            options,
        }
    }

    #[must_use]
    pub fn with_primary(mut self, capability: Arc<dyn EnrichmentCapability>) -> Self {
        info!("Using {} as primary enrichment capability", capability.name());
        self.primary = Some(capability);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, capability: Arc<dyn EnrichmentCapability>) -> Self {
        info!("Using {} as fallback enrichment capability", capability.name());
        self.fallback = Some(capability);
        self
    }

    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<InMemoryCache> {
        &self.cache
    }

    /// Try each configured capability once, then the heuristic.
    ///
    /// A `StageError` comes back only when some capability was tried and
    /// every one of them failed.
    async fn run_tiers<T, C, Fut, H>(
        &self,
        stage: Stage,
        call: C,
        heuristic: H,
    ) -> (T, Option<StageError>)
    where
        C: Fn(Arc<dyn EnrichmentCapability>) -> Fut,
        Fut: Future<Output = Result<T>>,
        H: FnOnce() -> T,
    {
        let mut failures = Vec::new();
        let tiers = [self.primary.as_ref(), self.fallback.as_ref()];

        for capability in tiers.into_iter().flatten() {
            let operation = format!("{}:{}", stage.name(), capability.name());
            match run_logged(&operation, self.options.stage_timeout, call(Arc::clone(capability)))
                .await
            {
                Ok(value) => return (value, None),
                Err(Some(error)) => failures.push(format!("{}: {error}", capability.name())),
                Err(None) => failures.push(format!(
                    "{}: timed out after {:?}",
                    capability.name(),
                    self.options.stage_timeout
                )),
            }
        }

        let failure = (!failures.is_empty()).then(|| {
            warn!("Stage {} falling back to heuristic: {}", stage, failures.join("; "));
            StageError {
                stage,
                message: failures.join("; "),
            }
        });
        (heuristic(), failure)
    }

    /// Resolve a stage value through the cache, computing it on a miss
    async fn gated<T, C, Fut, H>(
        &self,
        stage: Stage,
        article: &Article,
        call: C,
        heuristic: H,
    ) -> (T, Option<StageError>)
    where
        T: Clone + Send + Sync + 'static,
        C: Fn(Arc<dyn EnrichmentCapability>) -> Fut,
        Fut: Future<Output = Result<T>>,
        H: Fn() -> T,
    {
        let key = format!("{}:{}", stage.name(), article.identity());
        let mut failure = None;
        let slot = &mut failure;
        let heuristic_ref = &heuristic;

        let outcome = self
            .cache
            .get_or_compute(
                &key,
                || async move {
                    let (value, error) = self.run_tiers(stage, call, heuristic_ref).await;
                    *slot = error;
                    Ok::<T, Error>(value)
                },
                None,
                Some(stage.content_type()),
            )
            .await;

        match outcome {
            Ok(value) => (value, failure),
            Err(e) => {
                warn!("Cache unavailable for stage {}: {}", stage, e);
                (
                    heuristic(),
                    Some(StageError {
                        stage,
                        message: e.to_string(),
                    }),
                )
            }
        }
    }

    async fn summarize(&self, mut state: PipelineState) -> PipelineState {
        let text = state.article.analysis_text();
        let text = &text;
        let article = &state.article;
        let (summary, failure) = self
            .gated(
                Stage::Summarize,
                article,
                move |cap| {
                    let text = text.clone();
                    async move { cap.summarize(&text).await }
                },
                || heuristics::summarize(article),
            )
            .await;

        state.enrichment.summary = Some(summary);
        state.record(Stage::Summarize, failure);
        state
    }

    async fn categorize(&self, mut state: PipelineState) -> PipelineState {
        let text = state.article.analysis_text();
        let text = &text;
        let article = &state.article;
        let (category, failure) = self
            .gated(
                Stage::Categorize,
                article,
                move |cap| {
                    let text = text.clone();
                    async move {
                        match cap.categorize(&text).await {
                            Ok(label) if !label.trim().is_empty() => Ok(label.trim().to_lowercase()),
                            Ok(_) => Err(Error::enrichment("categorize", "empty category")),
                            Err(e) => Err(e),
                        }
                    }
                },
                || heuristics::categorize(article),
            )
            .await;

        state.enrichment.category = Some(category);
        state.record(Stage::Categorize, failure);
        state
    }

    async fn extract_info(&self, mut state: PipelineState) -> PipelineState {
        let text = state.article.analysis_text();
        let text = &text;
        let article = &state.article;
        let (info, failure): (ExtractedInfo, _) = self
            .gated(
                Stage::ExtractInfo,
                article,
                move |cap| {
                    let text = text.clone();
                    async move { cap.extract_info(&text).await }
                },
                || heuristics::extract_info(article),
            )
            .await;

        state.enrichment.entities = Some(info.entities);
        state.enrichment.topics = Some(info.topics);
        state.enrichment.sentiment = Some(Sentiment {
            confidence: info.sentiment.confidence.clamp(0.0, 1.0),
            ..info.sentiment
        });
        state.enrichment.importance = Some(info.importance.clamp(0.0, 10.0));
        state.record(Stage::ExtractInfo, failure);
        state
    }

    async fn calculate_score(&self, mut state: PipelineState) -> PipelineState {
        let text = state.article.analysis_text();
        let context = state
            .enrichment
            .category
            .clone()
            .or_else(|| state.article.category.clone())
            .unwrap_or_else(|| heuristics::DEFAULT_CATEGORY.to_string());
        let (text, context) = (&text, &context);

        let (relevance, failure) = self
            .gated(
                Stage::CalculateScore,
                &state.article,
                move |cap| {
                    let (text, context) = (text.clone(), context.clone());
                    async move { cap.score_relevance(&text, &context).await }
                },
                || heuristics::score_relevance(text, context),
            )
            .await;

        let relevance = relevance.clamp(0.0, 10.0);
        let importance = state.enrichment.importance.unwrap_or(NEUTRAL_IMPORTANCE);
        state.enrichment.relevance_score = Some(relevance);
        state.enrichment.final_score =
            Some((RELEVANCE_WEIGHT * relevance + IMPORTANCE_WEIGHT * importance).clamp(0.0, 10.0));
        state.record(Stage::CalculateScore, failure);
        state
    }

    async fn run_stage(&self, stage: Stage, mut state: PipelineState) -> PipelineState {
        if !stage.enabled(&self.options.features) {
            debug!("Stage {} disabled", stage);
            state.completed.push(stage);
            return state;
        }

        match stage {
            Stage::Summarize => self.summarize(state).await,
            Stage::Categorize => self.categorize(state).await,
            Stage::ExtractInfo => self.extract_info(state).await,
            Stage::CalculateScore => self.calculate_score(state).await,
        }
    }

    /// Run every stage over one article, keeping a record of degraded stages
    pub async fn run(&self, article: Article) -> PipelineState {
        let mut state = PipelineState::new(article);
        for stage in Stage::ALL {
            state = self.run_stage(stage, state).await;
        }
        if !state.errors.is_empty() {
            debug!(
                "Article {} enriched with {} degraded stages",
                state.article.id,
                state.errors.len()
            );
        }
        state
    }

    /// Enrich one article; never fails
    pub async fn process_article(&self, article: Article) -> Article {
        self.run(article).await.into_article()
    }

    /// Enrich one article, reusing enrichment already computed for the same
    /// identity. Only the enrichment is reused; the caller's article keeps
    /// its own id, source and content.
    async fn process_memoized(&self, article: Article) -> Article {
        // Untitled url-less records share the placeholder title; nothing identifies them.
        if article.url.is_empty() && article.title == MISSING_TITLE {
            return self.process_article(article).await;
        }

        let key = format!("processed:{}", article.identity());
        match self.cache.get::<Enrichment>(&key).await {
            Ok(Some(done)) => {
                debug!("Reusing enrichment for {}", key);
                return article.enriched(done);
            }
            Ok(None) => {}
            Err(e) => warn!("Processed-article lookup failed for {}: {}", key, e),
        }

        let enriched = self.process_article(article).await;
        if let Some(enrichment) = &enriched.enrichment {
            if let Err(e) = self
                .cache
                .set(&key, enrichment.clone(), None, Some(ContentType::Articles))
                .await
            {
                warn!("Failed to memoize processed article {}: {}", key, e);
            }
        }
        enriched
    }

    /// Enrich articles in throttled batches, keeping their order.
    ///
    /// Articles within a batch run concurrently; batches run one after
    /// another with `batch_delay` between them. Articles already processed
    /// are served from the cache.
    #[instrument(skip(self, articles), fields(count = articles.len()))]
    pub async fn enrich_in_order(&self, articles: Vec<Article>) -> Vec<Article> {
        let batch_size = self.options.batch_size.max(1);
        let mut processed = Vec::with_capacity(articles.len());

        for (index, batch) in articles.chunks(batch_size).enumerate() {
            if index > 0 && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }
            debug!("Processing batch {} ({} articles)", index + 1, batch.len());
            let pending: Vec<_> = batch
                .iter()
                .cloned()
                .map(|article| self.process_memoized(article))
                .collect();
            processed.extend(join_all(pending).await);
        }

        processed
    }

    /// Enrich articles in throttled batches and sort them by final score
    pub async fn process_batch(&self, articles: Vec<Article>) -> Vec<Article> {
        let mut processed = self.enrich_in_order(articles).await;
        sort_by_final_score(&mut processed);
        processed
    }
}
