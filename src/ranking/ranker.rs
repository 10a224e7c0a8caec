use crate::client::Article;
use crate::config::RankingConfig;
use crate::enrichment::heuristics::DEFAULT_CATEGORY;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Score used for articles the pipeline never scored
pub const DEFAULT_FINAL_SCORE: f64 = 5.0;
/// Recency of articles with no publication date, or older than a week
pub const STALE_RECENCY: f64 = 1.0;

/// Piecewise-linear recency bands: (upper bound in hours, score at start, score at end)
const RECENCY_BANDS: [(f64, f64, f64); 4] = [
    (6.0, 10.0, 8.0),
    (24.0, 8.0, 6.0),
    (72.0, 6.0, 4.0),
    (168.0, 4.0, 2.0),
];

/// Weights applied by [`Ranker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    pub recency_weight: f64,
    pub score_weight: f64,
    /// Extra weight for under-represented categories and topics; 0 disables
    pub diversity_boost: f64,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self::from(&RankingConfig::default())
    }
}

impl From<&RankingConfig> for RankOptions {
    fn from(config: &RankingConfig) -> Self {
        Self {
            recency_weight: config.recency_weight,
            score_weight: config.score_weight,
            diversity_boost: config.diversity_boost,
        }
    }
}

/// An article with the scores it was ranked by
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedArticle {
    pub article: Article,
    pub recency_score: f64,
    pub combined_score: f64,
}

/// Recency in `[1, 10]` decaying with age; future timestamps count as fresh
#[must_use]
pub fn recency_score(published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(published_at) = published_at else {
        return STALE_RECENCY;
    };

    let age_hours = ((now - published_at).num_seconds().max(0) as f64) / 3600.0;
    let mut band_start = 0.0;
    for (band_end, from, to) in RECENCY_BANDS {
        if age_hours < band_end {
            let progress = (age_hours - band_start) / (band_end - band_start);
            return from - progress * (from - to);
        }
        band_start = band_end;
    }
    STALE_RECENCY
}

fn category_key(article: &Article) -> String {
    article
        .effective_category()
        .unwrap_or(DEFAULT_CATEGORY)
        .to_lowercase()
}

fn topics(article: &Article) -> &[String] {
    article
        .enrichment
        .as_ref()
        .and_then(|e| e.topics.as_deref())
        .unwrap_or_default()
}

/// Blends recency with the enrichment score
#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker {
    options: RankOptions,
}

impl Ranker {
    #[must_use]
    pub const fn new(options: RankOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> &RankOptions {
        &self.options
    }

    /// Rank relative to the current time
    #[must_use]
    pub fn rank_articles(&self, articles: Vec<Article>) -> Vec<RankedArticle> {
        self.rank_articles_at(articles, Utc::now())
    }

    /// Rank relative to `now`, highest combined score first; ties keep input order
    #[must_use]
    pub fn rank_articles_at(&self, articles: Vec<Article>, now: DateTime<Utc>) -> Vec<RankedArticle> {
        let RankOptions {
            recency_weight,
            score_weight,
            diversity_boost,
        } = self.options;

        let mut category_counts: HashMap<String, usize> = HashMap::new();
        let mut topic_counts: HashMap<&str, usize> = HashMap::new();
        if diversity_boost > 0.0 {
            for article in &articles {
                *category_counts.entry(category_key(article)).or_default() += 1;
                for topic in topics(article) {
                    *topic_counts.entry(topic.as_str()).or_default() += 1;
                }
            }
        }

        let boosts: Vec<f64> = articles
            .iter()
            .map(|article| {
                if diversity_boost <= 0.0 {
                    return 0.0;
                }
                let category_rarity = category_counts
                    .get(&category_key(article))
                    .map_or(0.0, |count| 1.0 / *count as f64);
                let article_topics = topics(article);
                let topic_rarity = if article_topics.is_empty() {
                    0.0
                } else {
                    article_topics
                        .iter()
                        .filter_map(|t| topic_counts.get(t.as_str()))
                        .map(|count| 1.0 / *count as f64)
                        .sum::<f64>()
                        / article_topics.len() as f64
                };
                diversity_boost * (category_rarity + topic_rarity)
            })
            .collect();

        let mut ranked: Vec<RankedArticle> = articles
            .into_iter()
            .zip(boosts)
            .map(|(article, boost)| {
                let recency = recency_score(article.published_at, now);
                let score = article.final_score().unwrap_or(DEFAULT_FINAL_SCORE);
                RankedArticle {
                    combined_score: recency * recency_weight + score * score_weight + boost,
                    recency_score: recency,
                    article,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(Ordering::Equal)
        });
        ranked
    }
}
