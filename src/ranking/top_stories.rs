use crate::client::aggregator::dedupe_by_url;
use crate::client::Article;
use crate::enrichment::{sort_by_final_score, EnrichmentPipeline};
use crate::ranking::Ranker;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Picks the best stories across several categories
pub struct TopStories {
    pipeline: Arc<EnrichmentPipeline>,
    ranker: Ranker,
}

impl TopStories {
    #[must_use]
    pub const fn new(pipeline: Arc<EnrichmentPipeline>, ranker: Ranker) -> Self {
        Self { pipeline, ranker }
    }

    /// Up to `limit` stories, drawn evenly from every category.
    ///
    /// Each category is enriched and ranked on its own task and contributes
    /// `max(1, limit / categories)` stories. The picks are deduplicated and
    /// ordered by final score. If any category task fails, the input is
    /// merged, deduplicated by URL and ordered newest first instead.
    #[instrument(skip(self, articles_by_category), fields(categories = articles_by_category.len()))]
    pub async fn get_top_stories(
        &self,
        articles_by_category: Vec<(String, Vec<Article>)>,
        limit: usize,
    ) -> Vec<Article> {
        if articles_by_category.is_empty() || limit == 0 {
            return Vec::new();
        }

        let slots = (limit / articles_by_category.len()).max(1);
        let fallback_input = articles_by_category.clone();

        let tasks: Vec<_> = articles_by_category
            .into_iter()
            .map(|(category, articles)| {
                let pipeline = Arc::clone(&self.pipeline);
                let ranker = self.ranker;
                tokio::spawn(async move {
                    let enriched = pipeline.process_batch(articles).await;
                    let picks: Vec<Article> = ranker
                        .rank_articles(enriched)
                        .into_iter()
                        .take(slots)
                        .map(|ranked| ranked.article)
                        .collect();
                    debug!("Category {} contributed {} stories", category, picks.len());
                    picks
                })
            })
            .collect();

        let mut picks = Vec::new();
        for task in tasks {
            match task.await {
                Ok(articles) => picks.extend(articles),
                Err(e) => {
                    error!("Top stories task failed, using recency fallback: {}", e);
                    return Self::fallback(fallback_input, limit);
                }
            }
        }

        let mut stories = self.pipeline.deduplicate_articles(picks).await;
        sort_by_final_score(&mut stories);
        stories.truncate(limit);
        stories
    }

    /// Newest articles across every category, deduplicated by URL
    fn fallback(articles_by_category: Vec<(String, Vec<Article>)>, limit: usize) -> Vec<Article> {
        let merged = articles_by_category
            .into_iter()
            .flat_map(|(_, articles)| articles)
            .collect();
        let mut articles = dedupe_by_url(merged);
        articles.sort_by_key(|a| Reverse(a.published_at));
        articles.truncate(limit);
        articles
    }
}
