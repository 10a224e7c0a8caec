use crate::client::Article;
use crate::enrichment::{heuristics, EnrichmentPipeline};
use crate::resilience::run_logged;
use crate::Error;
use tracing::{debug, instrument};

impl EnrichmentPipeline {
    /// Drop articles that report the same story as an earlier one.
    ///
    /// Two articles are duplicates when their URLs match, else when the
    /// primary capability says so, else when their titles overlap by more
    /// than the configured similarity threshold. Earlier articles win.
    #[instrument(skip(self, articles), fields(count = articles.len()))]
    pub async fn deduplicate_articles(&self, articles: Vec<Article>) -> Vec<Article> {
        let mut accepted: Vec<Article> = Vec::with_capacity(articles.len());

        'candidates: for candidate in articles {
            for kept in &accepted {
                if self.is_duplicate(&candidate, kept).await {
                    debug!("Dropping '{}' as duplicate of '{}'", candidate.title, kept.title);
                    continue 'candidates;
                }
            }
            accepted.push(candidate);
        }

        accepted
    }

    async fn is_duplicate(&self, a: &Article, b: &Article) -> bool {
        if !a.url.is_empty() && a.url == b.url {
            return true;
        }

        if let Some(primary) = &self.primary {
            let (text_a, text_b) = (a.analysis_text(), b.analysis_text());
            let check = primary.detect_duplicate(&text_a, &text_b);
            match run_logged("detectDuplicate", self.options.stage_timeout, check).await {
                Ok(duplicate) => return duplicate,
                Err(Some(Error::Unsupported { .. })) => {}
                Err(Some(e)) => debug!("Duplicate detection failed, using titles: {}", e),
                Err(None) => debug!("Duplicate detection timed out, using titles"),
            }
        }

        heuristics::title_similarity(&a.title, &b.title) > self.options.similarity_threshold
    }
}

#[cfg(test)]
mod tests {
    use crate::client::Article;
    use crate::enrichment::{EnrichmentPipeline, PipelineOptions};
    use crate::repositories::InMemoryCache;
    use std::sync::Arc;

    fn pipeline() -> EnrichmentPipeline {
        EnrichmentPipeline::new(Arc::new(InMemoryCache::default()), PipelineOptions::default())
    }

    #[tokio::test]
    async fn test_url_and_title_duplicates_removed() {
        let articles = vec![
            Article::new("newsapi", "https://x/1", "Central bank raises interest rates"),
            Article::new("guardian", "https://x/1", "Completely different headline"),
            Article::new("guardian", "https://y/9", "Central bank raises interest rates again"),
            Article::new("guardian", "https://y/10", "Football season opens"),
        ];
        let unique = pipeline().deduplicate_articles(articles).await;
        let urls: Vec<&str> = unique.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x/1", "https://y/10"]);
        assert_eq!(unique[0].source, "newsapi");
    }

    #[tokio::test]
    async fn test_empty_urls_compare_by_title_only() {
        let articles = vec![
            Article::new("a", "", "Storm batters northern coast"),
            Article::new("b", "", "Elections scheduled for spring"),
        ];
        assert_eq!(pipeline().deduplicate_articles(articles).await.len(), 2);
    }
}
