use super::traits::{
    raw_str, raw_timestamp, AdapterError, ArticleQuery, ProviderAdapter, MISSING_TITLE,
};
use crate::client::{Article, HttpClientConfig};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://newsapi.org";
const DEFAULT_COUNTRY: &str = "us";

/// Response envelope returned by every NewsAPI endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<serde_json::Value>,
}

/// NewsAPI.org adapter
pub struct NewsApiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    default_country: String,
}

impl NewsApiProvider {
    /// Create a new NewsAPI provider from its settings
    pub fn new(settings: &ProviderSettings, http: &HttpClientConfig) -> Result<Self, AdapterError> {
        let client = http
            .build_client()
            .map_err(|e| AdapterError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            default_country: settings
                .default_location
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        })
    }

    fn api_key(&self) -> Result<&str, AdapterError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AdapterError::Auth("NewsAPI key is not configured".to_string()))
    }

    fn country(&self, query: &ArticleQuery) -> String {
        query
            .location
            .as_deref()
            .map_or_else(|| self.default_country.clone(), str::to_ascii_lowercase)
    }

    /// Build an endpoint URL with the paging parameters every call shares
    fn build_url(
        &self,
        endpoint: &str,
        query: &ArticleQuery,
        extra: &[(&str, String)],
    ) -> Result<Url, AdapterError> {
        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join(endpoint))
            .map_err(|e| AdapterError::Other(format!("Invalid base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in extra {
                pairs.append_pair(key, value);
            }
            let window = query.page_window();
            pairs
                .append_pair("pageSize", &window.page_size.to_string())
                .append_pair("page", &window.page.to_string());
        }

        Ok(url)
    }

    fn category_url(&self, query: &ArticleQuery) -> Result<Url, AdapterError> {
        let mut extra = vec![("country", self.country(query))];
        if let Some(category) = &query.category {
            extra.push(("category", category.to_ascii_lowercase()));
        }
        self.build_url("/v2/top-headlines", query, &extra)
    }

    fn search_url(&self, query: &ArticleQuery) -> Result<Url, AdapterError> {
        let keyword = query
            .keyword
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AdapterError::InvalidQuery("search keyword is empty".to_string()))?;

        // /v2/everything has no category filter; narrow through top-headlines instead.
        if let Some(category) = &query.category {
            let extra = vec![
                ("q", keyword),
                ("category", category.to_ascii_lowercase()),
                ("country", self.country(query)),
            ];
            self.build_url("/v2/top-headlines", query, &extra)
        } else {
            let extra = vec![
                ("q", keyword),
                ("language", "en".to_string()),
                ("sortBy", "publishedAt".to_string()),
            ];
            self.build_url("/v2/everything", query, &extra)
        }
    }

    async fn fetch(&self, url: Url, query: &ArticleQuery) -> Result<Vec<Article>, AdapterError> {
        let api_key = self.api_key()?;
        debug!("NewsAPI request URL: {}", url);

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", api_key)
            .send()
            .await
            .map_err(|e| AdapterError::from_transport("newsapi", &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(AdapterError::from_status("newsapi", status.as_u16(), &body));
        }

        let parsed: NewsApiResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("Invalid NewsAPI payload: {e}")))?;

        if parsed.status != "ok" {
            let code = parsed.code.unwrap_or_default();
            let message = parsed.message.unwrap_or_else(|| "unknown error".to_string());
            return Err(match code.as_str() {
                "apiKeyMissing" | "apiKeyInvalid" | "apiKeyDisabled" => AdapterError::Auth(message),
                "rateLimited" => AdapterError::RateLimit,
                _ => AdapterError::Other(format!("{code}: {message}")),
            });
        }

        let category = query.category.as_deref();
        let records = query.page_window().slice(parsed.articles, query.limit);
        let articles: Vec<Article> = records
            .iter()
            .map(|raw| self.normalize_article(raw, category))
            .collect();

        info!("NewsAPI returned {} articles", articles.len());
        Ok(articles)
    }
}

#[async_trait]
impl ProviderAdapter for NewsApiProvider {
    fn name(&self) -> &str {
        "newsapi"
    }

    fn description(&self) -> &str {
        "NewsAPI.org - headlines and articles from worldwide news sources"
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_none() {
            warn!("NewsAPI has no API key configured; marking unavailable");
            return false;
        }

        let probe = ArticleQuery::headlines(None, None, 1);
        let Ok(url) = self.category_url(&probe) else {
            return false;
        };

        match self
            .client
            .get(url)
            .header("X-Api-Key", self.api_key.as_deref().unwrap_or_default())
            .send()
            .await
        {
            Ok(response) => !matches!(response.status().as_u16(), 401 | 403),
            Err(e) => {
                debug!("NewsAPI availability probe failed, assuming available: {}", e);
                true
            }
        }
    }

    async fn get_articles_by_category(
        &self,
        query: &ArticleQuery,
    ) -> Result<Vec<Article>, AdapterError> {
        let url = self.category_url(query)?;
        self.fetch(url, query).await
    }

    async fn search_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, AdapterError> {
        let url = self.search_url(query)?;
        self.fetch(url, query).await
    }

    async fn get_top_headlines(
        &self,
        query: &ArticleQuery,
    ) -> Result<Vec<Article>, AdapterError> {
        let url = self.category_url(query)?;
        self.fetch(url, query).await
    }

    fn normalize_article(&self, raw: &serde_json::Value, category: Option<&str>) -> Article {
        let title = raw_str(raw, "/title").unwrap_or(MISSING_TITLE);
        let url = raw_str(raw, "/url").unwrap_or_default();
        let source = raw_str(raw, "/source/name").unwrap_or("NewsAPI");

        let mut article = Article::new(source, url, title)
            .with_description(raw_str(raw, "/description").unwrap_or_default());
        article.content = raw_str(raw, "/content").map(ToString::to_string);
        article.image_url = raw_str(raw, "/urlToImage").map(ToString::to_string);
        article.published_at = raw_timestamp(raw, "/publishedAt");
        article.category = category.map(str::to_ascii_lowercase);
        article
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> NewsApiProvider {
        let settings = ProviderSettings {
            api_key: Some("test-key".to_string()),
            ..ProviderSettings::default()
        };
        NewsApiProvider::new(&settings, &HttpClientConfig::default()).unwrap()
    }

    #[test]
    fn test_category_url() {
        let query = ArticleQuery::category("Technology", Some("GB"), 10, 20);
        let url = provider().category_url(&query).unwrap().to_string();
        assert!(url.starts_with("https://newsapi.org/v2/top-headlines"));
        assert!(url.contains("category=technology"));
        assert!(url.contains("country=gb"));
        assert!(url.contains("pageSize=10"));
        assert!(url.contains("page=3"));
    }

    #[test]
    fn test_search_url_without_category_uses_everything() {
        let query = ArticleQuery::search("rust lang", None, None, 5, 0);
        let url = provider().search_url(&query).unwrap().to_string();
        assert!(url.contains("/v2/everything"));
        assert!(url.contains("q=rust+lang"));
    }

    #[test]
    fn test_search_url_rejects_blank_keyword() {
        let query = ArticleQuery::search("  ", None, None, 5, 0);
        assert!(matches!(
            provider().search_url(&query),
            Err(AdapterError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_normalize_full_record() {
        let raw = json!({
            "source": {"id": "bbc-news", "name": "BBC News"},
            "title": "Markets rally",
            "description": "Stocks climbed",
            "url": "https://bbc.co.uk/1",
            "urlToImage": "https://bbc.co.uk/1.jpg",
            "publishedAt": "2024-05-01T10:00:00Z",
            "content": "Full text"
        });
        let article = provider().normalize_article(&raw, Some("Business"));
        assert_eq!(article.title, "Markets rally");
        assert_eq!(article.source, "BBC News");
        assert_eq!(article.category.as_deref(), Some("business"));
        assert_eq!(article.image_url.as_deref(), Some("https://bbc.co.uk/1.jpg"));
        assert!(article.published_at.is_some());
    }

    #[test]
    fn test_normalize_tolerates_missing_fields() {
        let raw = json!({"url": "https://x/1"});
        let article = provider().normalize_article(&raw, None);
        assert_eq!(article.title, MISSING_TITLE);
        assert_eq!(article.description, "");
        assert!(article.image_url.is_none());
        assert!(article.content.is_none());
        assert!(article.published_at.is_none());
        assert_eq!(article.url, "https://x/1");
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let provider =
            NewsApiProvider::new(&ProviderSettings::default(), &HttpClientConfig::default())
                .unwrap();
        assert!(!provider.is_available().await);
        let err = provider
            .get_articles_by_category(&ArticleQuery::category("tech", None, 5, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Auth(_)));
    }
}
