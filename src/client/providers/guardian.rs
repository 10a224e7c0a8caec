use super::traits::{
    raw_str, raw_timestamp, AdapterError, ArticleQuery, ProviderAdapter, MISSING_TITLE,
};
use crate::client::{Article, HttpClientConfig};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://content.guardianapis.com";
const SHOW_FIELDS: &str = "trailText,thumbnail,bodyText";

#[derive(Debug, Deserialize)]
struct GuardianEnvelope {
    response: GuardianResponse,
}

#[derive(Debug, Deserialize)]
struct GuardianResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

/// The Guardian Open Platform adapter
pub struct GuardianProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GuardianProvider {
    /// Create a new Guardian provider from its settings
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
        })
    }

    /// Guardian sections roughly line up with the common category names
    fn section(category: &str) -> String {
        match category.to_ascii_lowercase().as_str() {
            "general" => "news".to_string(),
            "entertainment" => "culture".to_string(),
            "health" => "society".to_string(),
            other => other.to_string(),
        }
    }

    /// Map a country code to a Guardian production office
    fn production_office(location: &str) -> Option<&'static str> {
        match location.to_ascii_lowercase().as_str() {
            "us" => Some("us"),
            "gb" | "uk" => Some("uk"),
            "au" => Some("aus"),
            _ => None,
        }
    }

    fn search_url(&self, query: &ArticleQuery, newest_first: bool) -> Result<Url, AdapterError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AdapterError::Auth("Guardian API key is not configured".to_string()))?;

        let mut url = Url::parse(&self.base_url)
            .and_then(|base| base.join("/search"))
            .map_err(|e| AdapterError::Other(format!("Invalid base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(category) = &query.category {
                pairs.append_pair("section", &Self::section(category));
            }
            if let Some(keyword) = &query.keyword {
                pairs.append_pair("q", keyword);
            }
            if let Some(office) = query.location.as_deref().and_then(Self::production_office) {
                pairs.append_pair("production-office", office);
            }
            if newest_first {
                pairs.append_pair("order-by", "newest");
            }
            let window = query.page_window();
            pairs
                .append_pair("page-size", &window.page_size.to_string())
                .append_pair("page", &window.page.to_string())
                .append_pair("show-fields", SHOW_FIELDS)
                .append_pair("api-key", api_key);
        }

        Ok(url)
    }

    async fn fetch(&self, url: Url, query: &ArticleQuery) -> Result<Vec<Article>, AdapterError> {
        debug!("Guardian request for path {}", url.path());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AdapterError::from_transport("guardian", &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(AdapterError::from_status("guardian", status.as_u16(), &body));
        }

        let envelope: GuardianEnvelope = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("Invalid Guardian payload: {e}")))?;

        if envelope.response.status != "ok" {
            return Err(AdapterError::Other(
                envelope
                    .response
                    .message
                    .unwrap_or_else(|| "Guardian returned an error".to_string()),
            ));
        }

        let category = query.category.as_deref();
        let records = query.page_window().slice(envelope.response.results, query.limit);
        let articles: Vec<Article> = records
            .iter()
            .map(|raw| self.normalize_article(raw, category))
            .collect();

        info!("Guardian returned {} articles", articles.len());
        Ok(articles)
    }
}

#[async_trait]
impl ProviderAdapter for GuardianProvider {
    fn name(&self) -> &str {
        "guardian"
    }

    fn description(&self) -> &str {
        "The Guardian Open Platform - sectioned news content"
    }

    async fn is_available(&self) -> bool {
        let probe = ArticleQuery::headlines(None, None, 1);
        let Ok(url) = self.search_url(&probe, true) else {
            return false;
        };

        match self.client.get(url).send().await {
            Ok(response) => !matches!(response.status().as_u16(), 401 | 403),
            Err(e) => {
                debug!("Guardian availability probe failed, assuming available: {}", e);
                true
            }
        }
    }

    async fn get_articles_by_category(
        &self,
        query: &ArticleQuery,
    ) -> Result<Vec<Article>, AdapterError> {
        let url = self.search_url(query, true)?;
        self.fetch(url, query).await
    }

    async fn search_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, AdapterError> {
        if query.keyword.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(AdapterError::InvalidQuery("search keyword is empty".to_string()));
        }
        let url = self.search_url(query, false)?;
        self.fetch(url, query).await
    }

    async fn get_top_headlines(
        &self,
        query: &ArticleQuery,
    ) -> Result<Vec<Article>, AdapterError> {
        let url = self.search_url(query, true)?;
        self.fetch(url, query).await
    }

    fn normalize_article(&self, raw: &serde_json::Value, category: Option<&str>) -> Article {
        let title = raw_str(raw, "/webTitle").unwrap_or(MISSING_TITLE);
        let url = raw_str(raw, "/webUrl").unwrap_or_default();

        let mut article = Article::new("The Guardian", url, title)
            .with_description(raw_str(raw, "/fields/trailText").unwrap_or_default());
        article.content = raw_str(raw, "/fields/bodyText").map(ToString::to_string);
        article.image_url = raw_str(raw, "/fields/thumbnail").map(ToString::to_string);
        article.published_at = raw_timestamp(raw, "/webPublicationDate");
        article.category = category
            .map(str::to_ascii_lowercase)
            .or_else(|| raw_str(raw, "/sectionId").map(str::to_ascii_lowercase));
        article
    }
}
