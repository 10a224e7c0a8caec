use newsflow::client::providers::{
    AdapterError, ArticleQuery, GuardianProvider, NewsApiProvider, ProviderAdapter,
};
use newsflow::client::HttpClientConfig;
use newsflow::config::ProviderSettings;
use newsflow::{Aggregator, Config};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> ProviderSettings {
    ProviderSettings {
        api_key: Some("test-key".to_string()),
        base_url: Some(server.uri()),
        ..ProviderSettings::default()
    }
}

fn guardian_body(count: usize) -> serde_json::Value {
    let results: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "sectionId": "technology",
                "webTitle": format!("Guardian tech story {i}"),
                "webUrl": format!("https://theguardian.com/technology/{i}"),
                "webPublicationDate": "2024-05-01T10:00:00Z",
                "fields": {"trailText": format!("Trail {i}")}
            })
        })
        .collect();
    json!({"response": {"status": "ok", "total": count, "results": results}})
}

#[tokio::test]
async fn test_newsapi_category_request_and_normalization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .and(header("X-Api-Key", "test-key"))
        .and(query_param("category", "technology"))
        .and(query_param("country", "us"))
        .and(query_param("pageSize", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {
                    "source": {"id": null, "name": "Example Times"},
                    "title": "Chipmaker beats forecasts",
                    "description": "Quarterly revenue jumped",
                    "url": "https://example.com/chips",
                    "urlToImage": "https://example.com/chips.jpg",
                    "publishedAt": "2024-05-01T08:30:00Z",
                    "content": "Full story"
                },
                {"title": null, "url": "https://example.com/untitled"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = NewsApiProvider::new(&settings(&server), &HttpClientConfig::default()).unwrap();
    let articles = provider
        .get_articles_by_category(&ArticleQuery::category("Technology", None, 2, 0))
        .await
        .unwrap();

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].source, "Example Times");
    assert_eq!(articles[0].category.as_deref(), Some("technology"));
    assert!(articles[0].published_at.is_some());
    assert_eq!(articles[1].title, "No title available");
    assert!(articles[1].published_at.is_none());
}

#[tokio::test]
async fn test_newsapi_error_payload_maps_to_adapter_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "code": "rateLimited",
            "message": "Too many requests"
        })))
        .mount(&server)
        .await;

    let provider = NewsApiProvider::new(&settings(&server), &HttpClientConfig::default()).unwrap();
    let err = provider
        .search_articles(&ArticleQuery::search("rust", None, None, 5, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::RateLimit));
}

#[tokio::test]
async fn test_newsapi_rejected_key_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = NewsApiProvider::new(&settings(&server), &HttpClientConfig::default()).unwrap();
    assert!(!provider.is_available().await);
}

#[tokio::test]
async fn test_newsapi_misaligned_offset_resumes_at_offset() {
    let server = MockServer::start().await;
    let articles: Vec<_> = (0..15)
        .map(|i| {
            json!({
                "source": {"name": "Example Times"},
                "title": format!("Story {i}"),
                "url": format!("https://example.com/{i}")
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .and(query_param("pageSize", "15"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "totalResults": 40,
            "articles": articles
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = NewsApiProvider::new(&settings(&server), &HttpClientConfig::default()).unwrap();
    let page = provider
        .get_articles_by_category(&ArticleQuery::category("technology", None, 10, 5))
        .await
        .unwrap();

    assert_eq!(page.len(), 10);
    assert_eq!(page[0].url, "https://example.com/5");
    assert_eq!(page[9].url, "https://example.com/14");
}

#[tokio::test]
async fn test_guardian_misaligned_offset_resumes_at_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page-size", "15"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(guardian_body(15)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GuardianProvider::new(&settings(&server), &HttpClientConfig::default()).unwrap();
    let page = provider
        .get_articles_by_category(&ArticleQuery::category("technology", None, 10, 5))
        .await
        .unwrap();

    assert_eq!(page.len(), 10);
    assert_eq!(page[0].url, "https://theguardian.com/technology/5");
    assert_eq!(page[0].title, "Guardian tech story 5");
}

#[tokio::test]
async fn test_guardian_search_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "climate"))
        .and(query_param("api-key", "test-key"))
        .and(query_param("production-office", "uk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(guardian_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GuardianProvider::new(&settings(&server), &HttpClientConfig::default()).unwrap();
    let articles = provider
        .search_articles(&ArticleQuery::search("climate", None, Some("gb"), 3, 0))
        .await
        .unwrap();

    assert_eq!(articles.len(), 3);
    assert_eq!(articles[0].source, "The Guardian");
    assert_eq!(articles[0].description, "Trail 0");
    assert_eq!(articles[0].category.as_deref(), Some("technology"));
}

#[tokio::test]
async fn test_guardian_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = GuardianProvider::new(&settings(&server), &HttpClientConfig::default()).unwrap();
    let err = provider
        .get_top_headlines(&ArticleQuery::headlines(None, None, 5))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_aggregator_falls_back_from_newsapi_to_guardian() {
    let newsapi = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&newsapi)
        .await;

    let guardian = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("section", "technology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(guardian_body(3)))
        .expect(1)
        .mount(&guardian)
        .await;

    let mut config = Config::default();
    config.providers.newsapi = settings(&newsapi);
    config.providers.guardian = settings(&guardian);
    let aggregator = Aggregator::from_config(&config, None).unwrap();

    let connection = aggregator
        .fetch_by_category("technology", None, 10, 0, None)
        .await;

    assert_eq!(connection.edges.len(), 3);
    assert!(!connection.page_info.has_next_page);
    let errors = connection.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source, "newsapi");
    assert!(errors[0].retryable);
}

#[tokio::test]
async fn test_auth_and_rate_limit_failures_keep_their_codes() {
    let newsapi = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&newsapi)
        .await;
    let guardian = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&guardian)
        .await;

    let mut config = Config::default();
    config.providers.newsapi = settings(&newsapi);
    config.providers.guardian = settings(&guardian);
    let aggregator = Aggregator::from_config(&config, None).unwrap();

    let connection = aggregator
        .fetch_by_category("technology", None, 10, 0, None)
        .await;

    assert!(connection.edges.is_empty());
    let errors = connection.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].source, "newsapi");
    assert_eq!(errors[0].code, "AUTH_ERROR");
    assert_eq!(errors[1].source, "guardian");
    assert_eq!(errors[1].code, "RATE_LIMITED");
    assert!(errors.iter().all(|e| e.retryable));
}
