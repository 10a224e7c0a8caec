use newsflow::{Config, ConfigOverrides, Error};
use std::io::Write;
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_values_layer_over_defaults() {
    let file = toml_file(
        r#"
[aggregator]
default_order = ["guardian", "newsapi"]
provider_timeout_secs = 4

[pipeline]
similarity_threshold = 0.8

[pipeline.features]
summarize = false

[providers.guardian]
api_key = "from-file"

[cache.content_ttl_secs]
summary = 120
"#,
    );

    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.aggregator.default_order, vec!["guardian", "newsapi"]);
    assert_eq!(config.aggregator.provider_timeout_secs, 4);
    assert!((config.pipeline.similarity_threshold - 0.8).abs() < f64::EPSILON);
    assert!(!config.pipeline.features.summarize);
    assert!(config.pipeline.features.categorize);
    assert_eq!(config.providers.guardian.api_key.as_deref(), Some("from-file"));
    assert_eq!(config.cache.content_ttl_secs.get("summary"), Some(&120));
    // Untouched sections keep their defaults.
    assert_eq!(config.ranking, Config::default().ranking);
    assert_eq!(config.cache.max_size, 1000);
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config.pipeline, Config::default().pipeline);
    assert_eq!(config.cache, Config::default().cache);
}

#[test]
fn test_invalid_file_values_are_rejected() {
    let file = toml_file(
        r#"
[logging]
format = "xml"
"#,
    );
    assert!(matches!(
        Config::load(Some(file.path())),
        Err(Error::InvalidInput { .. })
    ));

    let file = toml_file("[pipeline]\nbatch_size = \"many\"\n");
    assert!(matches!(Config::load(Some(file.path())), Err(Error::Config(_))));
}

#[test]
fn test_zero_intervals_are_rejected() {
    let file = toml_file("[aggregator]\navailability_refresh_secs = 0\n");
    match Config::load(Some(file.path())) {
        Err(Error::InvalidInput { field, .. }) => {
            assert_eq!(field, "aggregator.availability_refresh_secs");
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }

    let mut config = Config::default();
    config.cache.sweep_interval_secs = 0;
    assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
}

#[test]
fn test_environment_overrides_file() {
    let file = toml_file("[aggregator]\nrequest_deadline_secs = 20\n");
    std::env::set_var("NEWSFLOW__AGGREGATOR__REQUEST_DEADLINE_SECS", "7");
    std::env::set_var("NEWSFLOW__PROVIDERS__NEWSAPI__API_KEY", "from-env");

    let loaded = Config::load(Some(file.path()));

    std::env::remove_var("NEWSFLOW__AGGREGATOR__REQUEST_DEADLINE_SECS");
    std::env::remove_var("NEWSFLOW__PROVIDERS__NEWSAPI__API_KEY");

    let config = loaded.unwrap();
    assert_eq!(config.aggregator.request_deadline_secs, 7);
    assert_eq!(config.providers.newsapi.api_key.as_deref(), Some("from-env"));
}

#[test]
fn test_command_line_overrides_win() {
    let file = toml_file("[logging]\nlevel = \"warn\"\n\n[service]\nenrich_results = true\n");
    let overrides = ConfigOverrides {
        log_level: Some("trace".to_string()),
        enrich_results: Some(false),
        guardian_key: Some("from-cli".to_string()),
        ..ConfigOverrides::default()
    };

    let config = Config::load(Some(file.path()))
        .and_then(|config| config.apply_overrides(&overrides))
        .unwrap();

    assert_eq!(config.logging.level, "trace");
    assert!(!config.service.enrich_results);
    assert_eq!(config.providers.guardian.api_key.as_deref(), Some("from-cli"));
}
