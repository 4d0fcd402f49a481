//! Tests for settings files and the configuration builder

use stream_harvest::{ConfigError, ResourceMatcher, ScrapeConfig, ScrapeSettings, SessionMode};

#[test]
fn test_partial_settings_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{
            "concurrency": 8,
            "matcher": { "kind": "contains", "pattern": ".m3u8" },
            "browser": { "mode": "fresh-process", "headless": false },
            "listing": { "url_template": "https://www.site.example/new?page={page}", "end_page": 4 }
        }"#,
    )
    .unwrap();

    let settings = ScrapeSettings::from_json_file(&path).unwrap();
    assert_eq!(settings.concurrency, 8);
    assert_eq!(settings.matcher, ResourceMatcher::Contains(".m3u8".to_string()));
    assert_eq!(settings.browser.mode, SessionMode::FreshProcess);
    assert!(!settings.browser.headless);
    assert_eq!(settings.capture_deadline_secs, 20);

    let listing = settings.listing.clone().unwrap();
    assert_eq!(listing.start_page, 1);
    assert_eq!(listing.end_page, 4);
    assert_eq!(listing.link_threshold, 10);

    let config = ScrapeConfig::builder()
        .settings(settings)
        .output_path(dir.path().join("links.txt"))
        .build()
        .unwrap();

    // The include token falls back to the listing host
    let listing = config.listing().unwrap();
    assert_eq!(listing.include_token.as_deref(), Some("site.example"));
    assert_eq!(listing.page_urls().len(), 4);
    assert_eq!(config.browser_options().mode, SessionMode::FreshProcess);
}

#[test]
fn test_unreadable_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();

    let missing = ScrapeSettings::from_json_file(&dir.path().join("absent.json"));
    assert!(matches!(missing, Err(ConfigError::Read { .. })));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"concurrency\": ").unwrap();
    assert!(matches!(
        ScrapeSettings::from_json_file(&path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_builder_overrides_file_values() {
    let settings = ScrapeSettings {
        concurrency: 3,
        ..ScrapeSettings::default()
    };

    let config = ScrapeConfig::builder()
        .settings(settings)
        .concurrency(12)
        .capture_deadline_secs(45)
        .checkpoint_every(0)
        .output_path("records.csv")
        .build()
        .unwrap();

    assert_eq!(config.concurrency(), 12);
    assert_eq!(config.capture_deadline().as_secs(), 45);
    assert_eq!(config.checkpoint_every(), None);
}

#[test]
fn test_empty_pattern_rejected() {
    let result = ScrapeConfig::builder()
        .matcher(ResourceMatcher::Suffix(String::new()))
        .output_path("records.csv")
        .build();
    assert!(matches!(result, Err(ConfigError::EmptyPattern)));
}
