//! Type-safe builder for `ScrapeConfig` using the typestate pattern
//!
//! `build()` only exists once the output path has been set.

use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{ConfigError, ListingConfig, ScrapeConfig, ScrapeSettings};
use crate::capture::ResourceMatcher;
use crate::page_extractor::MetadataExtractor;
use crate::session::SessionMode;
use crate::utils::constants::{MAX_CONCURRENCY, PAGE_PLACEHOLDER};
use crate::utils::url_utils::host_token;

// Type states for the builder
pub struct WithOutput;

pub struct ScrapeConfigBuilder<State = ()> {
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) settings: ScrapeSettings,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ScrapeConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_path: None,
            settings: ScrapeSettings::default(),
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfig {
    /// Create a builder for configuring a `ScrapeConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder<()> {
        ScrapeConfigBuilder::default()
    }
}

impl ScrapeConfigBuilder<()> {
    pub fn output_path(self, path: impl Into<PathBuf>) -> ScrapeConfigBuilder<WithOutput> {
        ScrapeConfigBuilder {
            output_path: Some(path.into()),
            settings: self.settings,
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfigBuilder<WithOutput> {
    /// Validate every setting and produce the config
    pub fn build(self) -> Result<ScrapeConfig, ConfigError> {
        let mut settings = self.settings;
        validate(&mut settings)?;

        Ok(ScrapeConfig {
            output_path: self.output_path.unwrap_or_default(),
            settings,
        })
    }
}

impl<State> ScrapeConfigBuilder<State> {
    /// Replace every tunable at once, e.g. with settings loaded from a file
    #[must_use]
    pub fn settings(mut self, settings: ScrapeSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.settings.concurrency = limit;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.settings.browser.headless = headless;
        self
    }

    #[must_use]
    pub fn session_mode(mut self, mode: SessionMode) -> Self {
        self.settings.browser.mode = mode;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.settings.browser.page_load_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn command_timeout_secs(mut self, secs: u64) -> Self {
        self.settings.browser.command_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn matcher(mut self, matcher: ResourceMatcher) -> Self {
        self.settings.matcher = matcher;
        self
    }

    #[must_use]
    pub fn capture_deadline_secs(mut self, secs: u64) -> Self {
        self.settings.capture_deadline_secs = secs;
        self
    }

    #[must_use]
    pub fn capture_interval_secs(mut self, secs: u64) -> Self {
        self.settings.capture_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn checkpoint_every(mut self, completions: usize) -> Self {
        self.settings.checkpoint_every = completions;
        self
    }

    #[must_use]
    pub fn row_selector(mut self, selector: impl Into<String>) -> Self {
        self.settings.row_selector = selector.into();
        self
    }

    #[must_use]
    pub fn label_selector(mut self, selector: impl Into<String>) -> Self {
        self.settings.label_selector = selector.into();
        self
    }

    #[must_use]
    pub fn thumbnail_template(mut self, template: impl Into<String>) -> Self {
        self.settings.thumbnail_template = template.into();
        self
    }

    #[must_use]
    pub fn listing(mut self, listing: ListingConfig) -> Self {
        self.settings.listing = Some(listing);
        self
    }
}

fn validate(settings: &mut ScrapeSettings) -> Result<(), ConfigError> {
    if !(1..=MAX_CONCURRENCY).contains(&settings.concurrency) {
        return Err(ConfigError::ConcurrencyOutOfRange {
            value: settings.concurrency,
            max: MAX_CONCURRENCY,
        });
    }

    for (name, value) in [
        ("capture_deadline_secs", settings.capture_deadline_secs),
        ("capture_interval_secs", settings.capture_interval_secs),
        ("page_load_timeout_secs", settings.browser.page_load_timeout_secs),
        ("command_timeout_secs", settings.browser.command_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::NotPositive(name));
        }
    }

    if settings.matcher.pattern().is_empty() {
        return Err(ConfigError::EmptyPattern);
    }

    // Rejects bad selectors and a template without {code}
    MetadataExtractor::new(
        &settings.row_selector,
        &settings.label_selector,
        &settings.thumbnail_template,
    )?;

    if let Some(listing) = settings.listing.as_mut() {
        validate_listing(listing)?;
    }

    Ok(())
}

fn validate_listing(listing: &mut ListingConfig) -> Result<(), ConfigError> {
    if !listing.url_template.contains(PAGE_PLACEHOLDER) {
        return Err(ConfigError::MissingPlaceholder {
            field: "listing url_template",
            value: listing.url_template.clone(),
            placeholder: PAGE_PLACEHOLDER,
        });
    }

    if listing.start_page > listing.end_page {
        return Err(ConfigError::InvalidPageRange {
            start: listing.start_page,
            end: listing.end_page,
        });
    }

    for (name, value) in [
        ("max_pages", u64::from(listing.max_pages)),
        ("link_threshold", listing.link_threshold as u64),
        ("link_interval_secs", listing.link_interval_secs),
        ("link_deadline_secs", listing.link_deadline_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::NotPositive(name));
        }
    }

    if listing.include_token.as_deref().is_none_or(str::is_empty) {
        let token = host_token(&listing.url_template)
            .ok_or_else(|| ConfigError::MissingIncludeToken(listing.url_template.clone()))?;
        listing.include_token = Some(token);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> ListingConfig {
        ListingConfig::new("https://www.site.example/dm515/en/new?page={page}", 1, 3)
    }

    #[test]
    fn test_defaults_build() {
        let config = ScrapeConfig::builder().output_path("out.csv").build().unwrap();
        assert_eq!(config.concurrency(), 5);
        assert_eq!(config.output_path(), std::path::Path::new("out.csv"));
        assert!(config.listing().is_none());
    }

    #[test]
    fn test_concurrency_range() {
        for bad in [0, MAX_CONCURRENCY + 1] {
            let result = ScrapeConfig::builder().output_path("o").concurrency(bad).build();
            assert!(matches!(result, Err(ConfigError::ConcurrencyOutOfRange { .. })));
        }
        assert!(ScrapeConfig::builder().output_path("o").concurrency(MAX_CONCURRENCY).build().is_ok());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let result = ScrapeConfig::builder().output_path("o").capture_interval_secs(0).build();
        assert!(matches!(result, Err(ConfigError::NotPositive("capture_interval_secs"))));
    }

    #[test]
    fn test_listing_template_needs_placeholder() {
        let result = ScrapeConfig::builder()
            .output_path("links.txt")
            .listing(ListingConfig::new("https://site.example/new", 1, 2))
            .build();
        assert!(matches!(result, Err(ConfigError::MissingPlaceholder { .. })));
    }

    #[test]
    fn test_include_token_defaults_to_host() {
        let config = ScrapeConfig::builder().output_path("links.txt").listing(listing()).build().unwrap();
        let listing = config.listing().unwrap();
        assert_eq!(listing.include_token.as_deref(), Some("site.example"));
    }

    #[test]
    fn test_thumbnail_template_needs_code() {
        let result = ScrapeConfig::builder()
            .output_path("o")
            .thumbnail_template("https://img.example/cover.jpg")
            .build();
        assert!(matches!(result, Err(ConfigError::Extractor(_))));
    }

    #[test]
    fn test_inverted_page_range() {
        let result = ScrapeConfig::builder()
            .output_path("o")
            .listing(ListingConfig::new("https://site.example/?page={page}", 5, 2))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidPageRange { start: 5, end: 2 })));
    }

    #[test]
    fn test_settings_from_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "concurrency": 8, "matcher": { "kind": "contains", "pattern": "video.m3u8" },
                 "browser": { "mode": "fresh-process" } }"#,
        )
        .unwrap();

        let settings = ScrapeSettings::from_json_file(&path).unwrap();
        assert_eq!(settings.concurrency, 8);
        assert_eq!(settings.matcher, ResourceMatcher::Contains("video.m3u8".into()));
        assert_eq!(settings.browser.mode, SessionMode::FreshProcess);
        assert!(settings.browser.headless);
        assert_eq!(settings.capture_deadline_secs, 20);
    }
}
