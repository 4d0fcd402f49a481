//! Core configuration types for scrape runs
//!
//! `ScrapeSettings` holds every tunable and is what a JSON config file
//! contains; `ScrapeConfig` adds the required output path and is only
//! produced through the validating builder.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capture::ResourceMatcher;
use crate::session::ChromiumOptions;
use crate::utils::constants::{
    DEFAULT_CAPTURE_DEADLINE, DEFAULT_CAPTURE_INTERVAL, DEFAULT_CHECKPOINT_EVERY, DEFAULT_CONCURRENCY,
    DEFAULT_EXCLUDE_TOKENS, DEFAULT_GROUP_PAUSE, DEFAULT_LABEL_SELECTOR, DEFAULT_LINK_DEADLINE,
    DEFAULT_LINK_INTERVAL, DEFAULT_LINK_THRESHOLD, DEFAULT_MAX_LISTING_PAGES, DEFAULT_RESOURCE_SUFFIX,
    DEFAULT_ROW_SELECTOR, DEFAULT_THUMBNAIL_TEMPLATE,
};

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("concurrency must be between 1 and {max}, got {value}")]
    ConcurrencyOutOfRange { value: usize, max: usize },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("{field} '{value}' must contain the {placeholder} placeholder")]
    MissingPlaceholder {
        field: &'static str,
        value: String,
        placeholder: &'static str,
    },

    #[error("listing start page {start} is after end page {end}")]
    InvalidPageRange { start: u32, end: u32 },

    #[error("capture pattern must not be empty")]
    EmptyPattern,

    #[error("no include token given and none can be derived from '{0}'")]
    MissingIncludeToken(String),

    #[error("listing scan requires a listing configuration")]
    MissingListing,

    #[error(transparent)]
    Extractor(#[from] crate::page_extractor::ExtractorError),

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Listing scan parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Listing page address with a `{page}` placeholder
    pub url_template: String,
    pub start_page: u32,
    pub end_page: u32,
    /// Upper bound on listing pages per run, whatever the range says
    pub max_pages: u32,
    /// Substring every harvested link must contain; defaults to the template host
    pub include_token: Option<String>,
    pub exclude_tokens: Vec<String>,
    /// Links a listing page must show before polling stops early
    pub link_threshold: usize,
    pub link_interval_secs: u64,
    pub link_deadline_secs: u64,
    /// Pause between dispatch groups
    pub group_pause_secs: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            url_template: String::new(),
            start_page: 1,
            end_page: 1,
            max_pages: DEFAULT_MAX_LISTING_PAGES,
            include_token: None,
            exclude_tokens: DEFAULT_EXCLUDE_TOKENS.iter().map(|t| (*t).to_string()).collect(),
            link_threshold: DEFAULT_LINK_THRESHOLD,
            link_interval_secs: DEFAULT_LINK_INTERVAL.as_secs(),
            link_deadline_secs: DEFAULT_LINK_DEADLINE.as_secs(),
            group_pause_secs: DEFAULT_GROUP_PAUSE.as_secs(),
        }
    }
}

impl ListingConfig {
    pub fn new(url_template: impl Into<String>, start_page: u32, end_page: u32) -> Self {
        Self {
            url_template: url_template.into(),
            start_page,
            end_page,
            ..Self::default()
        }
    }
}

/// Every run tunable, loadable from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Maximum simultaneously open sessions
    pub concurrency: usize,
    pub browser: ChromiumOptions,
    pub matcher: ResourceMatcher,
    pub capture_deadline_secs: u64,
    pub capture_interval_secs: u64,
    /// Rewrite the output every this many completions; 0 disables checkpoints
    pub checkpoint_every: usize,
    pub row_selector: String,
    pub label_selector: String,
    /// Cover address template with a `{code}` placeholder
    pub thumbnail_template: String,
    pub listing: Option<ListingConfig>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            browser: ChromiumOptions::default(),
            matcher: ResourceMatcher::Suffix(DEFAULT_RESOURCE_SUFFIX.to_string()),
            capture_deadline_secs: DEFAULT_CAPTURE_DEADLINE.as_secs(),
            capture_interval_secs: DEFAULT_CAPTURE_INTERVAL.as_secs(),
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            row_selector: DEFAULT_ROW_SELECTOR.to_string(),
            label_selector: DEFAULT_LABEL_SELECTOR.to_string(),
            thumbnail_template: DEFAULT_THUMBNAIL_TEMPLATE.to_string(),
            listing: None,
        }
    }
}

impl ScrapeSettings {
    /// Load settings from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Validated configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// CSV record file for a scrape, link list for a listing scan
    pub(crate) output_path: PathBuf,
    pub(crate) settings: ScrapeSettings,
}
