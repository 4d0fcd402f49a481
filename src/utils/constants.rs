//! Shared configuration constants for stream-harvest
//!
//! Default values used by the config builder and the CLI so the two never
//! drift apart.

use std::time::Duration;

/// Default number of pages processed at once (one browser tab each).
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound accepted for the concurrency limit.
///
/// Every active session is a live Chromium tab; past this point the shared
/// browser process starts starving its own renderer threads.
pub const MAX_CONCURRENCY: usize = 100;

/// Request URLs ending with this suffix are treated as the captured resource.
pub const DEFAULT_RESOURCE_SUFFIX: &str = "video.m3u8";

/// How long a page may take to emit the resource request.
pub const DEFAULT_CAPTURE_DEADLINE: Duration = Duration::from_secs(20);

/// Check interval while waiting for the resource request.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(1);

/// How long a listing page may take to expose enough links.
pub const DEFAULT_LINK_DEADLINE: Duration = Duration::from_secs(50);

/// Check interval while waiting for listing links.
pub const DEFAULT_LINK_INTERVAL: Duration = Duration::from_secs(3);

/// A listing page counts as loaded once it yields this many links.
pub const DEFAULT_LINK_THRESHOLD: usize = 10;

/// Hard cap on listing pages scanned in one run, whatever the requested range.
pub const DEFAULT_MAX_LISTING_PAGES: u32 = 200;

/// Pause between listing groups to pace requests against the remote site.
pub const DEFAULT_GROUP_PAUSE: Duration = Duration::from_secs(2);

/// Completed records between two checkpoint writes of the output file.
pub const DEFAULT_CHECKPOINT_EVERY: usize = 25;

/// Timeout for `page.goto()`.
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Timeout for single CDP commands (content fetch, network enable).
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 15;

/// Listing links containing any of these tokens are category or noise pages.
pub const DEFAULT_EXCLUDE_TOKENS: &[&str] = &["english", "weekly", "monthly", "today"];

/// Thumbnail address synthesized from the lower-cased video code.
pub const DEFAULT_THUMBNAIL_TEMPLATE: &str = "https://fourhoi.com/{code}/cover-n.jpg";

/// Placeholder replaced by the page number in listing templates.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Placeholder replaced by the lower-cased code in thumbnail templates.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Selector for labeled key/value rows on a video page.
pub const DEFAULT_ROW_SELECTOR: &str = "div.text-secondary";

/// Selector for the label element inside a row.
pub const DEFAULT_LABEL_SELECTOR: &str = "span";

/// Value written to the `m3u8_url` column when nothing was captured.
pub const NOT_FOUND_MARKER: &str = "Not found";

/// Value written to the `m3u8_url` column when the page failed.
pub const ERROR_MARKER: &str = "Error";

/// Log filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Chrome user agent string for stealth mode
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
