//! Getter methods for `ScrapeConfig`

use std::path::Path;
use std::time::Duration;

use super::types::{ListingConfig, ScrapeConfig, ScrapeSettings};
use crate::capture::ResourceMatcher;
use crate::session::ChromiumOptions;

impl ScrapeConfig {
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn settings(&self) -> &ScrapeSettings {
        &self.settings
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.settings.concurrency
    }

    #[must_use]
    pub fn browser_options(&self) -> &ChromiumOptions {
        &self.settings.browser
    }

    #[must_use]
    pub fn matcher(&self) -> &ResourceMatcher {
        &self.settings.matcher
    }

    #[must_use]
    pub fn capture_deadline(&self) -> Duration {
        Duration::from_secs(self.settings.capture_deadline_secs)
    }

    #[must_use]
    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.settings.capture_interval_secs)
    }

    /// Completions between output checkpoints, `None` when disabled
    #[must_use]
    pub fn checkpoint_every(&self) -> Option<usize> {
        (self.settings.checkpoint_every > 0).then_some(self.settings.checkpoint_every)
    }

    #[must_use]
    pub fn listing(&self) -> Option<&ListingConfig> {
        self.settings.listing.as_ref()
    }
}

impl ListingConfig {
    #[must_use]
    pub fn link_interval(&self) -> Duration {
        Duration::from_secs(self.link_interval_secs)
    }

    #[must_use]
    pub fn link_deadline(&self) -> Duration {
        Duration::from_secs(self.link_deadline_secs)
    }

    #[must_use]
    pub fn group_pause(&self) -> Duration {
        Duration::from_secs(self.group_pause_secs)
    }
}
