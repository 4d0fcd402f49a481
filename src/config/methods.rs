//! Derived values computed from a validated configuration

use log::warn;

use super::types::{ListingConfig, ScrapeConfig};
use crate::page_extractor::{ExtractorError, LinkFilter, MetadataExtractor};
use crate::utils::url_utils::render_listing_url;

impl ScrapeConfig {
    /// Extractor for the configured row markup and thumbnail template
    pub fn metadata_extractor(&self) -> Result<MetadataExtractor, ExtractorError> {
        MetadataExtractor::new(
            &self.settings.row_selector,
            &self.settings.label_selector,
            &self.settings.thumbnail_template,
        )
    }
}

impl ListingConfig {
    /// Listing page addresses for `start_page..=end_page`, capped at `max_pages`.
    #[must_use]
    pub fn page_urls(&self) -> Vec<String> {
        let requested = u64::from(self.end_page.saturating_sub(self.start_page)) + 1;
        if requested > u64::from(self.max_pages) {
            warn!(
                "Listing range {}..={} asks for {requested} pages, capped at {}",
                self.start_page, self.end_page, self.max_pages
            );
        }

        (self.start_page..=self.end_page)
            .take(self.max_pages as usize)
            .map(|page| render_listing_url(&self.url_template, page))
            .collect()
    }

    /// Link filter for harvested anchors
    #[must_use]
    pub fn link_filter(&self) -> LinkFilter {
        LinkFilter::new(self.include_token.clone().unwrap_or_default())
            .with_exclude_tokens(self.exclude_tokens.clone())
    }
}
