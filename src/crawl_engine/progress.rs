//! Progress reporting abstraction for scrape runs
//!
//! Defines the `ProgressReporter` trait for lifecycle event reporting
//! and provides a no-op and a logging implementation.

use log::info;

use crate::utils::safe_truncate_chars;

use super::crawl_types::RunSummary;
use crate::page_extractor::{RecordStatus, VideoRecord};

/// Trait for reporting progress at key lifecycle events
///
/// Implementations can send updates to channels, log to console, update UI, etc.
pub trait ProgressReporter: Send + Sync {
    /// A listing group was drained and merged
    fn report_group_completed(&self, group: usize, total_groups: usize, unique_links: usize);

    /// A record task finished (skipped tasks are not reported)
    fn report_record_completed(&self, completed: usize, total: usize, record: &VideoRecord);

    /// The run ended and its output was written
    fn report_run_completed(&self, summary: &RunSummary);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_group_completed(&self, _group: usize, _total_groups: usize, _unique_links: usize) {}

    #[inline(always)]
    fn report_record_completed(&self, _completed: usize, _total: usize, _record: &VideoRecord) {}

    #[inline(always)]
    fn report_run_completed(&self, _summary: &RunSummary) {}
}

const ERROR_LOG_CHARS: usize = 200;

/// Progress reporter writing one log line per event
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report_group_completed(&self, group: usize, total_groups: usize, unique_links: usize) {
        info!("Listing group {group}/{total_groups} done, {unique_links} unique links so far");
    }

    fn report_record_completed(&self, completed: usize, total: usize, record: &VideoRecord) {
        match record.status {
            RecordStatus::Found => info!(
                "[{completed}/{total}] {} -> {}",
                record.source_url,
                record.resource_url.as_deref().unwrap_or_default()
            ),
            RecordStatus::NotFound => info!("[{completed}/{total}] {} -> not found", record.source_url),
            RecordStatus::Error => info!(
                "[{completed}/{total}] {} -> error: {}",
                record.source_url,
                safe_truncate_chars(record.error.as_deref().unwrap_or("unknown"), ERROR_LOG_CHARS)
            ),
        }
    }

    fn report_run_completed(&self, summary: &RunSummary) {
        info!("Run complete ({summary})");
    }
}
