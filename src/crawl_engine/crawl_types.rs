//! Core types for scrape runs.
//!
//! Task reports, failure kinds, run summaries and the crate-level error type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;
use crate::content_saver::SaveError;
use crate::page_extractor::{ExtractorError, RecordStatus, VideoRecord};
use crate::session::SessionError;

/// Error type for scrape operations
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extractor(#[from] ExtractorError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Invalid page address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },
}

impl ScrapeError {
    /// Whether the shared browser is gone and no further task can succeed
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_transport())
    }
}

/// Convenience alias for Result with `ScrapeError`
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// Lifecycle of one page task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Spawned, waiting for a permit. Skipped tasks never leave this state.
    Pending,
    /// Holding a permit, body executing
    Running,
    Done,
    /// Body returned an error or panicked
    Failed,
}

/// One input address as tracked by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTask {
    /// Dispatch position in the input sequence
    pub index: usize,
    pub address: String,
    pub state: TaskState,
}

impl PageTask {
    #[must_use]
    pub fn new(index: usize, address: impl Into<String>) -> Self {
        Self {
            index,
            address: address.into(),
            state: TaskState::Pending,
        }
    }
}

/// Why a task produced no value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure {
    /// The task body returned an error
    #[error("task failed: {0}")]
    Failed(String),
    /// The task body panicked or was cancelled
    #[error("task panicked: {0}")]
    Panicked(String),
    /// Dispatch was stopped before the task started
    #[error("task skipped: {0}")]
    Skipped(String),
}

/// Result of one task, yielded in completion order
#[derive(Debug)]
pub struct TaskReport<T> {
    pub task: PageTask,
    pub outcome: Result<T, TaskFailure>,
}

impl<T> TaskReport<T> {
    #[must_use]
    pub fn index(&self) -> usize {
        self.task.index
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.task.address
    }
}

/// Per-status counts for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub found: usize,
    pub not_found: usize,
    pub error: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn record(&mut self, status: RecordStatus) {
        match status {
            RecordStatus::Found => self.found += 1,
            RecordStatus::NotFound => self.not_found += 1,
            RecordStatus::Error => self.error += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.found + self.not_found + self.error + self.skipped
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found: {}, not found: {}, error: {}, skipped: {}",
            self.found, self.not_found, self.error, self.skipped
        )
    }
}

/// Records of a scrape run, in dispatch order
#[derive(Debug, Clone)]
pub struct ScrapeRun {
    pub records: Vec<VideoRecord>,
    pub summary: RunSummary,
}

/// Links of a listing scan
///
/// In the summary, `found` counts listing pages that reached the link
/// threshold and `not_found` those that hit the deadline first.
#[derive(Debug, Clone)]
pub struct HarvestRun {
    pub links: crate::page_extractor::LinkSet,
    pub summary: RunSummary,
}
