//! Crawl Engine Module
//!
//! Bounded concurrent scheduling of page tasks and the two run flows built
//! on it: the listing scan and the record scrape.

// Sub-modules
pub mod crawl_types;
pub mod orchestrator;
pub mod page_processor;
pub mod progress;
pub mod scheduler;

// Re-export orchestration and progress types
pub use orchestrator::{harvest_listing, scrape_records};
pub use progress::{LogProgress, NoOpProgress, ProgressReporter};

// Re-export scheduler types
pub use scheduler::{DispatchGate, TaskScheduler};

// Re-export page processing
pub use page_processor::{ListingPage, ListingTaskContext, RecordTaskContext, scan_listing, scrape_record};

// Re-export crawl types
pub use crawl_types::{
    HarvestRun, PageTask, RunSummary, ScrapeError, ScrapeResult, ScrapeRun, TaskFailure, TaskReport, TaskState,
};
