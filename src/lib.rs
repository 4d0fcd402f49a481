pub mod browser_profile;
pub mod browser_setup;
pub mod capture;
pub mod config;
pub mod content_saver;
pub mod crawl_engine;
pub mod page_extractor;
pub mod poller;
pub mod session;
pub mod utils;

use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

pub use browser_setup::{apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser};
pub use capture::{CaptureSlot, NetworkTap, RequestEvent, ResourceMatcher};
pub use config::{ConfigError, ListingConfig, ScrapeConfig, ScrapeSettings};
pub use content_saver::{read_link_list, save_link_list, save_records};
pub use crawl_engine::{
    DispatchGate, HarvestRun, LogProgress, NoOpProgress, ProgressReporter, RunSummary, ScrapeError, ScrapeResult,
    ScrapeRun, TaskScheduler, harvest_listing, scrape_records,
};
pub use page_extractor::schema::*;
pub use page_extractor::{LinkFilter, LinkSet, MetadataExtractor, harvest_links};
pub use poller::{PollOutcome, Probe, retry_until};
pub use session::{
    BrowserEngine, BrowserSession, ChromiumEngine, ChromiumOptions, SessionError, SessionGuard, SessionMode,
};

/// Scan the configured listing pages with Chromium and write the link list.
pub async fn harvest(config: ScrapeConfig, gate: DispatchGate) -> ScrapeResult<HarvestRun> {
    let engine = launch_engine(&config).await?;
    let result = harvest_listing(Arc::clone(&engine), &config, gate, &LogProgress).await;
    shutdown_engine(engine).await;
    result
}

/// Visit every page listed in `links_path` with Chromium and write the record file.
pub async fn scrape(config: ScrapeConfig, links_path: &Path, gate: DispatchGate) -> ScrapeResult<ScrapeRun> {
    let addresses = read_link_list(links_path).await?;
    info!("Loaded {} page addresses from {}", addresses.len(), links_path.display());

    let engine = launch_engine(&config).await?;
    let result = scrape_records(Arc::clone(&engine), addresses, &config, gate, &LogProgress).await;
    shutdown_engine(engine).await;
    result
}

async fn launch_engine(config: &ScrapeConfig) -> ScrapeResult<Arc<ChromiumEngine>> {
    ChromiumEngine::launch(config.browser_options().clone())
        .await
        .map(Arc::new)
        .map_err(|e| ScrapeError::Launch(format!("{e:#}")))
}

async fn shutdown_engine(engine: Arc<ChromiumEngine>) {
    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let session::cleanup::CleanupResult::PartialFailure(errors) = engine.shutdown().await {
                warn!("Browser cleanup incomplete: {}", errors.join("; "));
            }
        }
        // Dropping the last reference still kills the process and removes the profile
        Err(_) => warn!("Browser still referenced at shutdown, leaving cleanup to drop"),
    }
}
