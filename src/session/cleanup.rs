//! Browser shutdown
//!
//! Order matters: close over CDP, wait for the process to exit, and only then
//! remove the profile directory, which Chrome keeps locked while running.

use chromiumoxide::Browser;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What went wrong while shutting a browser down, if anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    Success,
    /// One message per failed step
    PartialFailure(Vec<String>),
}

/// Close `browser`, wait for its process, then remove `user_data_dir`
pub async fn cleanup_browser_and_data(
    mut browser: Browser,
    user_data_dir: Option<PathBuf>,
) -> CleanupResult {
    let mut errors = Vec::new();

    debug!(target: "stream_harvest::cleanup", "Closing browser");
    if let Err(e) = browser.close().await {
        warn!(target: "stream_harvest::cleanup", "Failed to close browser: {e}");
        errors.push(format!("Browser close failed: {e}"));
    }

    // Wait for the process to exit so the profile directory is unlocked
    if let Err(e) = browser.wait().await {
        warn!(target: "stream_harvest::cleanup", "Failed to wait for browser exit: {e}");
        errors.push(format!("Browser wait failed: {e}"));
    }

    if let Some(dir) = user_data_dir
        && let Err(e) = remove_profile_dir(&dir)
    {
        errors.push(e);
    }

    if errors.is_empty() {
        CleanupResult::Success
    } else {
        CleanupResult::PartialFailure(errors)
    }
}

/// Remove a profile directory, tolerating one that is already gone
pub fn remove_profile_dir(dir: &std::path::Path) -> Result<(), String> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(
                target: "stream_harvest::cleanup",
                "Removed browser profile {}",
                dir.display()
            );
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            warn!(
                target: "stream_harvest::cleanup",
                "Failed to remove browser profile {}: {e}",
                dir.display()
            );
            Err(format!("Directory cleanup failed: {e}"))
        }
    }
}
