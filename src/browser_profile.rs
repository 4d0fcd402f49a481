//! Chrome profile directory management
//!
//! Every launched browser gets its own UUID-named profile directory so
//! concurrent processes never fight over the same `SingletonLock`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of every profile directory created by this crate
pub const PROFILE_PREFIX: &str = "stream_harvest_chrome";

/// RAII wrapper for a Chrome profile directory
///
/// Removes the directory on drop unless `into_path()` hands ownership to
/// another cleanup mechanism.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    /// Get reference to the profile directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the profile and return its path, disabling auto-cleanup
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            debug!("BrowserProfile cleanup: removing {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to cleanup profile directory {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Create a unique profile directory under the system temp dir
pub fn create_unique_profile() -> Result<BrowserProfile> {
    create_unique_profile_in(&std::env::temp_dir())
}

/// Create a unique profile directory under `parent`
pub fn create_unique_profile_in(parent: &Path) -> Result<BrowserProfile> {
    let path = parent.join(format!("{PROFILE_PREFIX}_{}", Uuid::new_v4()));

    // create_dir (not create_dir_all) fails on an existing path
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    debug!("Created Chrome profile directory: {}", path.display());
    Ok(BrowserProfile {
        path,
        cleanup_on_drop: true,
    })
}
