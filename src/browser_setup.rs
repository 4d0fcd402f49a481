//! Locating, downloading and launching Chromium.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::utils::constants::CHROME_USER_AGENT;

/// Environment variable naming an explicit browser executable
pub const BROWSER_PATH_ENV: &str = "CHROMIUM_PATH";

/// Flags passed to every launched browser.
///
/// Background throttling is off so tabs waiting on a player keep issuing
/// requests; autoplay without a gesture lets the player fetch its playlist.
const LAUNCH_FLAGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-popup-blocking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-breakpad",
    "--disable-hang-monitor",
    "--disable-features=TranslateUI",
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--password-store=basic",
    "--use-mock-keychain",
    "--autoplay-policy=no-user-gesture-required",
    "--mute-audio",
];

#[cfg(target_os = "windows")]
const INSTALL_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/opt/google/chrome/chrome",
];

const PATH_COMMANDS: &[&str] = &["chromium", "chromium-browser", "google-chrome", "chrome"];

/// Expand a leading `~/` against the home directory
fn expand_home(location: &str) -> Option<PathBuf> {
    match location.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(location)),
    }
}

fn locate_on_path() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return None;
    }
    PATH_COMMANDS.iter().find_map(|cmd| {
        let output = Command::new("which").arg(cmd).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!found.is_empty()).then(|| PathBuf::from(found))
    })
}

/// Find an installed Chrome or Chromium.
///
/// `CHROMIUM_PATH` wins when it points at an existing file, then the usual
/// install locations, then whatever `which` finds.
#[must_use]
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(BROWSER_PATH_ENV) {
        let path = PathBuf::from(raw);
        if path.exists() {
            info!("Using browser from {BROWSER_PATH_ENV}: {}", path.display());
            return Some(path);
        }
        warn!("{BROWSER_PATH_ENV} points to a missing file: {}", path.display());
    }

    if let Some(path) = INSTALL_LOCATIONS
        .iter()
        .filter_map(|location| expand_home(location))
        .find(|path| path.exists())
    {
        info!("Found browser at {}", path.display());
        return Some(path);
    }

    let found = locate_on_path();
    if let Some(path) = &found {
        info!("Found browser on PATH: {}", path.display());
    }
    found
}

/// Download a managed Chromium into the user cache and return its executable.
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("stream-harvest")
        .join("chromium");
    info!("No local browser found, downloading Chromium into {}", cache_dir.display());

    tokio::fs::create_dir_all(&cache_dir)
        .await
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&cache_dir)
        .build()
        .context("Failed to build fetcher options")?;
    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Failed to fetch Chromium")?;

    info!("Chromium ready at {}", revision.executable_path.display());
    Ok(revision.executable_path)
}

/// CDP handler errors caused by events chromiumoxide has no type for
fn is_benign_handler_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

/// Launch a browser on `user_data_dir` and spawn its CDP handler.
///
/// The returned handle drives the CDP connection; abort it only after the
/// browser is closed. `request_timeout` bounds every CDP round trip.
pub async fn launch_browser(
    headless: bool,
    user_data_dir: &Path,
    request_timeout: Duration,
) -> Result<(Browser, JoinHandle<()>)> {
    let executable = match find_browser_executable() {
        Some(path) => path,
        None => download_managed_browser().await?,
    };

    let builder = BrowserConfigBuilder::default()
        .request_timeout(request_timeout)
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir)
        .chrome_executable(executable)
        .arg(format!("--user-agent={CHROME_USER_AGENT}"));
    let builder = LAUNCH_FLAGS.iter().fold(builder, |builder, flag| builder.arg(*flag));
    let builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };
    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    debug!("Launching browser (headless: {headless}) on {}", user_data_dir.display());
    let (browser, mut handler) = Browser::launch(config).await.context("Failed to launch browser")?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();
            if is_benign_handler_error(&message) {
                trace!("Ignored CDP decode error: {message}");
            } else {
                error!("Browser handler error: {e:?}");
            }
        }
        debug!("Browser handler finished");
    });

    Ok((browser, handler_task))
}

/// Patches applied to every document before any page script runs
const STEALTH_SCRIPT: &str = r"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
    if (!window.chrome) { window.chrome = {}; }
    if (!window.chrome.runtime) { window.chrome.runtime = {}; }
";

/// Register the stealth patches on `page` for every future navigation.
///
/// Must run while the tab is still on `about:blank`.
pub async fn apply_stealth_measures(page: &Page) -> Result<()> {
    page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
        .await
        .context("Failed to register stealth script")?;
    trace!("Stealth script registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_relative_locations_expand() {
        let expanded = expand_home("~/Applications/Chromium.app");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, Some(home.join("Applications/Chromium.app")));
        }
        assert_eq!(expand_home("/usr/bin/chromium"), Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_benign_handler_errors() {
        assert!(is_benign_handler_error(
            "data did not match any variant of untagged enum Message at line 1"
        ));
        assert!(is_benign_handler_error("Failed to deserialize WS response: eof"));
        assert!(!is_benign_handler_error("channel closed"));
    }

    #[test]
    fn test_launch_flags_keep_players_running() {
        assert!(LAUNCH_FLAGS.contains(&"--autoplay-policy=no-user-gesture-required"));
        assert!(LAUNCH_FLAGS.contains(&"--disable-background-timer-throttling"));
        assert!(LAUNCH_FLAGS.iter().all(|flag| flag.starts_with("--")));
    }
}
