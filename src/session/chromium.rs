//! Chromium backend for browsing sessions
//!
//! Tabs are prepared in a fixed order: blank tab, stealth script, Network
//! domain enabled, `Network.requestWillBeSent` subscription, navigation. The
//! subscription exists before the first byte of the target page is requested,
//! so no early request escapes the tap.

use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventRequestWillBeSent};
use chromiumoxide::cdp::browser_protocol::target::CloseTargetParams;
use chromiumoxide::listeners::EventStream;
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cleanup::{CleanupResult, cleanup_browser_and_data, remove_profile_dir};
use super::errors::SessionError;
use super::page_timeout::{with_fallback, with_page_timeout};
use super::{BrowserEngine, BrowserSession, SessionMode};
use crate::browser_profile::create_unique_profile;
use crate::browser_setup::{apply_stealth_measures, launch_browser};
use crate::utils::constants::{DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_PAGE_LOAD_TIMEOUT_SECS};

/// Knobs for [`ChromiumEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromiumOptions {
    pub mode: SessionMode,
    pub headless: bool,
    /// Budget for `page.goto()`
    pub page_load_timeout_secs: u64,
    /// Budget for every other CDP command (tab creation, content fetch, close)
    pub command_timeout_secs: u64,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            headless: true,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

/// A launched browser process with its CDP handler and profile directory
///
/// Dropping it aborts the handler and removes the profile directory; the
/// graceful path is [`LaunchedBrowser::shutdown`].
pub struct LaunchedBrowser {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    profile_dir: Option<PathBuf>,
}

impl LaunchedBrowser {
    /// Launch a browser with a fresh profile directory
    pub async fn launch(options: &ChromiumOptions) -> anyhow::Result<Self> {
        let profile = create_unique_profile()?;
        let (browser, handler) = launch_browser(
            options.headless,
            profile.path(),
            Duration::from_secs(options.command_timeout_secs),
        )
        .await?;
        Ok(Self {
            browser: Some(browser),
            handler,
            profile_dir: Some(profile.into_path()),
        })
    }

    fn browser(&self) -> Result<&Browser, SessionError> {
        self.browser
            .as_ref()
            .ok_or_else(|| SessionError::Transport("browser already shut down".to_string()))
    }

    /// Close the browser, wait for its process, remove the profile, stop the handler
    pub async fn shutdown(mut self) -> CleanupResult {
        let result = match self.browser.take() {
            Some(browser) => cleanup_browser_and_data(browser, self.profile_dir.take()).await,
            None => CleanupResult::Success,
        };
        self.handler.abort();
        result
    }
}

impl Drop for LaunchedBrowser {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser's own Drop kills the child process
        drop(self.browser.take());

        if let Some(dir) = self.profile_dir.take() {
            warn!(
                target: "stream_harvest::session",
                "Browser dropped without shutdown, removing profile {}",
                dir.display()
            );
            let _ = remove_profile_dir(&dir);
        }
    }
}

/// [`BrowserEngine`] backed by Chromium over CDP
pub struct ChromiumEngine {
    options: ChromiumOptions,
    shared: Option<LaunchedBrowser>,
}

impl ChromiumEngine {
    /// Start the engine. In [`SessionMode::SharedTab`] this launches the
    /// shared browser right away.
    pub async fn launch(options: ChromiumOptions) -> anyhow::Result<Self> {
        let shared = match options.mode {
            SessionMode::SharedTab => Some(LaunchedBrowser::launch(&options).await?),
            SessionMode::FreshProcess => None,
        };
        info!(
            target: "stream_harvest::session",
            "Chromium engine ready (mode: {:?}, headless: {})",
            options.mode,
            options.headless
        );
        Ok(Self { options, shared })
    }

    #[must_use]
    pub fn options(&self) -> &ChromiumOptions {
        &self.options
    }

    /// Shut the shared browser down. Sessions must all be closed first.
    pub async fn shutdown(self) -> CleanupResult {
        match self.shared {
            Some(browser) => browser.shutdown().await,
            None => CleanupResult::Success,
        }
    }

    async fn open_fresh(&self, address: &str) -> Result<ChromiumSession, SessionError> {
        let launched = LaunchedBrowser::launch(&self.options)
            .await
            .map_err(|e| SessionError::Open {
                address: address.to_string(),
                reason: format!("{e:#}"),
            })?;

        let prepared = match launched.browser() {
            Ok(browser) => prepare_tab(browser, address, &self.options).await,
            Err(e) => Err(e),
        };

        match prepared {
            Ok((page, events)) => Ok(ChromiumSession::new(
                address,
                page,
                events,
                Some(launched),
                self.options.command_timeout_secs,
            )),
            Err(e) => {
                launched.shutdown().await;
                // A private process dying only concerns this task
                Err(match e {
                    SessionError::Transport(reason) => SessionError::Open {
                        address: address.to_string(),
                        reason,
                    },
                    other => other,
                })
            }
        }
    }
}

impl BrowserEngine for ChromiumEngine {
    type Session = ChromiumSession;

    async fn open(&self, address: &str) -> Result<ChromiumSession, SessionError> {
        let Some(shared) = &self.shared else {
            return self.open_fresh(address).await;
        };

        let (page, events) = prepare_tab(shared.browser()?, address, &self.options).await?;
        Ok(ChromiumSession::new(
            address,
            page,
            events,
            None,
            self.options.command_timeout_secs,
        ))
    }
}

/// Ask the browser for its version; failure means the transport is gone.
async fn health_probe(browser: &Browser, timeout_secs: u64) -> Result<(), SessionError> {
    with_page_timeout(
        async {
            browser
                .version()
                .await
                .map(|_| ())
                .map_err(|e| SessionError::Transport(e.to_string()))
        },
        timeout_secs,
        "Browser health probe",
    )
    .await
    .map_err(|e| match e {
        SessionError::Transport(_) => e,
        other => SessionError::Transport(other.to_string()),
    })
}

async fn prepare_tab(
    browser: &Browser,
    address: &str,
    options: &ChromiumOptions,
) -> Result<(Page, EventStream<EventRequestWillBeSent>), SessionError> {
    let command_timeout = options.command_timeout_secs;

    let page = match with_page_timeout(
        async {
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| SessionError::Command(e.to_string()))
        },
        command_timeout,
        "Tab creation",
    )
    .await
    {
        Ok(page) => page,
        Err(e) => {
            warn!(target: "stream_harvest::session", "Failed to create tab for {address}: {e}");
            health_probe(browser, command_timeout).await?;
            return Err(SessionError::Open {
                address: address.to_string(),
                reason: e.to_string(),
            });
        }
    };

    if let Err(e) = apply_stealth_measures(&page).await {
        warn!(target: "stream_harvest::session", "Failed to apply stealth measures for {address}: {e:#}");
    }

    let events = match subscribe_requests(&page, command_timeout).await {
        Ok(events) => events,
        Err(e) => {
            close_page(page, command_timeout).await;
            return Err(e);
        }
    };

    let page_load_timeout = options.page_load_timeout_secs;
    match with_page_timeout(
        async {
            page.goto(address)
                .await
                .map(|_| ())
                .map_err(|e| SessionError::Command(e.to_string()))
        },
        page_load_timeout,
        "Page navigation",
    )
    .await
    {
        Ok(()) => debug!(target: "stream_harvest::session", "Navigated to {address}"),
        // Players often keep the load event pending; requests still flow
        Err(e) if e.is_timeout() => {
            warn!(target: "stream_harvest::session", "{e} for {address}, continuing with partial load");
        }
        Err(e) => {
            close_page(page, command_timeout).await;
            return Err(SessionError::Open {
                address: address.to_string(),
                reason: e.to_string(),
            });
        }
    }

    Ok((page, events))
}

async fn subscribe_requests(
    page: &Page,
    timeout_secs: u64,
) -> Result<EventStream<EventRequestWillBeSent>, SessionError> {
    with_page_timeout(
        async {
            page.execute(EnableParams::default())
                .await
                .map(|_| ())
                .map_err(|e| SessionError::Subscription(e.to_string()))
        },
        timeout_secs,
        "Network enable",
    )
    .await?;

    with_page_timeout(
        async {
            page.event_listener::<EventRequestWillBeSent>()
                .await
                .map_err(|e| SessionError::Subscription(e.to_string()))
        },
        timeout_secs,
        "Event listener setup",
    )
    .await
}

/// Close a tab, falling back to closing its target when `Page.close` fails.
///
/// A tab left open after its permit is released would push the shared
/// browser past the session bound.
async fn close_page(page: Page, timeout_secs: u64) -> Option<SessionError> {
    let target_id = page.target_id().clone();
    let target_page = page.clone();
    with_fallback(
        async move { page.close().await.map_err(|e| SessionError::Command(e.to_string())) },
        move || async move {
            target_page
                .execute(CloseTargetParams::new(target_id))
                .await
                .map(|_| ())
                .map_err(|e| SessionError::Command(e.to_string()))
        },
        timeout_secs,
        "Tab close",
    )
    .await
    .err()
}

/// One Chromium tab loaded with a page address
pub struct ChromiumSession {
    address: String,
    page: Option<Page>,
    events: Mutex<Option<EventStream<EventRequestWillBeSent>>>,
    owned_browser: Option<LaunchedBrowser>,
    command_timeout_secs: u64,
}

impl ChromiumSession {
    fn new(
        address: &str,
        page: Page,
        events: EventStream<EventRequestWillBeSent>,
        owned_browser: Option<LaunchedBrowser>,
        command_timeout_secs: u64,
    ) -> Self {
        Self {
            address: address.to_string(),
            page: Some(page),
            events: Mutex::new(Some(events)),
            owned_browser,
            command_timeout_secs,
        }
    }

    /// Underlying page, until the session is closed
    #[must_use]
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }
}

impl BrowserSession for ChromiumSession {
    type Event = Arc<EventRequestWillBeSent>;

    fn address(&self) -> &str {
        &self.address
    }

    fn request_events(&self) -> Result<BoxStream<'static, Self::Event>, SessionError> {
        self.events.lock().take().map(StreamExt::boxed).ok_or_else(|| {
            SessionError::Subscription(format!("request events for {} already taken", self.address))
        })
    }

    async fn content(&self) -> Result<String, SessionError> {
        let page = self.page.as_ref().ok_or(SessionError::Closed)?;
        with_page_timeout(
            async {
                page.content()
                    .await
                    .map_err(|e| SessionError::Command(e.to_string()))
            },
            self.command_timeout_secs,
            "Content fetch",
        )
        .await
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        drop(self.events.lock().take());

        let mut result = Ok(());
        if let Some(page) = self.page.take()
            && let Some(e) = close_page(page, self.command_timeout_secs).await
        {
            warn!(target: "stream_harvest::session", "Failed to close tab for {}: {e}", self.address);
            result = Err(e);
        }

        if let Some(browser) = self.owned_browser.take()
            && let CleanupResult::PartialFailure(errors) = browser.shutdown().await
        {
            warn!(
                target: "stream_harvest::session",
                "Browser cleanup for {} incomplete: {}",
                self.address,
                errors.join("; ")
            );
        }

        result
    }
}
