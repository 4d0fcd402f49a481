//! Browsing sessions
//!
//! A session is one isolated browsing context (a Chromium tab, or a whole
//! browser process in the fallback mode) loaded with a single page address.
//! Engines hand out sessions; [`SessionGuard`] makes sure every session is
//! closed, on the happy path through an explicit `close().await`, on unwind
//! through a background close scheduled from `Drop`.

pub mod chromium;
pub mod cleanup;
pub mod errors;
pub mod page_timeout;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::ops::Deref;
use tracing::{debug, warn};

use crate::capture::RequestEvent;

pub use chromium::{ChromiumEngine, ChromiumOptions, ChromiumSession, LaunchedBrowser};
pub use errors::SessionError;
pub use page_timeout::with_page_timeout;

/// How a session maps onto browser processes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// New tab inside one shared browser process
    #[default]
    SharedTab,
    /// One freshly launched browser process per session
    FreshProcess,
}

/// One loaded page inside a browser
///
/// Implementations must tolerate `close()` being called more than once.
pub trait BrowserSession: Send + Sync + 'static {
    /// Outbound-request event type produced by this backend
    type Event: RequestEvent;

    /// Address the session was opened with
    fn address(&self) -> &str;

    /// Take the outbound-request event sequence for this session.
    ///
    /// The sequence is lazy and ends when the session closes. It can only be
    /// taken once; later calls fail with [`SessionError::Subscription`].
    fn request_events(&self) -> Result<BoxStream<'static, Self::Event>, SessionError>;

    /// Fetch the current rendered markup of the page
    fn content(&self) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Release the browsing context
    fn close(&mut self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Source of sessions, shared by every task of a run
pub trait BrowserEngine: Send + Sync + 'static {
    type Session: BrowserSession;

    /// Open a session and start loading `address`
    fn open(&self, address: &str) -> impl Future<Output = Result<Self::Session, SessionError>> + Send;
}

/// RAII guard that closes its session on every exit path
pub struct SessionGuard<S: BrowserSession> {
    session: Option<S>,
}

impl<S: BrowserSession> SessionGuard<S> {
    /// Open a session on `engine` for `address`
    pub async fn open<E>(engine: &E, address: &str) -> Result<Self, SessionError>
    where
        E: BrowserEngine<Session = S>,
    {
        let session = engine.open(address).await?;
        debug!(target: "stream_harvest::session", "Opened session for {address}");
        Ok(Self {
            session: Some(session),
        })
    }

    /// Wrap an already opened session
    #[must_use]
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Close the session and consume the guard
    pub async fn close(mut self) -> Result<(), SessionError> {
        match self.session.take() {
            Some(mut session) => {
                let result = session.close().await;
                debug!(
                    target: "stream_harvest::session",
                    "Closed session for {}",
                    session.address()
                );
                result
            }
            None => Ok(()),
        }
    }
}

impl<S: BrowserSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session.as_ref().expect("BUG: session taken before the guard was consumed")
    }
}

impl<S: BrowserSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        warn!(
            target: "stream_harvest::session",
            "Session for {} dropped without close, closing in background",
            session.address()
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        warn!(
                            target: "stream_harvest::session",
                            "Background close failed for {}: {e}",
                            session.address()
                        );
                    }
                });
            }
            Err(_) => {
                warn!(
                    target: "stream_harvest::session",
                    "No runtime left to close session for {}",
                    session.address()
                );
            }
        }
    }
}
