//! Network event tap
//!
//! Watches a session's outbound requests and records the first one whose URL
//! matches a [`ResourceMatcher`]. The record is write-once: the first match
//! wins and every later match is ignored.
//!
//! Event shapes vary between backends and protocol versions, so events are
//! read through [`RequestEvent::request_url`], which returns `None` for
//! anything that does not carry a request URL. Such events are counted and
//! skipped.

use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// An outbound-request event as seen by the tap
pub trait RequestEvent: Send + 'static {
    /// The request URL, if this event exposes one
    fn request_url(&self) -> Option<&str>;
}

impl RequestEvent for EventRequestWillBeSent {
    fn request_url(&self) -> Option<&str> {
        let url = self.request.url.as_str();
        (!url.is_empty()).then_some(url)
    }
}

impl<T: RequestEvent + Sync> RequestEvent for Arc<T> {
    fn request_url(&self) -> Option<&str> {
        self.as_ref().request_url()
    }
}

/// Raw CDP params (`{"request": {"url": ...}, ...}`)
impl RequestEvent for serde_json::Value {
    fn request_url(&self) -> Option<&str> {
        self.pointer("/request/url")
            .and_then(serde_json::Value::as_str)
            .filter(|url| !url.is_empty())
    }
}

/// Predicate deciding which request URL is the resource to capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "kebab-case")]
pub enum ResourceMatcher {
    /// URL ends with the pattern
    Suffix(String),
    /// URL contains the pattern anywhere
    Contains(String),
}

impl ResourceMatcher {
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Suffix(pattern) => url.ends_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Suffix(pattern) | Self::Contains(pattern) => pattern,
        }
    }
}

/// Write-once holder for the captured resource address
#[derive(Debug, Clone, Default)]
pub struct CaptureSlot {
    inner: Arc<OnceLock<String>>,
}

impl CaptureSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `url` if nothing was captured yet. Returns whether it was stored.
    pub fn record(&self, url: impl Into<String>) -> bool {
        self.inner.set(url.into()).is_ok()
    }

    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.inner.get().is_some()
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner.get().cloned()
    }
}

/// Counters gathered while consuming one event sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapStats {
    pub events_seen: usize,
    pub events_without_url: usize,
    pub matched: bool,
}

/// Consume `events` until the first match or the end of the sequence.
pub async fn consume_events<S, E>(events: S, matcher: &ResourceMatcher, slot: &CaptureSlot) -> TapStats
where
    S: Stream<Item = E>,
    E: RequestEvent,
{
    let mut stats = TapStats::default();
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        stats.events_seen += 1;

        let Some(url) = event.request_url() else {
            stats.events_without_url += 1;
            trace!(target: "stream_harvest::capture", "Skipping event without request URL");
            continue;
        };

        if matcher.matches(url) {
            if slot.record(url) {
                info!(target: "stream_harvest::capture", "Captured resource: {url}");
            } else {
                debug!(target: "stream_harvest::capture", "Ignoring later match: {url}");
            }
            stats.matched = true;
            break;
        }
    }

    stats
}

/// Background consumer of one session's request events
///
/// Aborted on drop, so a tap never outlives the task that attached it.
pub struct NetworkTap {
    slot: CaptureSlot,
    task: JoinHandle<TapStats>,
}

impl NetworkTap {
    /// Start consuming `events` on a background task
    pub fn attach<S, E>(events: S, matcher: ResourceMatcher) -> Self
    where
        S: Stream<Item = E> + Send + 'static,
        E: RequestEvent,
    {
        let slot = CaptureSlot::new();
        let task_slot = slot.clone();
        let task = tokio::spawn(async move { consume_events(events, &matcher, &task_slot).await });
        Self { slot, task }
    }

    #[must_use]
    pub fn slot(&self) -> &CaptureSlot {
        &self.slot
    }

    #[must_use]
    pub fn captured(&self) -> Option<String> {
        self.slot.get()
    }

    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.slot.is_captured()
    }
}

impl Drop for NetworkTap {
    fn drop(&mut self) {
        self.task.abort();
    }
}
