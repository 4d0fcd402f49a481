//! Test utilities shared by the stream-harvest integration tests
//!
//! `FakeEngine` serves scripted pages instead of driving Chromium and keeps
//! count of how many sessions are open at once.

use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use stream_harvest::{BrowserEngine, BrowserSession, SessionError};

/// Scripted behavior of one page address
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    /// Request URLs emitted once the session subscribes
    pub requests: Vec<String>,
    /// Returned from `open` instead of a session
    pub open_error: Option<SessionError>,
}

impl FakePage {
    #[allow(dead_code)]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn with_requests(mut self, requests: &[&str]) -> Self {
        self.requests = requests.iter().map(|r| (*r).to_string()).collect();
        self
    }

    #[allow(dead_code)]
    pub fn failing(error: SessionError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionCounters {
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

/// Engine serving [`FakePage`]s; unknown addresses get an empty page
#[derive(Debug, Default)]
pub struct FakeEngine {
    pages: HashMap<String, FakePage>,
    /// Time spent inside every `content()` call, keeping sessions open
    hold: Duration,
    pub counters: Arc<SessionCounters>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn with_page(mut self, address: &str, page: FakePage) -> Self {
        self.pages.insert(address.to_string(), page);
        self
    }

    #[allow(dead_code)]
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }
}

impl BrowserEngine for FakeEngine {
    type Session = FakeSession;

    async fn open(&self, address: &str) -> Result<FakeSession, SessionError> {
        let page = self.pages.get(address).cloned().unwrap_or_default();
        if let Some(error) = page.open_error {
            return Err(error);
        }

        let now = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);
        self.counters.opened.fetch_add(1, Ordering::SeqCst);

        let events = page
            .requests
            .iter()
            .map(|url| json!({ "requestId": "1", "request": { "url": url, "method": "GET" } }))
            .collect();

        Ok(FakeSession {
            address: address.to_string(),
            html: page.html,
            events: Mutex::new(Some(events)),
            hold: self.hold,
            counters: Arc::clone(&self.counters),
            closed: false,
        })
    }
}

pub struct FakeSession {
    address: String,
    html: String,
    events: Mutex<Option<Vec<Value>>>,
    hold: Duration,
    counters: Arc<SessionCounters>,
    closed: bool,
}

impl BrowserSession for FakeSession {
    type Event = Value;

    fn address(&self) -> &str {
        &self.address
    }

    fn request_events(&self) -> Result<BoxStream<'static, Value>, SessionError> {
        let events = self
            .events
            .lock()
            .take()
            .ok_or_else(|| SessionError::Subscription("already taken".to_string()))?;
        Ok(futures::stream::iter(events).boxed())
    }

    async fn content(&self) -> Result<String, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        tokio::time::sleep(self.hold).await;
        Ok(self.html.clone())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if !self.closed {
            self.closed = true;
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Video page markup with the default row layout
#[allow(dead_code)]
pub fn video_page(title: &str, code: &str, genres: &[&str]) -> String {
    let genre_links: Vec<String> = genres
        .iter()
        .map(|g| format!(r#"<a href="/genres/{g}">{g}</a>"#))
        .collect();
    format!(
        r#"<html><head><meta name="description" content="About {code}"></head><body>
<h1>{title}</h1>
<div class="text-secondary"><span>Code:</span> {code}</div>
<div class="text-secondary"><span>Genre:</span> {}</div>
</body></html>"#,
        genre_links.join(", ")
    )
}

/// Listing page markup linking to every href given
#[allow(dead_code)]
pub fn listing_page(hrefs: &[&str]) -> String {
    let anchors: String = hrefs.iter().map(|h| format!(r#"<a href="{h}">x</a>"#)).collect();
    format!("<html><body>{anchors}</body></html>")
}
