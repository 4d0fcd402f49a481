//! Single page processing
//!
//! One function per task body: a record visit (capture + metadata) and a
//! listing visit (link harvest). Both open their session through
//! [`SessionGuard`] and close it explicitly before returning, whatever the
//! visit produced.

use log::{debug, info, warn};
use std::time::Duration;
use url::Url;

use super::crawl_types::{ScrapeError, ScrapeResult};
use crate::capture::{NetworkTap, ResourceMatcher};
use crate::config::{ListingConfig, ScrapeConfig};
use crate::page_extractor::{LinkFilter, LinkSet, MetadataExtractor, VideoRecord, harvest_links};
use crate::poller::{Probe, retry_until};
use crate::session::{BrowserEngine, BrowserSession, SessionGuard};

/// Shared inputs of every record task
#[derive(Debug, Clone)]
pub struct RecordTaskContext {
    pub extractor: MetadataExtractor,
    pub matcher: ResourceMatcher,
    pub capture_interval: Duration,
    pub capture_deadline: Duration,
}

impl RecordTaskContext {
    pub fn from_config(config: &ScrapeConfig) -> ScrapeResult<Self> {
        Ok(Self {
            extractor: config.metadata_extractor()?,
            matcher: config.matcher().clone(),
            capture_interval: config.capture_interval(),
            capture_deadline: config.capture_deadline(),
        })
    }
}

/// Shared inputs of every listing task
#[derive(Debug, Clone)]
pub struct ListingTaskContext {
    pub filter: LinkFilter,
    pub threshold: usize,
    pub interval: Duration,
    pub deadline: Duration,
}

impl ListingTaskContext {
    #[must_use]
    pub fn from_listing(listing: &ListingConfig) -> Self {
        Self {
            filter: listing.link_filter(),
            threshold: listing.link_threshold,
            interval: listing.link_interval(),
            deadline: listing.link_deadline(),
        }
    }
}

/// Links found on one listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub links: LinkSet,
    /// Whether the page reached the link threshold before the deadline
    pub converged: bool,
}

/// Visit a video page: capture the streaming resource and extract metadata.
pub async fn scrape_record<E: BrowserEngine>(
    engine: &E,
    address: &str,
    ctx: &RecordTaskContext,
) -> ScrapeResult<VideoRecord> {
    let session = SessionGuard::open(engine, address).await?;
    let visited = visit_record(&*session, ctx).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close session for {address}: {e}");
    }
    visited
}

async fn visit_record<S: BrowserSession>(session: &S, ctx: &RecordTaskContext) -> ScrapeResult<VideoRecord> {
    let address = session.address();
    let tap = NetworkTap::attach(session.request_events()?, ctx.matcher.clone());

    let slot = tap.slot();
    let outcome = retry_until(ctx.capture_interval, ctx.capture_deadline, || {
        let captured = slot.get();
        async move {
            match captured {
                Some(url) => Probe::Done(url),
                None => Probe::Pending(None),
            }
        }
    })
    .await;

    if outcome.converged {
        debug!("Captured resource for {address} after {:?}", outcome.elapsed);
    } else {
        info!("No matching resource for {address} within {:?}", ctx.capture_deadline);
    }

    let html = session.content().await?;
    let metadata = ctx.extractor.extract(&html, address);
    debug!("Extracted metadata for {address}: code '{}'", metadata.code);

    Ok(VideoRecord::from_visit(address, outcome.value, metadata))
}

/// Visit a listing page and collect its video links.
///
/// The page is re-read until it shows `threshold` links or the deadline
/// passes; in the second case whatever was found last is kept.
pub async fn scan_listing<E: BrowserEngine>(
    engine: &E,
    address: &str,
    ctx: &ListingTaskContext,
) -> ScrapeResult<ListingPage> {
    let base = Url::parse(address).map_err(|source| ScrapeError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;

    let session = SessionGuard::open(engine, address).await?;
    let page = poll_listing(&*session, &base, ctx).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close session for {address}: {e}");
    }
    Ok(page)
}

async fn poll_listing<S: BrowserSession>(session: &S, base: &Url, ctx: &ListingTaskContext) -> ListingPage {
    let threshold = ctx.threshold;
    let filter = &ctx.filter;

    let outcome = retry_until(ctx.interval, ctx.deadline, move || async move {
        match session.content().await {
            Ok(html) => {
                let links: LinkSet = harvest_links(&html, base, filter).into_iter().collect();
                if links.len() >= threshold {
                    Probe::Done(links)
                } else {
                    Probe::Pending(Some(links))
                }
            }
            Err(e) => {
                warn!("Failed to read listing {}: {e}", session.address());
                Probe::Pending(None)
            }
        }
    })
    .await;

    let links = outcome.value.unwrap_or_default();
    info!(
        "Listing {} yielded {} links ({})",
        session.address(),
        links.len(),
        if outcome.converged { "threshold reached" } else { "deadline" }
    );

    ListingPage {
        links,
        converged: outcome.converged,
    }
}
