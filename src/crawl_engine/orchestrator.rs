//! Main scrape orchestration logic
//!
//! Two flows share the scheduler:
//! - `harvest_listing` walks listing pages group by group, merging links and
//!   persisting the link list after every group
//! - `scrape_records` visits every page of a page list and writes one CSV row
//!   per visited page, in dispatch order
//!
//! Results are only touched here, on the control task, as reports arrive.

use futures::StreamExt;
use log::{debug, info, warn};
use std::sync::Arc;

use super::crawl_types::{HarvestRun, RunSummary, ScrapeResult, ScrapeRun, TaskFailure, TaskReport};
use super::page_processor::{ListingTaskContext, RecordTaskContext, scan_listing, scrape_record};
use super::progress::ProgressReporter;
use super::scheduler::{DispatchGate, TaskScheduler};
use crate::config::{ConfigError, ScrapeConfig};
use crate::content_saver::{save_link_list, save_records};
use crate::page_extractor::{LinkSet, VideoRecord};
use crate::session::BrowserEngine;

/// Scan the configured listing pages and collect candidate video links.
///
/// Pages are dispatched in groups of `concurrency`. After each group the
/// link list at `config.output_path()` is rewritten as a checkpoint,
/// progress is reported and the scan pauses for the configured group pause.
/// A closed gate stops the scan before the next group. Failed checkpoints
/// are logged; only the final write fails the scan.
pub async fn harvest_listing<E, P>(
    engine: Arc<E>,
    config: &ScrapeConfig,
    gate: DispatchGate,
    progress: &P,
) -> ScrapeResult<HarvestRun>
where
    E: BrowserEngine,
    P: ProgressReporter,
{
    let listing = config.listing().ok_or(ConfigError::MissingListing)?;
    let pages = listing.page_urls();
    let group_size = config.concurrency();
    let total_groups = pages.len().div_ceil(group_size);
    let ctx = Arc::new(ListingTaskContext::from_listing(listing));

    info!(
        "Scanning {} listing pages in {total_groups} groups of up to {group_size}",
        pages.len()
    );

    let mut links = LinkSet::new();
    let mut summary = RunSummary::default();

    for (group_index, group) in pages.chunks(group_size).enumerate() {
        if gate.is_closed() {
            let remaining = pages.len() - group_index * group_size;
            warn!(
                "Skipping {remaining} listing pages: {}",
                gate.reason().unwrap_or_default()
            );
            summary.skipped += remaining;
            break;
        }

        let scheduler = TaskScheduler::new(group_size, gate.clone());
        let task_engine = Arc::clone(&engine);
        let task_ctx = Arc::clone(&ctx);
        let mut reports = scheduler.run(group.to_vec(), move |address| {
            let engine = Arc::clone(&task_engine);
            let ctx = Arc::clone(&task_ctx);
            async move { scan_listing(&*engine, &address, &ctx).await }
        });

        while let Some(TaskReport { task, outcome }) = reports.next().await {
            match outcome {
                Ok(page) => {
                    if page.converged {
                        summary.found += 1;
                    } else {
                        summary.not_found += 1;
                    }
                    let added = links.merge(page.links);
                    debug!("{} added {added} new links", task.address);
                }
                Err(TaskFailure::Skipped(reason)) => {
                    debug!("Skipped listing {}: {reason}", task.address);
                    summary.skipped += 1;
                }
                Err(failure) => {
                    warn!("Listing page {} failed: {failure}", task.address);
                    summary.error += 1;
                }
            }
        }

        match save_link_list(config.output_path().to_path_buf(), &links).await {
            Ok(()) => debug!("Checkpoint: {} links written", links.len()),
            Err(e) => warn!("Link list checkpoint failed: {e}"),
        }
        progress.report_group_completed(group_index + 1, total_groups, links.len());

        if group_index + 1 < total_groups && !gate.is_closed() {
            tokio::time::sleep(listing.group_pause()).await;
        }
    }

    save_link_list(config.output_path().to_path_buf(), &links).await?;

    info!(
        "Collected {} unique links into {}",
        links.len(),
        config.output_path().display()
    );
    progress.report_run_completed(&summary);

    Ok(HarvestRun { links, summary })
}

/// Visit every address and write one record per visited page.
///
/// Failed tasks become `Error` records; tasks skipped after the gate closed
/// produce no row. Every `checkpoint_every` completions the records so far
/// are written out, and the final file lists rows in input order.
pub async fn scrape_records<E, P>(
    engine: Arc<E>,
    addresses: Vec<String>,
    config: &ScrapeConfig,
    gate: DispatchGate,
    progress: &P,
) -> ScrapeResult<ScrapeRun>
where
    E: BrowserEngine,
    P: ProgressReporter,
{
    let ctx = Arc::new(RecordTaskContext::from_config(config)?);
    let total = addresses.len();
    let scheduler = TaskScheduler::new(config.concurrency(), gate);

    info!(
        "Scraping {total} pages with up to {} concurrent sessions",
        scheduler.limit()
    );

    let mut reports = scheduler.run(addresses, move |address| {
        let engine = Arc::clone(&engine);
        let ctx = Arc::clone(&ctx);
        async move { scrape_record(&*engine, &address, &ctx).await }
    });

    let mut collected: Vec<(usize, VideoRecord)> = Vec::with_capacity(total);
    let mut summary = RunSummary::default();

    while let Some(TaskReport { task, outcome }) = reports.next().await {
        let record = match outcome {
            Ok(record) => record,
            Err(TaskFailure::Skipped(reason)) => {
                debug!("Skipped {}: {reason}", task.address);
                summary.skipped += 1;
                continue;
            }
            Err(failure) => {
                warn!("Task for {} failed: {failure}", task.address);
                VideoRecord::failed(task.address, failure.to_string())
            }
        };

        summary.record(record.status);
        progress.report_record_completed(collected.len() + 1, total, &record);
        collected.push((task.index, record));

        if let Some(every) = config.checkpoint_every()
            && collected.len() % every == 0
        {
            let snapshot = in_dispatch_order(collected.iter().map(|(i, r)| (*i, r.clone())).collect());
            match save_records(config.output_path().to_path_buf(), &snapshot).await {
                Ok(()) => debug!("Checkpoint: {} records written", snapshot.len()),
                Err(e) => warn!("Checkpoint write failed: {e}"),
            }
        }
    }

    let records = in_dispatch_order(collected);
    save_records(config.output_path().to_path_buf(), &records).await?;
    info!(
        "Wrote {} records to {}",
        records.len(),
        config.output_path().display()
    );
    progress.report_run_completed(&summary);

    Ok(ScrapeRun { records, summary })
}

fn in_dispatch_order(mut collected: Vec<(usize, VideoRecord)>) -> Vec<VideoRecord> {
    collected.sort_by_key(|(index, _)| *index);
    collected.into_iter().map(|(_, record)| record).collect()
}
