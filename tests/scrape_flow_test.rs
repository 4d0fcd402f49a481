//! End-to-end record scrape against the fake engine

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use stream_harvest::content_saver::CsvRow;
use stream_harvest::{
    DispatchGate, NoOpProgress, RecordStatus, ScrapeConfig, SessionError, read_link_list, scrape_records,
};

mod common;
use common::{FakeEngine, FakePage, video_page};

const FOUND: &str = "https://videos.example/en/abc-123";
const MISSING: &str = "https://videos.example/en/def-456";
const BROKEN: &str = "https://videos.example/en/ghi-789";

fn config(output: &Path, concurrency: usize) -> ScrapeConfig {
    ScrapeConfig::builder()
        .output_path(output)
        .concurrency(concurrency)
        .capture_deadline_secs(3)
        .capture_interval_secs(1)
        .build()
        .unwrap()
}

fn read_rows(path: &Path) -> Vec<CsvRow> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().collect::<Result<_, _>>().unwrap()
}

fn engine() -> FakeEngine {
    FakeEngine::new()
        .with_page(
            FOUND,
            FakePage::new(video_page("First Title", "ABC-123", &["A", "B"])).with_requests(&[
                "https://videos.example/en/abc-123",
                "https://cdn.example/abc/v1/video.m3u8",
                "https://cdn.example/abc/v2/video.m3u8",
            ]),
        )
        .with_page(
            MISSING,
            FakePage::new(video_page("Second Title", "DEF-456", &["C"]))
                .with_requests(&["https://cdn.example/def/video.mp4"]),
        )
        .with_page(
            BROKEN,
            FakePage::failing(SessionError::Open {
                address: BROKEN.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        )
}

#[tokio::test(start_paused = true)]
async fn test_scrape_writes_one_row_per_page_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let engine = Arc::new(engine().with_hold(Duration::from_millis(200)));

    let addresses = vec![FOUND.to_string(), MISSING.to_string(), BROKEN.to_string()];
    let run = scrape_records(
        Arc::clone(&engine),
        addresses,
        &config(&output, 2),
        DispatchGate::new(),
        &NoOpProgress,
    )
    .await
    .unwrap();

    assert_eq!(run.summary.found, 1);
    assert_eq!(run.summary.not_found, 1);
    assert_eq!(run.summary.error, 1);
    assert_eq!(run.summary.skipped, 0);

    let statuses: Vec<RecordStatus> = run.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![RecordStatus::Found, RecordStatus::NotFound, RecordStatus::Error]
    );

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].video_url, FOUND);
    assert_eq!(rows[0].m3u8_url, "https://cdn.example/abc/v1/video.m3u8");
    assert_eq!(rows[0].title, "First Title");
    assert_eq!(rows[0].code, "ABC-123");
    assert_eq!(rows[0].genre, "A, B");
    assert_eq!(rows[0].description, "About ABC-123");
    assert_eq!(rows[0].thumbnail_url, "https://fourhoi.com/abc-123/cover-n.jpg");

    assert_eq!(rows[1].video_url, MISSING);
    assert_eq!(rows[1].m3u8_url, "Not found");
    assert_eq!(rows[1].code, "DEF-456");

    assert_eq!(rows[2].video_url, BROKEN);
    assert_eq!(rows[2].m3u8_url, "Error");
    assert!(rows[2].title.is_empty());

    // Every opened session was released
    assert_eq!(engine.active(), 0);
    assert_eq!(engine.opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_page_list_duplicates_are_dropped_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("links.txt");
    tokio::fs::write(&list, format!("{FOUND}\n\n  {MISSING}  \n{FOUND}\n"))
        .await
        .unwrap();

    let loaded = read_link_list(&list).await.unwrap();
    assert_eq!(loaded, vec![FOUND.to_string(), MISSING.to_string()]);

    let output = dir.path().join("records.csv");
    let engine = Arc::new(engine());
    let run = scrape_records(
        Arc::clone(&engine),
        loaded,
        &config(&output, 3),
        DispatchGate::new(),
        &NoOpProgress,
    )
    .await
    .unwrap();
    assert_eq!(run.records.len(), 2);
    assert_eq!(engine.opened(), 2);

    // The scheduler itself dispatches every occurrence it is given
    let repeated = vec![FOUND.to_string(), MISSING.to_string(), FOUND.to_string()];
    let engine = Arc::new(self::engine());
    let run = scrape_records(
        Arc::clone(&engine),
        repeated,
        &config(&output, 3),
        DispatchGate::new(),
        &NoOpProgress,
    )
    .await
    .unwrap();
    assert_eq!(run.records.len(), 3);
    assert_eq!(engine.opened(), 3);
    assert_eq!(read_rows(&output).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_lost_transport_stops_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let dead = "https://videos.example/en/dead-1";
    let engine = Arc::new(
        self::engine().with_page(dead, FakePage::failing(SessionError::Transport("connection closed".into()))),
    );

    let addresses = vec![
        dead.to_string(),
        FOUND.to_string(),
        MISSING.to_string(),
        BROKEN.to_string(),
    ];
    let gate = DispatchGate::new();
    let run = scrape_records(
        Arc::clone(&engine),
        addresses,
        &config(&output, 1),
        gate.clone(),
        &NoOpProgress,
    )
    .await
    .unwrap();

    assert!(gate.is_closed());
    assert!(gate.reason().unwrap().contains("transport"));
    assert_eq!(run.summary.error, 1);
    assert_eq!(run.summary.skipped, 3);
    assert_eq!(engine.opened(), 0);

    // Skipped tasks leave no row behind
    let rows = read_rows(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].video_url, dead);
    assert_eq!(rows[0].m3u8_url, "Error");
}

#[tokio::test(start_paused = true)]
async fn test_closed_gate_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("records.csv");
    let gate = DispatchGate::new();
    gate.close("interrupted");

    let run = scrape_records(
        Arc::new(engine()),
        vec![FOUND.to_string(), MISSING.to_string()],
        &config(&output, 2),
        gate,
        &NoOpProgress,
    )
    .await
    .unwrap();

    assert!(run.records.is_empty());
    assert_eq!(run.summary.skipped, 2);

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        written.trim_end(),
        stream_harvest::content_saver::CSV_HEADERS.join(",")
    );
}
