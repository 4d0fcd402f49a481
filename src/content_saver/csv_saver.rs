use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::SaveError;
use super::atomic::{run_blocking, write_atomic};
use crate::page_extractor::{RecordStatus, VideoRecord};
use crate::utils::constants::{ERROR_MARKER, NOT_FOUND_MARKER};

/// Header row of the record file, in column order
pub const CSV_HEADERS: [&str; 12] = [
    "video_url",
    "m3u8_url",
    "title",
    "code",
    "release_date",
    "actress",
    "genre",
    "maker",
    "director",
    "label",
    "description",
    "thumbnail_url",
];

/// One row of the record file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub video_url: String,
    /// Captured address, or a status marker
    pub m3u8_url: String,
    pub title: String,
    pub code: String,
    pub release_date: String,
    pub actress: String,
    pub genre: String,
    pub maker: String,
    pub director: String,
    pub label: String,
    pub description: String,
    pub thumbnail_url: String,
}

impl From<&VideoRecord> for CsvRow {
    fn from(record: &VideoRecord) -> Self {
        let m3u8_url = match record.status {
            RecordStatus::Found => record.resource_url.clone().unwrap_or_default(),
            RecordStatus::NotFound => NOT_FOUND_MARKER.to_string(),
            RecordStatus::Error => ERROR_MARKER.to_string(),
        };
        let metadata = &record.metadata;

        Self {
            video_url: record.source_url.clone(),
            m3u8_url,
            title: metadata.title.clone(),
            code: metadata.code.clone(),
            release_date: metadata.release_date.clone(),
            actress: metadata.actress.clone(),
            genre: metadata.genre.clone(),
            maker: metadata.maker.clone(),
            director: metadata.director.clone(),
            label: metadata.label.clone(),
            description: metadata.description.clone(),
            thumbnail_url: metadata.thumbnail_url.clone(),
        }
    }
}

fn encode(rows: &[CsvRow], path: &std::path::Path) -> Result<Vec<u8>, SaveError> {
    let csv_err = |source| SaveError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(CSV_HEADERS).map_err(csv_err)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.into_inner().map_err(|e| csv_err(e.into_error().into()))
}

/// Write `records` as the CSV record file, replacing any previous content.
///
/// Rows keep the order of `records`. The header row is always written.
pub async fn save_records(path: PathBuf, records: &[VideoRecord]) -> Result<(), SaveError> {
    let rows: Vec<CsvRow> = records.iter().map(CsvRow::from).collect();

    run_blocking(move || {
        let bytes = encode(&rows, &path)?;
        write_atomic(&path, &bytes)?;
        log::debug!("Saved {} records to {}", rows.len(), path.display());
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_extractor::VideoMetadata;

    fn metadata(code: &str) -> VideoMetadata {
        VideoMetadata {
            code: code.to_string(),
            genre: "A, B".to_string(),
            ..VideoMetadata::default()
        }
    }

    #[tokio::test]
    async fn test_rows_and_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let records = vec![
            VideoRecord::from_visit("https://s/a-1", Some("https://cdn/a/video.m3u8".into()), metadata("A-1")),
            VideoRecord::from_visit("https://s/b-2", None, metadata("B-2")),
            VideoRecord::failed("https://s/c-3", "boom"),
        ];

        save_records(path.clone(), &records).await.unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, CSV_HEADERS);

        let rows: Vec<CsvRow> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].m3u8_url, "https://cdn/a/video.m3u8");
        assert_eq!(rows[0].genre, "A, B");
        assert_eq!(rows[1].m3u8_url, NOT_FOUND_MARKER);
        assert_eq!(rows[2].m3u8_url, ERROR_MARKER);
        assert_eq!(rows[2].code, "");
    }

    #[tokio::test]
    async fn test_empty_run_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        save_records(path.clone(), &[]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), CSV_HEADERS.join(","));
    }
}
