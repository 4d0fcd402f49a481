use serde::{Deserialize, Serialize};

/// Outcome of one record scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// The streaming resource was captured
    Found,
    /// The page loaded but no matching request was seen before the deadline
    NotFound,
    /// The session could not be opened or the page failed mid-task
    Error,
}

/// Descriptive fields extracted from a rendered page. Missing fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMetadata {
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

/// One normalized record per scraped page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub source_url: String,
    pub resource_url: Option<String>,
    pub status: RecordStatus,
    #[serde(flatten)]
    pub metadata: VideoMetadata,
    /// Failure reason for [`RecordStatus::Error`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoRecord {
    /// Build a record from a completed page visit; the status follows the capture.
    #[must_use]
    pub fn from_visit(source_url: impl Into<String>, resource_url: Option<String>, metadata: VideoMetadata) -> Self {
        let status = if resource_url.is_some() {
            RecordStatus::Found
        } else {
            RecordStatus::NotFound
        };
        Self {
            source_url: source_url.into(),
            resource_url,
            status,
            metadata,
            error: None,
        }
    }

    /// Record for a page whose task failed
    #[must_use]
    pub fn failed(source_url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            resource_url: None,
            status: RecordStatus::Error,
            metadata: VideoMetadata::default(),
            error: Some(reason.into()),
        }
    }
}
