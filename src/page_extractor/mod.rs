//! Page data extraction functions.
//!
//! Everything here works on rendered markup already fetched from a session,
//! so extraction is pure and synchronous.

pub mod links;
pub mod metadata;
pub mod schema;

pub use links::{LinkFilter, LinkSet, harvest_links};
pub use metadata::{ExtractorError, MetadataExtractor};
pub use schema::{RecordStatus, VideoMetadata, VideoRecord};
