//! Output files for scrape runs

// Module declarations
mod atomic;
mod csv_saver;
mod link_list;

use std::path::PathBuf;

// Re-export public API from csv_saver module
pub use csv_saver::{CSV_HEADERS, CsvRow, save_records};

// Re-export public API from link_list module
pub use link_list::{read_link_list, save_link_list};

/// Failure while reading or writing an output file
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Save task failed: {0}")]
    Task(String),
}
