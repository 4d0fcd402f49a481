use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::SaveError;
use super::atomic::{run_blocking, write_atomic};
use crate::page_extractor::LinkSet;
use crate::utils::is_valid_url;

/// Read a newline-separated page list.
///
/// Surrounding whitespace is trimmed, blank lines are ignored and repeated
/// addresses are dropped, keeping the first occurrence. Entries that are not
/// http(s) addresses are kept and logged; their tasks fail with an error row.
pub async fn read_link_list(path: &Path) -> Result<Vec<String>, SaveError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let mut seen = HashSet::new();
    let links: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(*line))
        .map(str::to_string)
        .collect();

    for link in links.iter().filter(|link| !is_valid_url(link)) {
        log::warn!("'{link}' in {} is not an http(s) address", path.display());
    }

    let dropped = raw.lines().filter(|l| !l.trim().is_empty()).count() - links.len();
    if dropped > 0 {
        log::info!("Dropped {dropped} duplicate addresses from {}", path.display());
    }
    Ok(links)
}

/// Write `links` sorted, one per line
pub async fn save_link_list(path: PathBuf, links: &LinkSet) -> Result<(), SaveError> {
    let mut body = String::new();
    for link in links {
        body.push_str(link);
        body.push('\n');
    }
    let count = links.len();

    run_blocking(move || {
        write_atomic(&path, body.as_bytes())?;
        log::debug!("Saved {count} links to {}", path.display());
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_skips_blanks_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(
            &path,
            "https://x/a-1\n\n  https://x/a-1  \nhttps://x/a-2\r\n   \n",
        )
        .unwrap();

        let links = read_link_list(&path).await.unwrap();
        assert_eq!(links, vec!["https://x/a-1", "https://x/a-2"]);
    }

    #[tokio::test]
    async fn test_save_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        let links: LinkSet = ["https://x/b-2", "https://x/a-1"].into_iter().map(String::from).collect();

        save_link_list(path.clone(), &links).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://x/a-1\nhttps://x/b-2\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_link_list(&dir.path().join("absent.txt")).await;
        assert!(matches!(result, Err(SaveError::Io { .. })));
    }
}
