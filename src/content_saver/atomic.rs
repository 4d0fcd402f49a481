use std::io::Write;
use std::path::Path;

use super::SaveError;

/// Write `bytes` to a sibling temp file, then rename it over `path`.
///
/// Readers never observe a half-written checkpoint.
pub(super) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SaveError> {
    let io_err = |source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let mut file = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    file.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Run a blocking save on the blocking pool
pub(super) async fn run_blocking<F>(save: F) -> Result<(), SaveError>
where
    F: FnOnce() -> Result<(), SaveError> + Send + 'static,
{
    tokio::task::spawn_blocking(save)
        .await
        .map_err(|e| SaveError::Task(e.to_string()))?
}
