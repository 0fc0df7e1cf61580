//! File system helpers shared by the cache and asset writers.
//!
//! Writes go through [`atomic_write`]: content lands in a temporary file in
//! the destination directory and is renamed into place, so a reader never
//! observes a partially written SVG. Concurrent writers of the same path
//! race on the rename only, and since graphsvg only ever writes
//! content-addressed files, whichever rename wins leaves identical bytes.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

/// Create `path` and all missing parents.
///
/// # Errors
///
/// Fails if the directory cannot be created or if `path` exists and is not a
/// directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Ensure the parent directory of a file path exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Atomically write `content` to `path`, creating parent directories.
///
/// # Examples
///
/// ```rust,no_run
/// use graphsvg::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("_site/images/graphs/graphs-abc.svg"), b"<svg/>")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in: {}", dir.display()))?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write to temp file: {}", temp.path().display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Async wrapper around [`atomic_write`] that runs on the blocking pool.
pub async fn atomic_write_async(path: &Path, content: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || atomic_write(&path, &content))
        .await
        .context("Failed to join file write task")?
}

/// Count regular files directly under `path` matching `filter`, and sum their sizes.
///
/// A missing directory counts as empty.
pub fn file_stats(path: &Path, filter: impl Fn(&Path) -> bool) -> Result<(usize, u64)> {
    if !path.exists() {
        return Ok((0, 0));
    }

    let mut count = 0;
    let mut total = 0;
    for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory: {}", path.display()))?;
        if entry.file_type().is_file() && filter(entry.path()) {
            count += 1;
            total += entry
                .metadata()
                .with_context(|| format!("Failed to stat: {}", entry.path().display()))?
                .len();
        }
    }
    Ok((count, total))
}
