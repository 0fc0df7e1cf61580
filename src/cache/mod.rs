//! Content cache for rendered SVG
//!
//! Rendered output is stored under the site's source tree, one file per
//! digest:
//!
//! ```text
//! <site_root>/.graphs-cache/
//! ├── 3f5a...e1.svg
//! └── 9c04...7b.svg
//! ```
//!
//! The cache is read-through and write-once: [`ContentCache::read`] is
//! consulted before every render, and [`ContentCache::write`] stores a
//! successful result. Entries are never rewritten or invalidated
//! automatically; [`ContentCache::remove`] and [`ContentCache::clear`] exist
//! for operators (`graphsvg cache clean`).
//!
//! # Invariants
//!
//! - Empty bytes are never written, so a failed render is retried on the
//!   next request instead of being cached as permanently empty.
//! - Writes go through a temporary file and a rename, so a concurrent reader
//!   sees either a miss or the complete entry.
//! - Two writers of the same digest write identical bytes; whichever rename
//!   lands last wins without changing content.
//!
//! # Modules
//!
//! - [`digest`] - Cache key computation
//! - [`inflight`] - Per-digest locks that collapse concurrent duplicate renders

pub mod digest;
pub mod inflight;

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::constants::CACHE_DIR_NAME;
use crate::utils::fs::{atomic_write_async, file_stats};

pub use digest::CacheDigest;
pub use inflight::{RenderGuard, RenderLocks};

const ENTRY_EXTENSION: &str = "svg";

/// Size summary of a cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of `<digest>.svg` entries
    pub entries: usize,
    /// Total size of those entries in bytes
    pub total_bytes: u64,
}

/// Digest-addressed store of rendered SVG bytes.
#[derive(Debug, Clone)]
pub struct ContentCache {
    /// Directory holding `<digest>.svg` files
    root: PathBuf,
}

impl ContentCache {
    /// Cache rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Cache for a site: `<site_root>/<cache_dir>`, defaulting to
    /// `.graphs-cache`. An absolute `cache_dir` is used as is.
    pub fn for_site(site_root: &Path, cache_dir: Option<&Path>) -> Self {
        Self::new(site_root.join(cache_dir.unwrap_or_else(|| Path::new(CACHE_DIR_NAME))))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `digest`, whether or not it exists.
    pub fn entry_path(&self, digest: &CacheDigest) -> PathBuf {
        self.root.join(format!("{digest}.{ENTRY_EXTENSION}"))
    }

    /// Cached bytes for `digest`, or `None` on a miss.
    ///
    /// # Errors
    ///
    /// Fails only if an entry exists but cannot be read.
    pub async fn read(&self, digest: &CacheDigest) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(digest);
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => {
                // Only possible if something outside graphsvg wrote it
                tracing::warn!(target: "graphsvg::cache", "Ignoring empty cache entry {}", path.display());
                Ok(None)
            }
            Ok(bytes) => {
                tracing::debug!(target: "graphsvg::cache", "Cache hit: {}", digest);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(target: "graphsvg::cache", "Cache miss: {}", digest);
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read cache entry: {}", path.display())),
        }
    }

    /// Store `bytes` for `digest`, creating the cache directory as needed.
    ///
    /// Returns `false` without touching the filesystem when `bytes` is empty.
    pub async fn write(&self, digest: &CacheDigest, bytes: &[u8]) -> Result<bool> {
        if bytes.is_empty() {
            tracing::debug!(target: "graphsvg::cache", "Not caching empty render for {}", digest);
            return Ok(false);
        }

        let path = self.entry_path(digest);
        atomic_write_async(&path, bytes.to_vec())
            .await
            .with_context(|| format!("Failed to write cache entry: {}", path.display()))?;
        tracing::debug!(target: "graphsvg::cache", "Cached {} ({} bytes)", digest, bytes.len());
        Ok(true)
    }

    /// Remove the entry for `digest`. Returns whether one existed.
    pub async fn remove(&self, digest: &CacheDigest) -> Result<bool> {
        let path = self.entry_path(digest);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove cache entry: {}", path.display())),
        }
    }

    /// Remove every entry. Other files in the directory are left alone.
    ///
    /// Returns the number of entries removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for digest in self.digests().await? {
            if self.remove(&digest).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(target: "graphsvg::cache", "Removed {} cache entries from {}", removed, self.root.display());
        }
        Ok(removed)
    }

    /// Digests of every entry currently stored.
    pub async fn digests(&self) -> Result<Vec<CacheDigest>> {
        let mut digests = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(digests),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list cache: {}", self.root.display()));
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            if let Some(digest) = entry_digest(&entry.path()) {
                digests.push(digest);
            }
        }
        digests.sort();
        Ok(digests)
    }

    /// Entry count and total size.
    pub async fn stats(&self) -> Result<CacheStats> {
        let root = self.root.clone();
        let (entries, total_bytes) =
            tokio::task::spawn_blocking(move || file_stats(&root, |path| entry_digest(path).is_some()))
                .await
                .context("Failed to join cache scan task")??;
        Ok(CacheStats {
            entries,
            total_bytes,
        })
    }
}

/// Digest named by a cache entry path, if it is one.
fn entry_digest(path: &Path) -> Option<CacheDigest> {
    if path.extension()? != ENTRY_EXTENSION {
        return None;
    }
    CacheDigest::parse(path.file_stem()?.to_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn digest(c: char) -> CacheDigest {
        CacheDigest::parse(&c.to_string().repeat(64)).unwrap()
    }

    #[test]
    fn test_layout() {
        let cache = ContentCache::for_site(Path::new("/site"), None);
        assert_eq!(cache.root(), Path::new("/site/.graphs-cache"));
        assert_eq!(
            cache.entry_path(&digest('a')),
            PathBuf::from(format!("/site/.graphs-cache/{}.svg", "a".repeat(64)))
        );

        let custom = ContentCache::for_site(Path::new("/site"), Some(Path::new("/var/cache/graphs")));
        assert_eq!(custom.root(), Path::new("/var/cache/graphs"));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::for_site(temp.path(), None);
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>";

        assert!(cache.read(&digest('a')).await.unwrap().is_none());
        assert!(cache.write(&digest('a'), svg).await.unwrap());
        assert_eq!(cache.read(&digest('a')).await.unwrap().unwrap(), svg);
    }

    #[tokio::test]
    async fn test_empty_bytes_are_never_written() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::for_site(temp.path(), None);

        assert!(!cache.write(&digest('b'), b"").await.unwrap());
        assert!(cache.read(&digest('b')).await.unwrap().is_none());
        // Not even the directory is created
        assert!(!cache.root().exists());
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::for_site(temp.path(), None);
        cache.write(&digest('a'), b"1234").await.unwrap();
        cache.write(&digest('b'), b"56").await.unwrap();
        std::fs::write(cache.root().join("README"), "not an entry").unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(
            stats,
            CacheStats {
                entries: 2,
                total_bytes: 6
            }
        );
        assert_eq!(cache.digests().await.unwrap(), vec![digest('a'), digest('b')]);

        assert!(cache.remove(&digest('a')).await.unwrap());
        assert!(!cache.remove(&digest('a')).await.unwrap());
        assert_eq!(cache.clear().await.unwrap(), 1);
        assert_eq!(cache.stats().await.unwrap().entries, 0);
        assert!(cache.root().join("README").exists());
    }

    #[tokio::test]
    async fn test_missing_cache_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path().join("nope"));
        assert_eq!(cache.stats().await.unwrap().entries, 0);
        assert!(cache.digests().await.unwrap().is_empty());
        assert_eq!(cache.clear().await.unwrap(), 0);
    }
}
