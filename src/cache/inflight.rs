//! Per-digest render locks.
//!
//! Two requests for the same digest would both miss the cache and both spawn
//! a renderer. Holding a [`RenderGuard`] across cache check, render and store
//! collapses them: the second request waits, then finds the first one's
//! result in the cache.
//!
//! This only deduplicates work inside one process. Separate processes sharing
//! a cache directory may still render the same digest twice, which wastes a
//! render but cannot corrupt the cache.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::digest::CacheDigest;

/// Registry of in-flight renders keyed by digest.
#[derive(Debug, Clone, Default)]
pub struct RenderLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl RenderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task is rendering `digest`, then claim it.
    pub async fn acquire(&self, digest: &CacheDigest) -> RenderGuard {
        let key = digest.as_str().to_string();
        let mutex = Arc::clone(&*self.locks.entry(key.clone()).or_default());

        if mutex.try_lock().is_err() {
            tracing::debug!(target: "graphsvg::cache", "Waiting for in-flight render of {}", key);
        }
        let guard = mutex.lock_owned().await;

        RenderGuard {
            key,
            locks: Arc::clone(&self.locks),
            _guard: guard,
        }
    }

    /// Number of digests with a holder or waiter.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive claim on one digest; released on drop.
#[derive(Debug)]
pub struct RenderGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        // One reference in the map and one in this guard means nobody is waiting
        self.locks.remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) <= 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn digest(c: char) -> CacheDigest {
        CacheDigest::parse(&c.to_string().repeat(64)).unwrap()
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = RenderLocks::new();
        {
            let _guard = locks.acquire(&digest('a')).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_digest_is_serialized() {
        let locks = RenderLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let active = Arc::clone(&active);
                let max_active = Arc::clone(&max_active);
                tokio::spawn(async move {
                    let _guard = locks.acquire(&digest('b')).await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_digests_do_not_block() {
        let locks = RenderLocks::new();
        let _a = locks.acquire(&digest('c')).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(&digest('d'))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
