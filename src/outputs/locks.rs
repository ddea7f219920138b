//! Process-wide registry of per-file write locks.
//!
//! Locks are created lazily, one per path, under a single coordinating
//! mutex so two tasks racing on a new path always get the same lock. The map
//! itself is private; callers only [`LockRegistry::acquire`] a [`PathLock`]
//! and release it.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

static GLOBAL: Lazy<LockRegistry> = Lazy::new(LockRegistry::new);

#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

/// Exclusive hold on one path. Released on [`PathLock::release`] or drop.
#[derive(Debug)]
pub struct PathLock {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl PathLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) {
        trace!(path = %self.path.display(), "Released path lock");
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every writer in the process.
    pub fn global() -> &'static LockRegistry {
        &GLOBAL
    }

    /// Wait for exclusive access to `path`.
    pub async fn acquire(&self, path: &Path) -> PathLock {
        let lock = self.lock_for(path);
        let guard = lock.lock_owned().await;
        trace!(path = %path.display(), "Acquired path lock");
        PathLock {
            path: path.to_path_buf(),
            _guard: guard,
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_racing_creators_share_one_lock() {
        let registry = Arc::new(LockRegistry::new());
        let path = PathBuf::from("/tmp/out/US/2017/01.json");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let path = path.clone();
                std::thread::spawn(move || registry.lock_for(&path))
            })
            .collect();
        let locks: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(locks.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let registry = LockRegistry::new();
        let path = Path::new("/tmp/out/US/2017/01.json");

        let held = registry.acquire(path).await;
        assert_eq!(held.path(), path);
        assert!(
            timeout(Duration::from_millis(50), registry.acquire(path))
                .await
                .is_err()
        );

        held.release();
        let again = timeout(Duration::from_millis(500), registry.acquire(path)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_different_paths_do_not_block() {
        let registry = LockRegistry::new();
        let _us = registry.acquire(Path::new("/tmp/out/US/2017/01.json")).await;
        let uk = timeout(
            Duration::from_millis(500),
            registry.acquire(Path::new("/tmp/out/UK/2017/01.json")),
        )
        .await;
        assert!(uk.is_ok());
        assert_eq!(registry.len(), 2);
    }
}
