//! Per-destination locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per destination path.
///
/// Holding the guard makes the existence check and the move for that path
/// one step with respect to other placements through the same placer.
/// Paths are compared as given, so two spellings of one file are not
/// coordinated, and nothing here guards against other processes.
#[derive(Debug, Default)]
pub struct DestinationLocks {
    locks: Mutex<HashMap<PathBuf, Weak<AsyncMutex<()>>>>,
}

impl DestinationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `path`.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, weak| weak.strong_count() > 0);

            match locks.get(path).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(path.to_path_buf(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    /// Number of paths currently locked or waited on.
    pub fn tracked(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let locks = Arc::new(DestinationLocks::new());
        let guard = locks.acquire(Path::new("/out/a.bin")).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(Path::new("/out/a.bin")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_paths_do_not_block() {
        let locks = DestinationLocks::new();
        let _a = locks.acquire(Path::new("/out/a.bin")).await;
        let _b = tokio::time::timeout(
            Duration::from_secs(1),
            locks.acquire(Path::new("/out/b.bin")),
        )
        .await
        .unwrap();
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn test_released_locks_are_forgotten() {
        let locks = DestinationLocks::new();
        {
            let _guard = locks.acquire(Path::new("/out/a.bin")).await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }
}
