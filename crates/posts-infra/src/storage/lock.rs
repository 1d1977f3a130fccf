//! Write exclusion for individual posts.
//!
//! Inside the process, [`PostLocks`] hands out one async mutex per post id,
//! so writers to the same post run one after another. Across processes
//! sharing a data directory, a `.lock` marker file in the post directory
//! signals a write in flight; it is advisory and judged by its age.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use posts_core::RepoError;

use super::layout::LOCK_FILE;

/// Per-post async mutexes.
#[derive(Default)]
pub(crate) struct PostLocks {
    slots: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

/// Exclusive write access to one post. Released on drop.
pub(crate) struct PostWriteGuard {
    _guard: OwnedMutexGuard<()>,
}

impl PostLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `id`.
    pub async fn acquire(&self, id: Uuid) -> PostWriteGuard {
        let slot = {
            let mut slots = self.slots.lock().await;
            // Slots nobody holds or waits on only have the map's reference
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(id).or_default().clone()
        };

        if slot.try_lock().is_err() {
            tracing::debug!(post_id = %id, "Waiting for post write lock");
        }

        PostWriteGuard {
            _guard: slot.lock_owned().await,
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.slots.lock().await.len()
    }
}

/// The `.lock` marker file of a post directory.
///
/// Call [`LockMarker::release`] when the write is done; a marker dropped
/// without release is removed synchronously.
pub(crate) struct LockMarker {
    path: PathBuf,
    released: bool,
}

impl LockMarker {
    /// Whether `dir` carries a marker younger than `stale_after`.
    pub async fn is_held(dir: &Path, stale_after: Duration) -> bool {
        let Ok(meta) = fs::metadata(dir.join(LOCK_FILE)).await else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return true;
        };

        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < stale_after,
            // Written "in the future": clock skew, treat as fresh
            Err(_) => true,
        }
    }

    pub async fn create(dir: &Path) -> Result<Self, RepoError> {
        let path = dir.join(LOCK_FILE);
        fs::write(&path, b"")
            .await
            .map_err(|e| RepoError::io(&path, e))?;
        Ok(Self {
            path,
            released: false,
        })
    }

    pub async fn release(mut self) {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
            }
        }
    }
}

impl Drop for LockMarker {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
