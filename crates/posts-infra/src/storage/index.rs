//! The post index: one `_index/{id}.json` file per post.
//!
//! Listing reads only the index, never post directories. The loaded index is
//! kept in memory for a TTL and dropped whenever this process writes to it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use posts_core::RepoError;
use posts_core::domain::IndexEntry;

use super::files::{read_json, write_json};
use super::layout::StorageLayout;

struct Snapshot {
    loaded_at: Instant,
    entries: Arc<Vec<IndexEntry>>,
}

/// Cached index plus a generation bumped by every invalidation, so a load
/// that raced with a write is never installed.
#[derive(Default)]
struct State {
    generation: u64,
    snapshot: Option<Snapshot>,
}

pub(crate) struct PostIndex {
    layout: StorageLayout,
    ttl: Duration,
    state: RwLock<State>,
}

impl PostIndex {
    pub fn new(layout: StorageLayout, ttl: Duration) -> Self {
        Self {
            layout,
            ttl,
            state: RwLock::new(State::default()),
        }
    }

    /// All index entries, from memory while the snapshot is fresh.
    pub async fn entries(&self) -> Result<Arc<Vec<IndexEntry>>, RepoError> {
        let generation = {
            let state = self.state.read().await;
            if let Some(snapshot) = &state.snapshot {
                if snapshot.loaded_at.elapsed() < self.ttl {
                    return Ok(snapshot.entries.clone());
                }
            }
            state.generation
        };

        let entries = Arc::new(self.load().await?);

        let mut state = self.state.write().await;
        if state.generation == generation {
            state.snapshot = Some(Snapshot {
                loaded_at: Instant::now(),
                entries: entries.clone(),
            });
            tracing::debug!(entries = entries.len(), "Post index loaded");
        } else {
            tracing::debug!("Index changed while loading, snapshot not kept");
        }

        Ok(entries)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<IndexEntry>, RepoError> {
        let entries = self.entries().await?;
        Ok(entries.iter().find(|entry| entry.id == id).cloned())
    }

    pub async fn write(&self, entry: &IndexEntry) -> Result<(), RepoError> {
        write_json(&self.layout.index_file(entry.id), entry).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Remove the entry for `id`. Returns `false` if there was none.
    pub async fn remove(&self, id: Uuid) -> Result<bool, RepoError> {
        let path = self.layout.index_file(id);
        let removed = match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(RepoError::io(&path, e)),
        };
        self.invalidate().await;
        Ok(removed)
    }

    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.snapshot = None;
    }

    /// The entry for `id` as currently on disk, bypassing the snapshot.
    /// A missing or unreadable file reads as `None`.
    pub async fn read_entry(&self, id: Uuid) -> Option<IndexEntry> {
        let path = self.layout.index_file(id);
        match read_json::<IndexEntry>(&path).await {
            Ok(entry) => Some(entry),
            Err(RepoError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable index entry");
                None
            }
        }
    }

    /// Entries currently on disk, keyed by id, bypassing the snapshot.
    pub async fn on_disk(&self) -> Result<HashMap<Uuid, IndexEntry>, RepoError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|entry| (entry.id, entry))
            .collect())
    }

    /// Read every entry file. Unreadable entries are skipped with a warning
    /// rather than failing the whole listing.
    async fn load(&self) -> Result<Vec<IndexEntry>, RepoError> {
        let dir = self.layout.index_dir();
        let mut files = match fs::read_dir(&dir).await {
            Ok(files) => files,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepoError::io(&dir, e)),
        };

        let mut entries = Vec::new();
        while let Some(file) = files
            .next_entry()
            .await
            .map_err(|e| RepoError::io(&dir, e))?
        {
            let path = file.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_json::<IndexEntry>(&path).await {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable index entry");
                }
            }
        }

        Ok(entries)
    }
}
