use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

use posts_core::domain::{
    IndexEntry, ListQuery, NewPost, PatchOutcome, Post, PostContent, PostMetadata, PostPage,
    PostPatch, User, timestamp,
};
use posts_core::policy::{self, Mutation};
use posts_core::ports::{ActivityLog, ActivityRecord, Cache, PostRepository, UserRoster};
use posts_core::{PostError, RepoError};

use super::config::StoreConfig;
use super::files::{read_json, write_json};
use super::index::PostIndex;
use super::layout::{self, CONTENT_FILE, METADATA_FILE, StorageLayout};
use super::lock::{LockMarker, PostLocks};

/// Outcome of [`FilePostStore::rebuild_index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexRebuildReport {
    /// Posts found on disk and (re)written to the index.
    pub indexed: usize,
    /// Index entries dropped because their post directory is gone.
    pub removed: usize,
    /// Post directories without readable metadata.
    pub skipped: usize,
}

/// A resolved post directory.
struct Located {
    dir: PathBuf,
    /// Path as recorded in the index.
    stored: PathBuf,
    entry: Option<IndexEntry>,
}

/// File-backed post store.
///
/// Owns its caches and lock table; construct one per data directory and share
/// it behind an `Arc`.
pub struct FilePostStore {
    config: StoreConfig,
    layout: StorageLayout,
    index: PostIndex,
    locks: PostLocks,
    cache: Arc<dyn Cache>,
    roster: Arc<dyn UserRoster>,
    activity: Arc<dyn ActivityLog>,
}

fn cache_key(id: Uuid) -> String {
    format!("post:{id}")
}

impl FilePostStore {
    /// Open the store, creating the directory layout if needed.
    pub async fn open(
        config: StoreConfig,
        cache: Arc<dyn Cache>,
        roster: Arc<dyn UserRoster>,
        activity: Arc<dyn ActivityLog>,
    ) -> Result<Self, RepoError> {
        let layout = StorageLayout::new(config.posts_dir());
        let index = PostIndex::new(layout.clone(), config.cache_ttl);

        let store = Self {
            config,
            layout,
            index,
            locks: PostLocks::new(),
            cache,
            roster,
            activity,
        };
        store.ensure_layout().await?;

        tracing::info!(
            data_dir = %store.config.data_dir.display(),
            scan_fallback = store.config.scan_fallback,
            "Post store opened"
        );

        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the posts, index and logs directories.
    pub async fn ensure_layout(&self) -> Result<(), RepoError> {
        let dirs = [
            self.layout.posts_dir().to_path_buf(),
            self.layout.index_dir(),
            self.config.logs_dir(),
        ];
        for dir in dirs {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| RepoError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Regenerate the index from the post directories.
    ///
    /// Every post directory with readable metadata gets a fresh index entry;
    /// entries whose directory is gone are removed.
    pub async fn rebuild_index(&self) -> Result<IndexRebuildReport, PostError> {
        match self.rebuild().await {
            Ok(report) => {
                tracing::info!(
                    indexed = report.indexed,
                    removed = report.removed,
                    skipped = report.skipped,
                    "Post index rebuilt"
                );
                self.activity
                    .record(
                        ActivityRecord::info("Rebuilt post index")
                            .with("indexed", report.indexed)
                            .with("removed", report.removed)
                            .with("skipped", report.skipped),
                    )
                    .await;
                Ok(report)
            }
            Err(source) => {
                self.record_failure("Error rebuilding index", &source, None, None)
                    .await;
                Err(PostError::storage("Failed to rebuild index", source))
            }
        }
    }

    async fn rebuild(&self) -> Result<IndexRebuildReport, RepoError> {
        let mut report = IndexRebuildReport::default();
        let existing = self.index.on_disk().await?;
        let mut live = HashSet::new();

        for (id, stored) in self.layout.scan().await? {
            let _guard = self.locks.acquire(id).await;
            let dir = self.layout.resolve(&stored);
            if !layout::is_dir(&dir).await {
                // Deleted since the scan
                continue;
            }

            let mut metadata = match read_json::<PostMetadata>(&dir.join(METADATA_FILE)).await {
                Ok(metadata) if metadata.id == id => metadata,
                Ok(metadata) => {
                    tracing::warn!(
                        path = %dir.display(),
                        found = %metadata.id,
                        "Metadata id does not match its directory"
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Skipping post without readable metadata");
                    report.skipped += 1;
                    continue;
                }
            };

            // Content-only updates refresh the index entry but not metadata.json
            if let Some(current) = self.index.read_entry(id).await {
                metadata.updated_at = metadata.updated_at.max(current.metadata.updated_at);
            }

            self.index
                .write(&IndexEntry {
                    id,
                    path: stored,
                    metadata,
                })
                .await?;
            live.insert(id);
            report.indexed += 1;
        }

        for (id, entry) in existing.iter().filter(|(id, _)| !live.contains(*id)) {
            let _guard = self.locks.acquire(*id).await;
            if layout::is_dir(&self.layout.resolve(&entry.path)).await {
                // Created since the scan
                continue;
            }
            self.index.remove(*id).await?;
            self.forget(*id).await;
            report.removed += 1;
        }

        Ok(report)
    }

    /// Resolve a post's directory through the index, then (if enabled) by
    /// scanning the date buckets.
    async fn locate(&self, id: Uuid) -> Result<Option<Located>, RepoError> {
        if let Some(entry) = self.index.find(id).await? {
            let dir = self.layout.resolve(&entry.path);
            if layout::is_dir(&dir).await {
                return Ok(Some(Located {
                    dir,
                    stored: entry.path.clone(),
                    entry: Some(entry),
                }));
            }
            tracing::debug!(post_id = %id, path = %dir.display(), "Index entry points at a missing directory");
        }

        if self.config.scan_fallback {
            if let Some(stored) = self.layout.find(id).await? {
                tracing::info!(post_id = %id, "Post located by directory scan");
                return Ok(Some(Located {
                    dir: self.layout.resolve(&stored),
                    stored,
                    entry: None,
                }));
            }
        }

        Ok(None)
    }

    /// Cache first, then disk.
    ///
    /// Misses are filled under the post's write lock, so a fill can never
    /// replace what a concurrent writer has just cached.
    async fn fetch(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        if let Some(post) = self.cached(id).await {
            return Ok(Some(post));
        }

        let _guard = self.locks.acquire(id).await;
        if let Some(post) = self.cached(id).await {
            return Ok(Some(post));
        }

        let Some((post, _)) = self.load(id).await? else {
            return Ok(None);
        };
        self.remember(&post).await;
        Ok(Some(post))
    }

    /// Read a post from disk, bypassing the cache.
    async fn load(&self, id: Uuid) -> Result<Option<(Post, Located)>, RepoError> {
        let Some(located) = self.locate(id).await? else {
            return Ok(None);
        };

        let metadata_path = located.dir.join(METADATA_FILE);
        let content_path = located.dir.join(CONTENT_FILE);
        let (metadata, content) = tokio::try_join!(
            read_json::<PostMetadata>(&metadata_path),
            read_json::<PostContent>(&content_path)
        )?;

        let mut post = Post::from_parts(metadata, content);
        if let Some(entry) = &located.entry {
            post.updated_at = post.updated_at.max(entry.metadata.updated_at);
        }

        Ok(Some((post, located)))
    }

    async fn persist_new(&self, post: &Post, stored: &Path, dir: &Path) -> Result<(), RepoError> {
        let metadata = post.metadata();
        write_json(&dir.join(METADATA_FILE), &metadata).await?;
        write_json(&dir.join(CONTENT_FILE), &post.body()).await?;
        self.index
            .write(&IndexEntry {
                id: post.id,
                path: stored.to_path_buf(),
                metadata,
            })
            .await
    }

    async fn persist_update(&self, outcome: &PatchOutcome, located: &Located) -> Result<(), RepoError> {
        let metadata = outcome.post.metadata();
        if outcome.metadata_changed {
            write_json(&located.dir.join(METADATA_FILE), &metadata).await?;
        }
        if outcome.content_changed {
            write_json(&located.dir.join(CONTENT_FILE), &outcome.post.body()).await?;
        }
        // Always rewritten so the index carries the new updatedAt
        self.index
            .write(&IndexEntry {
                id: outcome.post.id,
                path: located.stored.clone(),
                metadata,
            })
            .await
    }

    async fn remove(&self, id: Uuid) -> Result<bool, RepoError> {
        let located = self.locate(id).await?;
        self.forget(id).await;

        let Some(located) = located else {
            return Ok(false);
        };

        fs::remove_dir_all(&located.dir)
            .await
            .map_err(|e| RepoError::io(&located.dir, e))?;

        if let Err(e) = self.index.remove(id).await {
            tracing::warn!(post_id = %id, error = %e, "Failed to remove index entry");
        }

        Ok(true)
    }

    async fn authorize<'a>(
        &self,
        user: Option<&'a User>,
        post: &Post,
        mutation: Mutation,
    ) -> Result<&'a User, PostError> {
        let is_staff = match user {
            Some(u) if policy::needs_staff_check(user, post) => self.is_staff(&u.login).await,
            _ => false,
        };

        policy::authorize_mutation(user, is_staff, post, mutation).inspect_err(|_| {
            tracing::info!(
                post_id = %post.id,
                login = user.map(|u| u.login.as_str()).unwrap_or("<anonymous>"),
                ?mutation,
                "Mutation denied"
            );
        })
    }

    async fn is_staff(&self, login: &str) -> bool {
        match self.roster.find_by_login(login).await {
            Ok(found) => found.is_some_and(|u| u.staff),
            Err(e) => {
                tracing::warn!(login, error = %e, "Roster lookup failed, treating user as non-staff");
                false
            }
        }
    }

    async fn cached(&self, id: Uuid) -> Option<Post> {
        match self.cache.get_json::<Post>(&cache_key(id)).await {
            Ok(Some(post)) => {
                tracing::debug!(post_id = %id, "Post cache hit");
                Some(post)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(post_id = %id, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn remember(&self, post: &Post) {
        if let Err(e) = self
            .cache
            .set_json(&cache_key(post.id), post, Some(self.config.cache_ttl))
            .await
        {
            tracing::warn!(post_id = %post.id, error = %e, "Failed to cache post");
        }
    }

    async fn forget(&self, id: Uuid) {
        self.cache.delete(&cache_key(id)).await;
    }

    async fn record_failure(
        &self,
        message: &str,
        error: &RepoError,
        post_id: Option<Uuid>,
        user: Option<&User>,
    ) {
        let mut record = ActivityRecord::error(message).with("error", error.to_string());
        if let Some(id) = post_id {
            record = record.with("postId", id.to_string());
        }
        if let Some(user) = user {
            record = record.with("userId", user.id);
        }
        self.activity.record(record).await;
    }

    async fn record_success(&self, message: String, id: Uuid, user: &User) {
        self.activity
            .record(
                ActivityRecord::info(message)
                    .with("postId", id.to_string())
                    .with("userId", user.id),
            )
            .await;
    }
}

#[async_trait]
impl PostRepository for FilePostStore {
    async fn create(&self, new_post: NewPost, user: Option<&User>) -> Result<Post, PostError> {
        let user = policy::authorize_create(user, &new_post)?;

        let id = Uuid::new_v4();
        let now = timestamp::now();
        let stored = StorageLayout::relative_post_dir(id, now);
        let dir = self.layout.resolve(&stored);

        fs::create_dir_all(&dir).await.map_err(|e| {
            PostError::storage("Failed to create post directory", RepoError::io(&dir, e))
        })?;

        let _guard = self.locks.acquire(id).await;
        let marker = LockMarker::create(&dir)
            .await
            .map_err(|e| PostError::storage("Failed to create lock file", e))?;

        let post = Post::create(new_post, id, now);
        let written = self.persist_new(&post, &stored, &dir).await;
        marker.release().await;

        match written {
            Ok(()) => {
                self.record_success(format!("Created post {id}"), id, user).await;
                self.remember(&post).await;
                Ok(post)
            }
            Err(source) => {
                self.record_failure("Error creating post", &source, Some(id), Some(user))
                    .await;
                Err(PostError::storage("Failed to create post", source))
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, PostError> {
        match self.fetch(id).await {
            Ok(found) => Ok(found),
            Err(source) => {
                self.record_failure("Error reading post", &source, Some(id), None)
                    .await;
                Err(PostError::storage("Failed to read post", source))
            }
        }
    }

    async fn update(
        &self,
        id: Uuid,
        patch: PostPatch,
        user: Option<&User>,
    ) -> Result<Option<Post>, PostError> {
        let Some(current) = self.get(id).await? else {
            return Ok(None);
        };
        let user = self.authorize(user, &current, Mutation::Modify).await?;

        let _guard = self.locks.acquire(id).await;

        // Re-read from disk under the lock: a writer we waited for may have
        // changed the post
        let (latest, located) = match self.load(id).await {
            Ok(Some(found)) => found,
            Ok(None) => return Ok(None),
            Err(source) => {
                self.record_failure("Error updating post", &source, Some(id), Some(user))
                    .await;
                return Err(PostError::storage("Failed to update post", source));
            }
        };
        if latest.author != current.author {
            self.authorize(Some(user), &latest, Mutation::Modify).await?;
        }

        if LockMarker::is_held(&located.dir, self.config.lock_stale_after).await {
            tracing::warn!(post_id = %id, "Post is locked for editing");
            return Err(PostError::Locked(id));
        }
        let marker = LockMarker::create(&located.dir)
            .await
            .map_err(|e| PostError::storage("Failed to create lock file", e))?;

        let outcome = latest.apply(patch, timestamp::now());
        let written = self.persist_update(&outcome, &located).await;
        marker.release().await;

        match written {
            Ok(()) => {
                self.record_success(format!("Updated post {id}"), id, user).await;
                self.remember(&outcome.post).await;
                Ok(Some(outcome.post))
            }
            Err(source) => {
                // The files may be half-updated; drop the cached copy
                self.forget(id).await;
                self.record_failure("Error updating post", &source, Some(id), Some(user))
                    .await;
                Err(PostError::storage("Failed to update post", source))
            }
        }
    }

    async fn delete(&self, id: Uuid, user: Option<&User>) -> Result<bool, PostError> {
        let Some(current) = self.get(id).await? else {
            return Ok(false);
        };
        let user = self.authorize(user, &current, Mutation::Delete).await?;

        let _guard = self.locks.acquire(id).await;

        match self.remove(id).await {
            Ok(removed) => {
                if removed {
                    self.record_success(format!("Deleted post {id}"), id, user).await;
                }
                Ok(removed)
            }
            Err(source) => {
                self.record_failure("Error deleting post", &source, Some(id), Some(user))
                    .await;
                Err(PostError::storage("Failed to delete post", source))
            }
        }
    }

    async fn list(&self, query: &ListQuery) -> Result<PostPage, PostError> {
        match self.list_page(query).await {
            Ok(page) => Ok(page),
            Err(source) => {
                self.record_failure("Error listing posts", &source, None, None)
                    .await;
                Err(PostError::storage("Failed to list posts", source))
            }
        }
    }
}

impl FilePostStore {
    async fn list_page(&self, query: &ListQuery) -> Result<PostPage, RepoError> {
        let entries = self.index.entries().await?;

        let mut matched: Vec<&IndexEntry> = entries
            .iter()
            .filter(|entry| query.matches(&entry.metadata))
            .collect();
        // Newest first; ids break ties so pages are stable
        matched.sort_by(|a, b| {
            b.metadata
                .created_at
                .cmp(&a.metadata.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len();
        let page: Vec<Uuid> = matched
            .iter()
            .skip(query.skip())
            .take(query.limit as usize)
            .map(|entry| entry.id)
            .collect();

        let posts = try_join_all(page.into_iter().map(|id| self.fetch(id)))
            .await?
            .into_iter()
            .flatten()
            .collect();

        Ok(PostPage {
            posts,
            total,
            has_more: query.has_more(total),
        })
    }
}
