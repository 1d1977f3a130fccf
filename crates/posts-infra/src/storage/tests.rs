use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use posts_core::PostError;
use posts_core::domain::{IndexEntry, ListQuery, NewPost, Post, PostPatch, PostStatus, User};
use posts_core::ports::PostRepository;

use super::files::write_json;
use super::layout::{CONTENT_FILE, LOCK_FILE, METADATA_FILE, StorageLayout};
use super::{FilePostStore, StoreConfig};
use crate::activity::FileActivityLog;
use crate::cache::InMemoryCache;
use crate::roster::InMemoryRoster;

async fn open_store(data_dir: &Path, configure: impl FnOnce(&mut StoreConfig)) -> FilePostStore {
    let mut config = StoreConfig::new(data_dir);
    configure(&mut config);
    let logs = config.logs_dir();
    FilePostStore::open(
        config,
        Arc::new(InMemoryCache::new()),
        Arc::new(InMemoryRoster::with_staff(["youness"])),
        Arc::new(FileActivityLog::new(logs)),
    )
    .await
    .unwrap()
}

async fn store_in(data_dir: &Path) -> FilePostStore {
    open_store(data_dir, |_| {}).await
}

fn new_post(title: &str, author: &str, tags: &[&str]) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: format!("Body of {title}"),
        author: author.to_string(),
        status: PostStatus::Published,
        tags: (!tags.is_empty()).then(|| tags.iter().map(|t| t.to_string()).collect()),
    }
}

fn post_dir(data_dir: &Path, post: &Post) -> std::path::PathBuf {
    data_dir
        .join("posts")
        .join(StorageLayout::relative_post_dir(post.id, post.created_at))
}

fn log_lines(data_dir: &Path, level: &str) -> Vec<Value> {
    std::fs::read_to_string(data_dir.join("logs").join(format!("posts-{level}.log")))
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn created_post_reads_back_identically() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let created = store
        .create(new_post("Hello", "alice", &["intro"]), Some(&alice))
        .await
        .unwrap();
    assert_eq!(created.created_at, created.updated_at);

    assert_eq!(store.get(created.id).await.unwrap(), Some(created.clone()));

    // A second store has a cold cache and must read the same thing from disk
    let reopened = store_in(tmp.path()).await;
    assert_eq!(reopened.get(created.id).await.unwrap(), Some(created));
}

#[tokio::test]
async fn post_files_follow_the_date_layout() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let post = store
        .create(new_post("Layout", "alice", &[]), Some(&alice))
        .await
        .unwrap();

    let dir = post_dir(tmp.path(), &post);
    let metadata: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(METADATA_FILE)).unwrap()).unwrap();
    let content: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(CONTENT_FILE)).unwrap()).unwrap();

    assert_eq!(metadata["id"], post.id.to_string());
    assert_eq!(metadata["createdAt"], metadata["updatedAt"]);
    assert!(metadata.get("content").is_none());
    assert!(metadata.get("tags").is_none());
    assert_eq!(content, serde_json::json!({ "content": "Body of Layout" }));
    assert!(!dir.join(LOCK_FILE).exists());

    let index_file = tmp
        .path()
        .join("posts")
        .join("_index")
        .join(format!("{}.json", post.id));
    let entry: IndexEntry =
        serde_json::from_str(&std::fs::read_to_string(index_file).unwrap()).unwrap();
    assert_eq!(entry.metadata, post.metadata());
    assert_eq!(
        entry.path,
        StorageLayout::relative_post_dir(post.id, post.created_at)
    );
}

#[tokio::test]
async fn create_requires_acting_as_the_author() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let bob = User::new(2, "bob");

    let anonymous = store.create(new_post("T", "alice", &[]), None).await;
    assert!(matches!(
        anonymous,
        Err(PostError::Unauthorized(ref reason)) if reason == "Authentication required to create posts"
    ));

    let impostor = store.create(new_post("T", "alice", &[]), Some(&bob)).await;
    assert!(matches!(
        impostor,
        Err(PostError::Unauthorized(ref reason)) if reason == "You can only create posts as yourself"
    ));

    let page = store.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn other_users_cannot_modify_or_delete() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");
    let bob = User::new(2, "bob");

    let post = store
        .create(new_post("Alice's", "alice", &[]), Some(&alice))
        .await
        .unwrap();

    let patch = PostPatch {
        title: Some("Hijacked".into()),
        ..Default::default()
    };
    let denied = store.update(post.id, patch.clone(), Some(&bob)).await;
    assert!(matches!(
        denied,
        Err(PostError::Unauthorized(ref reason)) if reason == "You do not have permission to modify this post"
    ));

    let denied = store.delete(post.id, Some(&bob)).await;
    assert!(matches!(
        denied,
        Err(PostError::Unauthorized(ref reason)) if reason == "You do not have permission to delete this post"
    ));

    assert!(store.update(post.id, patch, None).await.unwrap_err().is_unauthorized());

    // Nothing changed, in memory or on disk
    assert_eq!(store.get(post.id).await.unwrap(), Some(post.clone()));
    assert_eq!(store_in(tmp.path()).await.get(post.id).await.unwrap(), Some(post));
}

#[tokio::test]
async fn staff_can_modify_and_delete_any_post() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");
    let staff = User::new(3, "youness");

    let post = store
        .create(new_post("Alice's", "alice", &[]), Some(&alice))
        .await
        .unwrap();

    let updated = store
        .update(
            post.id,
            PostPatch {
                status: Some(PostStatus::Draft),
                ..Default::default()
            },
            Some(&staff),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, PostStatus::Draft);
    assert_eq!(updated.author, "alice");

    assert!(store.delete(post.id, Some(&staff)).await.unwrap());
    assert_eq!(store.get(post.id).await.unwrap(), None);
}

#[tokio::test]
async fn update_keeps_identity_and_advances_updated_at() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let post = store
        .create(new_post("Draft", "alice", &["a"]), Some(&alice))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let updated = store
        .update(
            post.id,
            PostPatch {
                title: Some("Final".into()),
                tags: Some(vec!["a".into(), "b".into()]),
                ..Default::default()
            },
            Some(&alice),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.id, post.id);
    assert_eq!(updated.created_at, post.created_at);
    assert!(updated.updated_at > post.updated_at);
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.content, post.content);
    assert_eq!(store_in(tmp.path()).await.get(post.id).await.unwrap(), Some(updated));
}

#[tokio::test]
async fn content_only_update_is_visible_after_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let post = store
        .create(new_post("Notes", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let updated = store
        .update(
            post.id,
            PostPatch {
                content: Some("Rewritten".into()),
                ..Default::default()
            },
            Some(&alice),
        )
        .await
        .unwrap()
        .unwrap();

    let fresh = store_in(tmp.path()).await.get(post.id).await.unwrap().unwrap();
    assert_eq!(fresh.content, "Rewritten");
    assert_eq!(fresh.updated_at, updated.updated_at);
    assert!(fresh.updated_at > post.updated_at);
}

#[tokio::test]
async fn missing_posts_are_not_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");
    let missing = Uuid::new_v4();

    assert_eq!(store.get(missing).await.unwrap(), None);
    assert_eq!(
        store.update(missing, PostPatch::default(), Some(&alice)).await.unwrap(),
        None
    );
    assert!(!store.delete(missing, Some(&alice)).await.unwrap());
}

#[tokio::test]
async fn delete_removes_directory_and_index_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let post = store
        .create(new_post("Gone", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    let dir = post_dir(tmp.path(), &post);

    assert!(store.delete(post.id, Some(&alice)).await.unwrap());
    assert!(!dir.exists());
    assert_eq!(store.get(post.id).await.unwrap(), None);
    assert_eq!(store.list(&ListQuery::default()).await.unwrap().total, 0);
    assert!(!store.delete(post.id, Some(&alice)).await.unwrap());
}

#[tokio::test]
async fn tag_filter_requires_every_requested_tag() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let both = store
        .create(new_post("Both", "alice", &["rust", "async"]), Some(&alice))
        .await
        .unwrap();
    store
        .create(new_post("One", "alice", &["rust"]), Some(&alice))
        .await
        .unwrap();
    store
        .create(new_post("None", "alice", &[]), Some(&alice))
        .await
        .unwrap();

    let page = store
        .list(&ListQuery {
            tags: vec!["rust".into(), "async".into()],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.posts, vec![both]);
}

#[tokio::test]
async fn filters_combine() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");
    let bob = User::new(2, "bob");

    store
        .create(new_post("Rust tips", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    store
        .create(new_post("Rust news", "bob", &[]), Some(&bob))
        .await
        .unwrap();
    let mut draft = new_post("Rust draft", "alice", &[]);
    draft.status = PostStatus::Draft;
    store.create(draft, Some(&alice)).await.unwrap();

    let page = store
        .list(&ListQuery {
            status: Some(PostStatus::Published),
            author: Some("alice".into()),
            search: Some("rust".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.posts[0].title, "Rust tips");
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    for i in 0..25 {
        store
            .create(new_post(&format!("Post {i}"), "alice", &[]), Some(&alice))
            .await
            .unwrap();
    }

    let page = |page| ListQuery {
        page,
        limit: 10,
        ..Default::default()
    };

    let first = store.list(&page(1)).await.unwrap();
    assert_eq!(first.posts.len(), 10);
    assert!(
        first
            .posts
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );

    let second = store.list(&page(2)).await.unwrap();
    assert_eq!(second.posts.len(), 10);
    assert_eq!(second.total, 25);
    assert!(second.has_more);

    let third = store.list(&page(3)).await.unwrap();
    assert_eq!(third.posts.len(), 5);
    assert!(!third.has_more);

    let beyond = store.list(&page(4)).await.unwrap();
    assert!(beyond.posts.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn held_lock_marker_rejects_updates() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let post = store
        .create(new_post("Busy", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    std::fs::write(post_dir(tmp.path(), &post).join(LOCK_FILE), b"").unwrap();

    let patch = PostPatch {
        title: Some("Changed".into()),
        ..Default::default()
    };
    let result = store.update(post.id, patch.clone(), Some(&alice)).await;
    assert!(matches!(result, Err(PostError::Locked(id)) if id == post.id));
    assert_eq!(store.get(post.id).await.unwrap(), Some(post.clone()));

    // A marker older than the window is ignored
    let lenient = open_store(tmp.path(), |config| config.lock_stale_after = Duration::ZERO).await;
    let updated = lenient.update(post.id, patch, Some(&alice)).await.unwrap().unwrap();
    assert_eq!(updated.title, "Changed");
}

#[tokio::test]
async fn concurrent_updates_to_one_post_all_land() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(tmp.path()).await);
    let alice = User::new(1, "alice");

    let post = store
        .create(new_post("Shared", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    let id = post.id;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let alice = alice.clone();
            tokio::spawn(async move {
                store
                    .update(
                        id,
                        PostPatch {
                            title: Some(format!("Title {i}")),
                            ..Default::default()
                        },
                        Some(&alice),
                    )
                    .await
            })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_some());
    }

    let last = store.get(post.id).await.unwrap().unwrap();
    assert!(last.title.starts_with("Title "));
    assert!(!post_dir(tmp.path(), &post).join(LOCK_FILE).exists());
}

#[tokio::test]
async fn rebuild_index_restores_and_prunes_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let kept = store
        .create(new_post("Kept", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    store
        .create(new_post("Also kept", "alice", &[]), Some(&alice))
        .await
        .unwrap();

    let layout = StorageLayout::new(tmp.path().join("posts"));
    std::fs::remove_file(layout.index_file(kept.id)).unwrap();

    // An entry whose directory no longer exists
    let mut stale = kept.metadata();
    stale.id = Uuid::new_v4();
    write_json(
        &layout.index_file(stale.id),
        &IndexEntry {
            id: stale.id,
            path: StorageLayout::relative_post_dir(stale.id, stale.created_at),
            metadata: stale,
        },
    )
    .await
    .unwrap();

    // A post directory without metadata
    std::fs::create_dir_all(
        layout
            .posts_dir()
            .join(StorageLayout::relative_post_dir(Uuid::new_v4(), kept.created_at)),
    )
    .unwrap();

    let report = store.rebuild_index().await.unwrap();
    assert_eq!(report.indexed, 2);
    assert_eq!(report.removed, 1);
    assert_eq!(report.skipped, 1);

    let page = store.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 2);
    assert!(page.posts.contains(&kept));
    assert!(layout.index_file(kept.id).exists());

    let info = log_lines(tmp.path(), "info");
    assert!(info.iter().any(|line| line["message"] == "Rebuilt post index"));
}

#[tokio::test]
async fn scan_fallback_finds_unindexed_posts_when_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let alice = User::new(1, "alice");
    let post = store_in(tmp.path())
        .await
        .create(new_post("Orphan", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    std::fs::remove_file(StorageLayout::new(tmp.path().join("posts")).index_file(post.id)).unwrap();

    let strict = store_in(tmp.path()).await;
    assert_eq!(strict.get(post.id).await.unwrap(), None);

    let scanning = open_store(tmp.path(), |config| config.scan_fallback = true).await;
    assert_eq!(scanning.get(post.id).await.unwrap(), Some(post));
}

#[tokio::test]
async fn operations_are_recorded_in_the_activity_log() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(7, "alice");

    let post = store
        .create(new_post("Logged", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    store
        .update(
            post.id,
            PostPatch {
                title: Some("Logged again".into()),
                ..Default::default()
            },
            Some(&alice),
        )
        .await
        .unwrap();
    store.delete(post.id, Some(&alice)).await.unwrap();

    let info = log_lines(tmp.path(), "info");
    let messages: Vec<&str> = info
        .iter()
        .map(|line| line["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![
            format!("Created post {}", post.id),
            format!("Updated post {}", post.id),
            format!("Deleted post {}", post.id),
        ]
    );
    assert!(info.iter().all(|line| line["postId"] == post.id.to_string()));
    assert!(info.iter().all(|line| line["userId"] == 7));
}

#[tokio::test]
async fn unreadable_post_is_a_storage_error_and_logged() {
    let tmp = tempfile::tempdir().unwrap();
    let store = store_in(tmp.path()).await;
    let alice = User::new(1, "alice");

    let post = store
        .create(new_post("Broken", "alice", &[]), Some(&alice))
        .await
        .unwrap();
    std::fs::write(post_dir(tmp.path(), &post).join(CONTENT_FILE), "not json").unwrap();

    let reopened = store_in(tmp.path()).await;
    let err = reopened.get(post.id).await.unwrap_err();
    assert!(matches!(err, PostError::Storage { context: "Failed to read post", .. }));

    let errors = log_lines(tmp.path(), "error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["message"], "Error reading post");
    assert_eq!(errors[0]["postId"], post.id.to_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn listing_sees_posts_created_while_others_list() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(tmp.path()).await);
    let alice = User::new(1, "alice");

    for i in 0..40 {
        store
            .create(new_post(&format!("Seed {i}"), "alice", &[]), Some(&alice))
            .await
            .unwrap();
    }

    let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            tokio::spawn(async move {
                while !done.load(std::sync::atomic::Ordering::SeqCst) {
                    store.list(&ListQuery::default()).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for i in 0..40 {
        store
            .create(new_post(&format!("Late {i}"), "alice", &[]), Some(&alice))
            .await
            .unwrap();
    }
    done.store(true, std::sync::atomic::Ordering::SeqCst);
    for reader in readers {
        reader.await.unwrap();
    }

    assert_eq!(store.list(&ListQuery::default()).await.unwrap().total, 80);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_racing_an_update_do_not_bring_back_old_data() {
    let tmp = tempfile::tempdir().unwrap();
    let alice = User::new(1, "alice");
    let writer = store_in(tmp.path()).await;
    let mut ids = Vec::new();
    for i in 0..20 {
        let post = writer
            .create(new_post(&format!("old {i}"), "alice", &[]), Some(&alice))
            .await
            .unwrap();
        ids.push(post.id);
    }

    // Cold cache, so the reads below fill it while the update runs
    let store = Arc::new(store_in(tmp.path()).await);
    for &id in &ids {
        let mut tasks = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.get(id).await.unwrap();
            }));
        }
        let updater = {
            let store = store.clone();
            let alice = alice.clone();
            tokio::spawn(async move {
                store
                    .update(
                        id,
                        PostPatch {
                            title: Some("new".into()),
                            ..Default::default()
                        },
                        Some(&alice),
                    )
                    .await
                    .unwrap()
                    .unwrap();
            })
        };
        for task in tasks {
            task.await.unwrap();
        }
        updater.await.unwrap();

        assert_eq!(store.get(id).await.unwrap().unwrap().title, "new");

        // A content-only update must not put the old title back in the index
        store
            .update(
                id,
                PostPatch {
                    content: Some("changed".into()),
                    ..Default::default()
                },
                Some(&alice),
            )
            .await
            .unwrap()
            .unwrap();
        let entry: IndexEntry = serde_json::from_str(
            &std::fs::read_to_string(
                StorageLayout::new(tmp.path().join("posts")).index_file(id),
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(entry.metadata.title, "new");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rebuild_during_updates_keeps_the_latest_updated_at() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(tmp.path()).await);
    let alice = User::new(1, "alice");

    let mut ids = Vec::new();
    for i in 0..20 {
        let post = store
            .create(new_post(&format!("Post {i}"), "alice", &[]), Some(&alice))
            .await
            .unwrap();
        ids.push(post.id);
    }
    tokio::time::sleep(Duration::from_millis(5)).await;

    let rebuild = {
        let store = store.clone();
        tokio::spawn(async move { store.rebuild_index().await.unwrap() })
    };
    let mut updated = Vec::new();
    for &id in &ids {
        let post = store
            .update(
                id,
                PostPatch {
                    content: Some("edited".into()),
                    ..Default::default()
                },
                Some(&alice),
            )
            .await
            .unwrap()
            .unwrap();
        updated.push(post);
    }
    assert_eq!(rebuild.await.unwrap().indexed, 20);

    let layout = StorageLayout::new(tmp.path().join("posts"));
    for post in updated {
        let entry: IndexEntry =
            serde_json::from_str(&std::fs::read_to_string(layout.index_file(post.id)).unwrap())
                .unwrap();
        assert_eq!(entry.metadata.updated_at, post.updated_at);
    }
}
