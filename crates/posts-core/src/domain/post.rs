use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp::iso_millis;

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status '{other}'")),
        }
    }
}

/// Post entity - a blog-style article shared on the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Everything about a post except its body, stored apart from the content
/// so listing never has to read post bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Body of a post, as persisted in `content.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostContent {
    pub content: String,
}

/// One index record: where a post lives and a copy of its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub path: PathBuf,
    pub metadata: PostMetadata,
}

/// Input for creating a post. Identity and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author: String,
    pub status: PostStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub status: Option<PostStatus>,
    pub tags: Option<Vec<String>>,
}

/// Result of applying a [`PostPatch`]: the merged post and which of the two
/// persisted halves actually changed.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub post: Post,
    pub metadata_changed: bool,
    pub content_changed: bool,
}

impl Post {
    /// Build a freshly created post.
    pub fn create(new: NewPost, id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            content: new.content,
            author: new.author,
            created_at: now,
            updated_at: now,
            status: new.status,
            tags: new.tags,
        }
    }

    /// Reassemble a post from its two persisted halves.
    pub fn from_parts(metadata: PostMetadata, content: PostContent) -> Self {
        Self {
            id: metadata.id,
            title: metadata.title,
            content: content.content,
            author: metadata.author,
            created_at: metadata.created_at,
            updated_at: metadata.updated_at,
            status: metadata.status,
            tags: metadata.tags,
        }
    }

    pub fn metadata(&self) -> PostMetadata {
        PostMetadata {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            status: self.status,
            tags: self.tags.clone(),
        }
    }

    pub fn body(&self) -> PostContent {
        PostContent {
            content: self.content.clone(),
        }
    }

    /// Merge `patch` onto this post.
    ///
    /// `id` and `created_at` never change. `updated_at` becomes `now`, or
    /// stays put if the clock went backwards.
    pub fn apply(&self, patch: PostPatch, now: DateTime<Utc>) -> PatchOutcome {
        let mut post = self.clone();

        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(author) = patch.author {
            post.author = author;
        }
        if let Some(status) = patch.status {
            post.status = status;
        }
        if let Some(tags) = patch.tags {
            // An empty list clears the tags
            post.tags = (!tags.is_empty()).then_some(tags);
        }
        if let Some(content) = patch.content {
            post.content = content;
        }
        post.updated_at = now.max(self.updated_at);

        let metadata_changed = post.title != self.title
            || post.author != self.author
            || post.status != self.status
            || post.tags != self.tags;
        let content_changed = post.content != self.content;

        PatchOutcome {
            post,
            metadata_changed,
            content_changed,
        }
    }
}
