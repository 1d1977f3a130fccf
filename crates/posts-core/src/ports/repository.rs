use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ListQuery, NewPost, Post, PostPage, PostPatch, User};
use crate::error::PostError;

/// Post repository - create, read, update, delete and list posts.
///
/// Mutations take the acting user and enforce [`crate::policy`]. A missing
/// post is reported as `Ok(None)` / `Ok(false)`, never as an error.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a post authored by `user`.
    async fn create(&self, post: NewPost, user: Option<&User>) -> Result<Post, PostError>;

    /// Find a post by its id.
    async fn get(&self, id: Uuid) -> Result<Option<Post>, PostError>;

    /// Apply a partial update.
    async fn update(
        &self,
        id: Uuid,
        patch: PostPatch,
        user: Option<&User>,
    ) -> Result<Option<Post>, PostError>;

    /// Delete a post. Returns `false` if there was nothing to delete.
    async fn delete(&self, id: Uuid, user: Option<&User>) -> Result<bool, PostError>;

    /// List posts matching `query`, one page at a time.
    async fn list(&self, query: &ListQuery) -> Result<PostPage, PostError>;
}
