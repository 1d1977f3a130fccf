//! Domain entities - the core business objects.

mod post;
mod query;
pub mod timestamp;
mod user;

pub use post::{
    IndexEntry, NewPost, PatchOutcome, Post, PostContent, PostMetadata, PostPatch, PostStatus,
};
pub use query::{ListQuery, PostPage};
pub use user::{RosterUser, User};
