//! # Posts Shared
//!
//! Wire types shared by every front end of the post store: request bodies
//! and the response envelopes written by `posts-admin`.

pub mod dto;
pub mod response;

pub use dto::{CreatePostRequest, UpdatePostRequest};
pub use response::{ApiResponse, ErrorResponse};
