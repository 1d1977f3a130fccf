//! # Posts Infrastructure
//!
//! Concrete implementations of the ports defined in `posts-core`:
//!
//! - [`storage::FilePostStore`] - the post store, one directory per post
//!   bucketed by creation date, plus a per-post index for listing.
//! - [`cache::InMemoryCache`] - TTL cache backing post reads.
//! - [`roster::JsonFileRoster`] / [`roster::InMemoryRoster`] - staff lookup.
//! - [`activity::FileActivityLog`] - newline-delimited JSON activity logs.
//!
//! ## Storage Layout
//!
//! ```text
//! data/
//! ├── posts/
//! │   ├── _index/{id}.json          # {id, path, metadata}
//! │   └── {yyyy}/{mm}/{dd}/{id}/
//! │       ├── metadata.json         # everything but the body
//! │       ├── content.json          # {content}
//! │       └── .lock                 # present while a write is in flight
//! └── logs/
//!     ├── posts-info.log
//!     └── posts-error.log
//! ```

pub mod activity;
pub mod cache;
pub mod roster;
pub mod storage;

// Re-exports
pub use activity::FileActivityLog;
pub use cache::InMemoryCache;
pub use roster::{InMemoryRoster, JsonFileRoster};
pub use storage::{FilePostStore, IndexRebuildReport, StoreConfig};
