//! File-backed post storage.
//!
//! Each post is a directory `{yyyy}/{mm}/{dd}/{id}` holding `metadata.json`
//! and `content.json`, so listing and filtering never read post bodies. An
//! `_index` directory holds one `{id}.json` per post pointing at its
//! directory with a copy of its metadata.
//!
//! The index is derived data: [`FilePostStore::rebuild_index`] regenerates it
//! from the post directories.

mod config;
pub(crate) mod files;
mod index;
mod layout;
mod lock;
mod store;

pub use config::StoreConfig;
pub use store::{FilePostStore, IndexRebuildReport};

#[cfg(test)]
mod tests;
