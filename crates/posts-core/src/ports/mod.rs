//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod activity;
mod cache;
mod repository;
mod roster;

pub use activity::{ActivityLevel, ActivityLog, ActivityRecord};
pub use cache::{Cache, CacheError};
pub use repository::PostRepository;
pub use roster::UserRoster;
