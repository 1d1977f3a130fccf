//! Activity log implementations.

mod file;

pub use file::FileActivityLog;
