//! User roster implementations.

mod json_file;
mod memory;

pub use json_file::JsonFileRoster;
pub use memory::InMemoryRoster;
