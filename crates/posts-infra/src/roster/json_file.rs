//! Roster backed by a JSON array of user records.

use std::path::PathBuf;

use async_trait::async_trait;

use posts_core::RepoError;
use posts_core::domain::RosterUser;
use posts_core::ports::UserRoster;

use crate::storage::files::read_json;

/// Reads the roster file on every lookup, so edits take effect immediately.
///
/// Records may carry any other keys; only `login` and `staff?` / `staff`
/// are read.
pub struct JsonFileRoster {
    path: PathBuf,
}

impl JsonFileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UserRoster for JsonFileRoster {
    async fn find_by_login(&self, login: &str) -> Result<Option<RosterUser>, RepoError> {
        let users: Vec<RosterUser> = read_json(&self.path).await?;
        Ok(users.into_iter().find(|user| user.login == login))
    }
}
