use async_trait::async_trait;

use crate::domain::RosterUser;
use crate::error::RepoError;

/// User roster - the external source of staff privileges.
#[async_trait]
pub trait UserRoster: Send + Sync {
    /// Find a roster entry by login.
    async fn find_by_login(&self, login: &str) -> Result<Option<RosterUser>, RepoError>;
}
