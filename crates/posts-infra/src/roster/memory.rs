//! In-memory roster - used in tests and when no roster file is configured.

use std::collections::HashMap;

use async_trait::async_trait;

use posts_core::RepoError;
use posts_core::domain::RosterUser;
use posts_core::ports::UserRoster;

#[derive(Debug, Default)]
pub struct InMemoryRoster {
    users: HashMap<String, RosterUser>,
}

impl InMemoryRoster {
    pub fn new(users: impl IntoIterator<Item = RosterUser>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.login.clone(), user))
                .collect(),
        }
    }

    /// A roster where every given login is staff.
    pub fn with_staff<'a>(logins: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(logins.into_iter().map(|login| RosterUser {
            login: login.to_string(),
            staff: true,
        }))
    }
}

#[async_trait]
impl UserRoster for InMemoryRoster {
    async fn find_by_login(&self, login: &str) -> Result<Option<RosterUser>, RepoError> {
        Ok(self.users.get(login).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_by_login() {
        let roster = InMemoryRoster::with_staff(["youness"]);

        assert!(roster.find_by_login("youness").await.unwrap().unwrap().staff);
        assert!(roster.find_by_login("terabat").await.unwrap().is_none());
        assert!(InMemoryRoster::default().find_by_login("youness").await.unwrap().is_none());
    }
}
