use serde::{Deserialize, Serialize};

/// The user performing an operation.
///
/// Carries no privilege of its own: staff rights are always looked up in the
/// user roster by `login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
}

impl User {
    pub fn new(id: u64, login: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
        }
    }
}

/// An entry of the external user roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterUser {
    pub login: String,
    #[serde(rename = "staff?", alias = "staff", default)]
    pub staff: bool,
}
