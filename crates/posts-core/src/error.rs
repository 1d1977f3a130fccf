//! Domain-level error types.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Post store errors.
///
/// A missing post is not an error: lookups return `Ok(None)` and deletes
/// return `Ok(false)`, so callers can tell "not found" from "denied" from
/// "failed".
#[derive(Debug, Error)]
pub enum PostError {
    #[error("Authorization failed: {0}")]
    Unauthorized(String),

    #[error("Post {0} is locked for editing")]
    Locked(Uuid),

    #[error("{context}")]
    Storage {
        context: &'static str,
        #[source]
        source: RepoError,
    },
}

impl PostError {
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized(reason.into())
    }

    pub fn storage(context: &'static str, source: RepoError) -> Self {
        Self::Storage { context, source }
    }

    /// Whether this error is a permission denial rather than a failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Storage-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("I/O failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("User roster lookup failed: {0}")]
    Roster(String),
}

impl RepoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }
}
