//! Activity log port - the append-only audit trail of store operations.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Severity of an activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Error,
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Info => "info",
            ActivityLevel::Error => "error",
        }
    }
}

/// One activity line: a message plus arbitrary structured fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub level: ActivityLevel,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl ActivityRecord {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ActivityLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ActivityLevel::Error, message)
    }

    fn new(level: ActivityLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Attach a structured field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

/// Activity log trait.
///
/// Recording is best-effort: implementations swallow their own failures so
/// that logging can never change the outcome of the operation being logged.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, record: ActivityRecord);
}
