//! Activity log written as newline-delimited JSON, one file per level.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use posts_core::domain::timestamp;
use posts_core::ports::{ActivityLevel, ActivityLog, ActivityRecord};

#[derive(Serialize)]
struct Line<'a> {
    timestamp: String,
    level: ActivityLevel,
    message: &'a str,
    #[serde(flatten)]
    fields: &'a Map<String, Value>,
}

/// Appends records to `{dir}/{prefix}-{level}.log` and mirrors them as
/// tracing events.
///
/// Write failures are reported through tracing and otherwise ignored.
pub struct FileActivityLog {
    dir: PathBuf,
    prefix: String,
    write_lock: Mutex<()>,
}

impl FileActivityLog {
    /// Log files named `posts-info.log` / `posts-error.log` under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_prefix(dir, "posts")
    }

    pub fn with_prefix(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn file_for(&self, level: ActivityLevel) -> PathBuf {
        self.dir
            .join(format!("{}-{}.log", self.prefix, level.as_str()))
    }

    async fn append(&self, path: &Path, line: &str) -> std::io::Result<()> {
        let _serialized = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl ActivityLog for FileActivityLog {
    async fn record(&self, record: ActivityRecord) {
        let fields = Value::Object(record.fields.clone());
        match record.level {
            ActivityLevel::Info => tracing::info!(%fields, "{}", record.message),
            ActivityLevel::Error => tracing::error!(%fields, "{}", record.message),
        }

        let line = Line {
            timestamp: timestamp::format(&timestamp::now()),
            level: record.level,
            message: &record.message,
            fields: &record.fields,
        };
        let mut rendered = match serde_json::to_string(&line) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode activity record");
                return;
            }
        };
        rendered.push('\n');

        let path = self.file_for(record.level);
        if let Err(e) = self.append(&path, &rendered).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write activity log");
        }
    }
}
