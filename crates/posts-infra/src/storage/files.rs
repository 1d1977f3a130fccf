//! JSON file helpers.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use uuid::Uuid;

use posts_core::RepoError;

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, RepoError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|e| RepoError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| RepoError::serialization(path, e))
}

/// Write `value` as pretty JSON through a temp file and rename, so readers
/// never observe a half-written file.
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RepoError> {
    let content = serde_json::to_string_pretty(value).map_err(|e| RepoError::serialization(path, e))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file");
    let tmp_path = path.with_file_name(format!(".{file_name}-{}.tmp", Uuid::new_v4()));

    fs::write(&tmp_path, content)
        .await
        .map_err(|e| RepoError::io(&tmp_path, e))?;

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(RepoError::io(path, e));
    }

    Ok(())
}
