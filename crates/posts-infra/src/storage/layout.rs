//! On-disk layout: where posts, their files and the index live.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use tokio::fs;
use uuid::Uuid;

use posts_core::RepoError;

pub(crate) const INDEX_DIR: &str = "_index";
pub(crate) const METADATA_FILE: &str = "metadata.json";
pub(crate) const CONTENT_FILE: &str = "content.json";
pub(crate) const LOCK_FILE: &str = ".lock";

/// Paths of a post store rooted at `posts_dir`.
#[derive(Debug, Clone)]
pub(crate) struct StorageLayout {
    posts_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(posts_dir: impl Into<PathBuf>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
        }
    }

    pub fn posts_dir(&self) -> &Path {
        &self.posts_dir
    }

    pub fn index_dir(&self) -> PathBuf {
        self.posts_dir.join(INDEX_DIR)
    }

    pub fn index_file(&self, id: Uuid) -> PathBuf {
        self.index_dir().join(format!("{id}.json"))
    }

    /// Directory of a post relative to the posts root: `yyyy/mm/dd/{id}`.
    pub fn relative_post_dir(id: Uuid, created: DateTime<Utc>) -> PathBuf {
        PathBuf::from(format!("{:04}", created.year()))
            .join(format!("{:02}", created.month()))
            .join(format!("{:02}", created.day()))
            .join(id.to_string())
    }

    /// Absolute location of a stored path. Absolute paths are taken as-is.
    pub fn resolve(&self, stored: &Path) -> PathBuf {
        if stored.is_absolute() {
            stored.to_path_buf()
        } else {
            self.posts_dir.join(stored)
        }
    }

    /// Walk every `yyyy/mm/dd/{id}` directory under the posts root.
    ///
    /// Returns post ids with their relative directories. Entries whose name is
    /// not a UUID are ignored, as is the index directory.
    pub async fn scan(&self) -> Result<Vec<(Uuid, PathBuf)>, RepoError> {
        let mut found = Vec::new();

        for (year, year_dir) in subdirs(&self.posts_dir).await? {
            if year == INDEX_DIR {
                continue;
            }
            for (month, month_dir) in subdirs(&year_dir).await? {
                for (day, day_dir) in subdirs(&month_dir).await? {
                    for (name, _) in subdirs(&day_dir).await? {
                        let Ok(id) = Uuid::parse_str(&name) else {
                            continue;
                        };
                        let relative = PathBuf::from(&year).join(&month).join(&day).join(&name);
                        found.push((id, relative));
                    }
                }
            }
        }

        Ok(found)
    }

    /// Look for one post's directory by walking the date buckets.
    pub async fn find(&self, id: Uuid) -> Result<Option<PathBuf>, RepoError> {
        let name = id.to_string();

        for (year, year_dir) in subdirs(&self.posts_dir).await? {
            if year == INDEX_DIR {
                continue;
            }
            for (month, month_dir) in subdirs(&year_dir).await? {
                for (day, day_dir) in subdirs(&month_dir).await? {
                    if is_dir(&day_dir.join(&name)).await {
                        return Ok(Some(
                            PathBuf::from(&year).join(&month).join(&day).join(&name),
                        ));
                    }
                }
            }
        }

        Ok(None)
    }
}

/// Child directories of `dir` as `(name, path)`. A missing `dir` has none.
async fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, RepoError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RepoError::io(dir, e)),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RepoError::io(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| RepoError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            dirs.push((name.to_string(), entry.path()));
        }
    }
    dirs.sort();

    Ok(dirs)
}

pub(crate) async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}
