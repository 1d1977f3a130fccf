//! Store configuration loaded from environment variables.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 5 * 60;

/// Configuration for [`super::FilePostStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root of the data directory; posts and logs live underneath.
    pub data_dir: PathBuf,
    /// How long a read post and the loaded index stay cached.
    pub cache_ttl: Duration,
    /// A `.lock` marker younger than this counts as held.
    pub lock_stale_after: Duration,
    /// Scan the date buckets when the index has no usable entry for a post.
    pub scan_fallback: bool,
    /// JSON user roster used for staff lookups.
    pub roster_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cache_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            lock_stale_after: Duration::from_secs(DEFAULT_TTL_SECS),
            scan_fallback: false,
            roster_path: PathBuf::from("public").join("data.json"),
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset variables take their default; unparsable ones are reported and
    /// also fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            data_dir: lookup("POSTS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cache_ttl: parse_or(&lookup, "POSTS_CACHE_TTL_SECS", DEFAULT_TTL_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            lock_stale_after: parse_or(&lookup, "POSTS_LOCK_STALE_SECS", DEFAULT_TTL_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_stale_after),
            scan_fallback: lookup("POSTS_SCAN_FALLBACK")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.scan_fallback),
            roster_path: lookup("POSTS_ROSTER_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.roster_path),
        }
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.data_dir.join("posts")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return Some(default);
    };

    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, default = %default, "Invalid value, using default");
            None
        }
    }
}
