//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use posts_infra::StoreConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from environment variables. A `--data-dir` given on
    /// the command line wins over `POSTS_DATA_DIR`.
    pub fn from_env(data_dir: Option<PathBuf>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), data_dir)
    }

    pub fn from_lookup<F>(lookup: F, data_dir: Option<PathBuf>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut store = StoreConfig::from_lookup(lookup);
        if let Some(dir) = data_dir {
            store.data_dir = dir;
        }
        Self { store }
    }
}
