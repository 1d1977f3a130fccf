//! Application state - the post store and its collaborators.

use std::sync::Arc;

use anyhow::Context;

use posts_core::ports::{ActivityLog, Cache, UserRoster};
use posts_infra::{FileActivityLog, FilePostStore, InMemoryCache, InMemoryRoster, JsonFileRoster};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FilePostStore>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let store_config = config.store.clone();

        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());

        let roster: Arc<dyn UserRoster> = if store_config.roster_path.is_file() {
            tracing::debug!(path = %store_config.roster_path.display(), "Using roster file");
            Arc::new(JsonFileRoster::new(&store_config.roster_path))
        } else {
            tracing::warn!(
                path = %store_config.roster_path.display(),
                "Roster file not found. Nobody is treated as staff."
            );
            Arc::new(InMemoryRoster::default())
        };

        let activity: Arc<dyn ActivityLog> = Arc::new(FileActivityLog::new(store_config.logs_dir()));

        let data_dir = store_config.data_dir.clone();
        let store = FilePostStore::open(store_config, cache, roster, activity)
            .await
            .with_context(|| format!("Failed to open post store at {}", data_dir.display()))?;

        Ok(Self {
            store: Arc::new(store),
        })
    }
}
