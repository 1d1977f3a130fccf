use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cache trait - abstraction over caching backends.
///
/// Values are opaque strings; the JSON helpers on `dyn Cache` layer encoding
/// on top.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value from the cache. Expired entries read as absent.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value in the cache with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>);

    /// Delete a key from the cache.
    async fn delete(&self, key: &str);
}

impl dyn Cache {
    /// Get and decode a JSON value.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(CacheError::Serialization),
            None => Ok(None),
        }
    }

    /// Encode and store a JSON value.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(CacheError::Serialization)?;
        self.set(key, &raw, ttl).await;
        Ok(())
    }
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}
