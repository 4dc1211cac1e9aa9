//! Cache-aside asset lookups.
//!
//! [`AssetService`] pairs an [`AssetDatabase`] with an [`AssetCache`]. Every
//! lookup tries the cache first, falls back to the database on a miss and
//! writes the database result back. The cache is only an accelerator: its
//! failures are logged and treated as misses, while database failures are
//! returned to the caller.

use crate::backend::DynAssetDatabase;
use crate::cache::{AssetCache, CacheKey, CachedResult, RecordCache};
use crate::config::CacheConfig;
use crate::error::{AssetError, Result};
use crate::models::{AssetData, AssetDescription};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entry point for finding, fetching and caching asset information.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct AssetService {
    db: DynAssetDatabase,
    cache: Arc<dyn AssetCache>,
}

impl AssetService {
    /// Connect `db` and `cache` and combine them.
    ///
    /// Fails if either cannot be connected; nothing is left open in that case.
    pub async fn new(db: DynAssetDatabase, cache: Arc<dyn AssetCache>) -> Result<Self> {
        db.connect().await?;

        let connecting = Arc::clone(&cache);
        let connected = tokio::task::spawn_blocking(move || connecting.connect())
            .await
            .map_err(|e| AssetError::StorageUnavailable {
                message: format!("Cache connect task failed: {}", e),
                path: None,
                source: None,
            })
            .and_then(|r| r);
        if let Err(e) = connected {
            if let Err(close_err) = db.close().await {
                warn!("Failed to close asset database: {}", close_err);
            }
            return Err(e);
        }

        info!("Asset service ready");
        Ok(Self { db, cache })
    }

    /// Connect `db` and a SQLite cache built from `config`.
    pub async fn with_cache_config(db: DynAssetDatabase, config: CacheConfig) -> Result<Self> {
        Self::new(db, Arc::new(RecordCache::new(config))).await
    }

    /// Initial search suggestions, always fresh from the database.
    pub async fn suggest_initial(&self) -> Result<Vec<String>> {
        self.db.suggest_initial().await
    }

    /// Assets loosely matching the given fields, one page at a time.
    ///
    /// Results are cached for the configured TTL.
    pub async fn matches(
        &self,
        name: &str,
        class: &str,
        subclass: &str,
        page: u32,
    ) -> Result<Vec<AssetDescription>> {
        let key = CacheKey::matches(page, name, class, subclass);

        let lookup_key = key.clone();
        match self
            .with_cache(move |cache| cache.matches(&lookup_key))
            .await
        {
            Ok(Some(cached)) => {
                debug!("Serving {} from cache", key);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Unable to read from cache: {}", e),
        }

        let query = AssetDescription::query(name, class, subclass);
        let results = self.db.matches(&query, page).await?;

        let value = results.clone();
        if let Err(e) = self
            .with_cache(move |cache| cache.cache(&key, CachedResult::Matches(&value)))
            .await
        {
            warn!("Unable to write to cache: {}", e);
        }

        Ok(results)
    }

    /// Detailed data for the single asset with the given fields.
    ///
    /// Results are cached for the configured TTL.
    pub async fn asset_data(&self, name: &str, class: &str, subclass: &str) -> Result<AssetData> {
        let key = CacheKey::fetch(name, class, subclass);

        let lookup_key = key.clone();
        match self
            .with_cache(move |cache| cache.asset_data(&lookup_key))
            .await
        {
            Ok(Some(cached)) => {
                debug!("Serving {} from cache", key);
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Unable to read from cache: {}", e),
        }

        let query = AssetDescription::query(name, class, subclass);
        let data = self.db.asset_data(&query).await?;

        let value = data.clone();
        if let Err(e) = self
            .with_cache(move |cache| cache.cache(&key, CachedResult::AssetData(&value)))
            .await
        {
            warn!("Unable to write to cache: {}", e);
        }

        Ok(data)
    }

    /// Close the database and the cache.
    ///
    /// Both are always attempted; the first failure is returned.
    pub async fn close(&self) -> Result<()> {
        let db_result = self.db.close().await;
        if let Err(e) = &db_result {
            warn!("Failed to close asset database: {}", e);
        }

        let cache = Arc::clone(&self.cache);
        let cache_result = tokio::task::spawn_blocking(move || cache.close())
            .await
            .map_err(|e| AssetError::Storage {
                message: format!("Cache close task failed: {}", e),
                source: None,
            })
            .and_then(|r| r);
        if let Err(e) = &cache_result {
            warn!("Failed to close cache: {}", e);
        }

        info!("Asset service closed");
        db_result.and(cache_result)
    }

    /// Run a cache operation on the blocking pool; SQLite I/O must not stall
    /// the async workers.
    async fn with_cache<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn AssetCache) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || op(cache.as_ref()))
            .await
            .map_err(|e| AssetError::Storage {
                message: format!("Cache task failed: {}", e),
                source: None,
            })?
    }
}
