//! [`AssetCache`] over the expiring SQLite store, with JSON payloads.

use super::clock::{Clock, SystemClock};
use super::key::CacheKey;
use super::store::ExpiringStore;
use super::traits::{AssetCache, CachedResult};
use crate::config::CacheConfig;
use crate::error::{AssetError, Result};
use crate::models::{AssetData, AssetDescription};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Asset cache persisted in a single SQLite file.
///
/// Created unconnected; [`AssetCache::connect`] opens the file.
pub struct RecordCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    store: RwLock<Option<Arc<ExpiringStore>>>,
}

impl RecordCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Using cache at {} (TTL {:?})",
            config.root_folder.display(),
            config.ttl
        );
        Self {
            config,
            clock,
            store: RwLock::new(None),
        }
    }

    /// The connected store, if any.
    pub fn store(&self) -> Option<Arc<ExpiringStore>> {
        self.store.read().ok().and_then(|guard| guard.clone())
    }

    fn connected(&self) -> Result<Arc<ExpiringStore>> {
        self.store().ok_or_else(|| AssetError::Storage {
            message: "Cache is not connected".to_string(),
            source: None,
        })
    }

    fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        let key = key.to_string();
        let raw = match self.connected()?.get(&key)? {
            Some(raw) => raw,
            None => {
                debug!("Cache miss for {}", key);
                return Ok(None);
            }
        };

        let value = serde_json::from_slice(&raw).map_err(|e| AssetError::Deserialization {
            message: format!("Cached value for {} is unreadable: {}", key, e),
            source: Some(e),
        })?;
        debug!("Cache hit for {}", key);
        Ok(Some(value))
    }
}

impl AssetCache for RecordCache {
    fn connect(&self) -> Result<()> {
        let mut guard = self.store.write().map_err(|e| AssetError::Storage {
            message: format!("Failed to lock cache: {}", e),
            source: None,
        })?;
        if guard.is_none() {
            let store = ExpiringStore::open_with_clock(
                self.config.database_path(),
                Arc::clone(&self.clock),
            )?;
            *guard = Some(Arc::new(store));
        }
        Ok(())
    }

    fn matches(&self, key: &CacheKey) -> Result<Option<Vec<AssetDescription>>> {
        self.lookup(key)
    }

    fn asset_data(&self, key: &CacheKey) -> Result<Option<AssetData>> {
        self.lookup(key)
    }

    fn cache(&self, key: &CacheKey, value: CachedResult<'_>) -> Result<()> {
        if key.shape() != value.shape() {
            return Err(AssetError::Storage {
                message: format!("Key {} cannot hold a {} result", key, value.shape()),
                source: None,
            });
        }

        let raw = serde_json::to_vec(&value)?;
        self.connected()?.put(&key.to_string(), &raw, self.config.ttl)
    }

    fn close(&self) -> Result<()> {
        match self.store() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }
}
