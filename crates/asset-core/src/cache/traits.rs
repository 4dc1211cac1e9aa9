//! Cache trait and the values it can hold.

use super::key::CacheKey;
use crate::error::Result;
use crate::models::{AssetData, AssetDescription};
use serde::Serialize;

/// A query result that may be written to the cache.
///
/// Only the two query shapes are representable, so nothing else can end up
/// under a cache key.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum CachedResult<'a> {
    Matches(&'a [AssetDescription]),
    AssetData(&'a AssetData),
}

impl CachedResult<'_> {
    /// Query shape this result belongs to, as used in [`CacheKey::shape`].
    pub fn shape(&self) -> &'static str {
        match self {
            CachedResult::Matches(_) => "match",
            CachedResult::AssetData(_) => "fetch",
        }
    }
}

/// Typed cache for asset query results.
///
/// Reads return `Ok(None)` on a miss, so an empty cached list is still a hit.
/// All operations are synchronous to match rusqlite's API.
pub trait AssetCache: Send + Sync {
    /// Open the underlying storage.
    fn connect(&self) -> Result<()>;

    /// Cached match results for `key`.
    fn matches(&self, key: &CacheKey) -> Result<Option<Vec<AssetDescription>>>;

    /// Cached detail record for `key`.
    fn asset_data(&self, key: &CacheKey) -> Result<Option<AssetData>>;

    /// Store `value` under `key` for the configured TTL.
    fn cache(&self, key: &CacheKey, value: CachedResult<'_>) -> Result<()>;

    /// Release the underlying storage.
    fn close(&self) -> Result<()>;
}
