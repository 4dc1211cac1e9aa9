//! Centralized configuration for the asset lookup service.
//!
//! Query and path constants live on unit structs; the cache has a small
//! runtime configuration with defaults for the temp directory and a 15 second TTL.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Query shape configuration.
pub struct QueryConfig;

impl QueryConfig {
    /// Number of match results per page.
    pub const PAGE_SIZE: usize = 100;
}

/// Shared directory and file names.
pub struct PathsConfig;

impl PathsConfig {
    pub const CACHE_DIR_NAME: &'static str = "asset_viewer_cache";
    pub const CACHE_FILE_NAME: &'static str = "asset_cache.sqlite3";
}

/// Configuration for the expiring cache store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Folder holding the cache database file.
    pub root_folder: PathBuf,
    /// How long a cached query result stays valid.
    pub ttl: Duration,
}

impl CacheConfig {
    /// Default time-to-live for cache entries (15 seconds).
    pub const DEFAULT_TTL_SECS: u64 = 15;

    /// Use a different folder for the cache database.
    pub fn with_root_folder(mut self, root_folder: impl Into<PathBuf>) -> Self {
        self.root_folder = root_folder.into();
        self
    }

    /// Use a different entry lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Full path of the cache database file.
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(PathsConfig::CACHE_FILE_NAME)
    }

    /// Root folder used when none is configured.
    pub fn default_root_folder() -> PathBuf {
        std::env::temp_dir().join(PathsConfig::CACHE_DIR_NAME)
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_folder: Self::default_root_folder(),
            ttl: Duration::from_secs(Self::DEFAULT_TTL_SECS),
        }
    }
}
