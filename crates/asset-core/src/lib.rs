//! Asset Core - cache-aside lookups over an asset database.
//!
//! This crate finds asset descriptions and fetches detailed asset records from
//! a backing [`AssetDatabase`], caching results in a local SQLite file for a
//! short TTL. It can be used programmatically without any HTTP layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use asset_core::{AssetService, CacheConfig, CatalogDb};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> asset_core::Result<()> {
//!     let db = Arc::new(CatalogDb::from_file("catalog.json"));
//!     let service = AssetService::with_cache_config(db, CacheConfig::default()).await?;
//!
//!     let chairs = service.matches("props", "chair", "", 0).await?;
//!     println!("Found {} chairs", chairs.len());
//!
//!     let oak = service.asset_data("props", "chair", "oak").await?;
//!     println!("oak chair is at version {}", oak.version);
//!
//!     service.close().await
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

mod service;

// Re-export commonly used types
pub use backend::{AssetDatabase, CatalogDb, DynAssetDatabase};
pub use cache::{
    AssetCache, CacheKey, CachedResult, Clock, ExpiringStore, ManualClock, RecordCache,
    SystemClock,
};
pub use config::{CacheConfig, PathsConfig, QueryConfig};
pub use error::{AssetError, Result};
pub use models::{AssetData, AssetDescription, ResourceDescription};
pub use service::AssetService;
