//! Backing asset database abstraction.
//!
//! The service only talks to an [`AssetDatabase`]; the catalog implementation
//! here serves records from memory or a JSON file.

mod catalog;

pub use catalog::CatalogDb;

use crate::error::Result;
use crate::models::{AssetData, AssetDescription};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of truth for asset descriptions and detail records.
///
/// Implementations must tolerate concurrent calls.
#[async_trait]
pub trait AssetDatabase: Send + Sync {
    /// Connect to the database.
    async fn connect(&self) -> Result<()>;

    /// An initial list of search suggestions (collection names).
    async fn suggest_initial(&self) -> Result<Vec<String>>;

    /// Descriptions loosely matching `query` (empty fields match anything).
    ///
    /// Results are paged by [`crate::config::QueryConfig::PAGE_SIZE`].
    async fn matches(&self, query: &AssetDescription, page: u32) -> Result<Vec<AssetDescription>>;

    /// Detailed data for the single asset described by `query`.
    ///
    /// # Errors
    ///
    /// Returns `AssetError::InvalidQuery` if name, class or subclass is empty.
    async fn asset_data(&self, query: &AssetDescription) -> Result<AssetData>;

    /// Close connection(s).
    async fn close(&self) -> Result<()>;
}

/// Shared handle to any database implementation.
pub type DynAssetDatabase = Arc<dyn AssetDatabase>;
