//! In-memory asset catalog.
//!
//! The catalog is a flat list of [`AssetData`] records, optionally loaded from a
//! JSON file on connect. Queries follow the collection/type/variant search of
//! the asset server it stands in for: a collection name is always required for
//! searching, and a detail fetch must resolve to exactly one record.

use super::AssetDatabase;
use crate::config::QueryConfig;
use crate::error::{AssetError, Result};
use crate::models::{AssetData, AssetDescription};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

/// Where a catalog's records come from on connect.
enum CatalogSource {
    /// JSON file, re-read on every connect.
    File(PathBuf),
    /// Records handed in at construction.
    Records(Vec<AssetData>),
}

/// Asset database backed by an in-memory record list.
pub struct CatalogDb {
    source: CatalogSource,
    records: RwLock<Option<Vec<AssetData>>>,
}

impl CatalogDb {
    /// Catalog over the given records, usable without a file.
    pub fn from_records(records: Vec<AssetData>) -> Self {
        let records = assign_ids(records);
        Self {
            records: RwLock::new(Some(records.clone())),
            source: CatalogSource::Records(records),
        }
    }

    /// Catalog loaded from a JSON array of asset records on connect.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: CatalogSource::File(path.into()),
            records: RwLock::new(None),
        }
    }

    async fn load(path: &Path) -> Result<Vec<AssetData>> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            AssetError::backend(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let records: Vec<AssetData> = serde_json::from_slice(&raw).map_err(|e| {
            AssetError::backend(format!("Failed to parse catalog {}: {}", path.display(), e))
        })?;
        Ok(assign_ids(records))
    }

    fn records(&self) -> Result<RwLockReadGuard<'_, Option<Vec<AssetData>>>> {
        let guard = self
            .records
            .read()
            .map_err(|e| AssetError::backend(format!("Failed to lock catalog: {}", e)))?;
        if guard.is_none() {
            return Err(AssetError::backend("Catalog is not connected"));
        }
        Ok(guard)
    }

    fn write_records(&self, records: Option<Vec<AssetData>>) -> Result<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|e| AssetError::backend(format!("Failed to lock catalog: {}", e)))?;
        *guard = records;
        Ok(())
    }
}

/// Give every record a stable id (its catalog position) unless it has one.
fn assign_ids(mut records: Vec<AssetData>) -> Vec<AssetData> {
    for (index, record) in records.iter_mut().enumerate() {
        if record.description.id.is_empty() {
            record.description.id = index.to_string();
        }
    }
    records
}

/// Empty query fields match anything; the collection name must match exactly.
fn is_match(query: &AssetDescription, candidate: &AssetDescription) -> bool {
    candidate.name == query.name
        && (query.class.is_empty() || candidate.class == query.class)
        && (query.subclass.is_empty() || candidate.subclass == query.subclass)
}

#[async_trait]
impl AssetDatabase for CatalogDb {
    async fn connect(&self) -> Result<()> {
        let records = match &self.source {
            CatalogSource::File(path) => {
                let records = Self::load(path).await?;
                info!(
                    "Loaded {} catalog records from {}",
                    records.len(),
                    path.display()
                );
                records
            }
            CatalogSource::Records(records) => records.clone(),
        };
        self.write_records(Some(records))
    }

    async fn suggest_initial(&self) -> Result<Vec<String>> {
        let guard = self.records()?;
        let names: BTreeSet<&str> = guard
            .iter()
            .flatten()
            .map(|record| record.description.name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        Ok(names.into_iter().map(String::from).collect())
    }

    async fn matches(&self, query: &AssetDescription, page: u32) -> Result<Vec<AssetDescription>> {
        // Searching every collection is too broad; wait for a name.
        if query.name.is_empty() {
            return Ok(Vec::new());
        }

        let offset = (page as usize).saturating_mul(QueryConfig::PAGE_SIZE);
        let guard = self.records()?;
        let results: Vec<AssetDescription> = guard
            .iter()
            .flatten()
            .map(|record| &record.description)
            .filter(|candidate| is_match(query, candidate))
            .skip(offset)
            .take(QueryConfig::PAGE_SIZE)
            .cloned()
            .collect();

        debug!(
            "Catalog matched {} records for {}/{}/{} page {}",
            results.len(),
            query.name,
            query.class,
            query.subclass,
            page
        );
        Ok(results)
    }

    async fn asset_data(&self, query: &AssetDescription) -> Result<AssetData> {
        if !query.is_fully_specified() {
            return Err(AssetError::invalid_query(
                "Description must include non-empty name, class and subclass",
            ));
        }

        let guard = self.records()?;
        let mut found: Vec<&AssetData> = guard
            .iter()
            .flatten()
            .filter(|record| is_match(query, &record.description))
            .collect();

        if found.len() == 1 {
            return Ok(found.remove(0).clone());
        }
        Err(AssetError::backend(format!(
            "Expected 1 result, got {}",
            found.len()
        )))
    }

    async fn close(&self) -> Result<()> {
        self.write_records(None)
    }
}
