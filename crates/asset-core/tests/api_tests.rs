//! Integration tests for the AssetService public interface.
//!
//! These run the service against the catalog backend and the real SQLite
//! cache, using only what the crate exports.

use asset_core::{
    AssetData, AssetDatabase, AssetDescription, AssetError, AssetService, CacheConfig, CatalogDb,
    ResourceDescription,
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn catalog_records() -> Vec<AssetData> {
    vec![
        AssetData {
            description: AssetDescription::query("props", "chair", "oak"),
            attributes: HashMap::from([("artist".to_string(), "kim".to_string())]),
            version: 7,
            thumbnail: Some("/thumbs/chair_oak.png".to_string()),
            linked: vec![AssetDescription::query("props", "table", "oak")],
            resources: vec![ResourceDescription {
                name: "model".to_string(),
                class: "usd".to_string(),
                uri: "/assets/props/chair_oak.usd".to_string(),
            }],
        },
        AssetData {
            description: AssetDescription::query("props", "table", "oak"),
            version: 2,
            ..Default::default()
        },
        AssetData {
            description: AssetDescription::query("env", "tree", "birch"),
            version: 1,
            ..Default::default()
        },
    ]
}

/// Write the catalog as JSON and return its path.
fn write_catalog(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, serde_json::to_vec(&catalog_records()).unwrap()).unwrap();
    path
}

fn cache_config(dir: &TempDir) -> CacheConfig {
    CacheConfig::default().with_root_folder(dir.path().join("cache"))
}

#[tokio::test]
async fn test_service_over_catalog_file() {
    let temp_dir = TempDir::new().unwrap();
    let db = Arc::new(CatalogDb::from_file(write_catalog(&temp_dir)));
    let service = AssetService::with_cache_config(db, cache_config(&temp_dir))
        .await
        .unwrap();

    assert_eq!(service.suggest_initial().await.unwrap(), vec!["env", "props"]);

    let matches = service.matches("props", "", "", 0).await.unwrap();
    assert_eq!(matches.len(), 2);

    let data = service.asset_data("props", "chair", "oak").await.unwrap();
    assert_eq!(data, catalog_records()[0]);

    service.close().await.unwrap();
}

#[tokio::test]
async fn test_creation_fails_for_missing_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let db = Arc::new(CatalogDb::from_file(temp_dir.path().join("nope.json")));
    let result = AssetService::with_cache_config(db, cache_config(&temp_dir)).await;
    assert!(matches!(result, Err(AssetError::Backend { .. })));
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = cache_config(&temp_dir).with_ttl(std::time::Duration::from_secs(3600));

    let db = Arc::new(CatalogDb::from_records(catalog_records()));
    let service = AssetService::with_cache_config(db, config.clone())
        .await
        .unwrap();
    let before = service.asset_data("props", "chair", "oak").await.unwrap();
    service.close().await.unwrap();

    // Second run has a database that no longer knows the asset
    let db = Arc::new(CatalogDb::from_records(Vec::new()));
    let service = AssetService::with_cache_config(db, config).await.unwrap();
    let after = service.asset_data("props", "chair", "oak").await.unwrap();
    assert_eq!(after, before);
    service.close().await.unwrap();
}

#[tokio::test]
async fn test_second_service_cannot_share_cache_file() {
    let temp_dir = TempDir::new().unwrap();

    let first = AssetService::with_cache_config(
        Arc::new(CatalogDb::from_records(catalog_records())),
        cache_config(&temp_dir),
    )
    .await
    .unwrap();

    let db = Arc::new(CatalogDb::from_records(catalog_records()));
    let second = AssetService::with_cache_config(db.clone(), cache_config(&temp_dir)).await;
    assert!(matches!(second, Err(AssetError::StorageUnavailable { .. })));
    // Construction rolled back the database connection
    assert!(db.suggest_initial().await.is_err());

    first.close().await.unwrap();
}

#[tokio::test]
async fn test_second_service_cannot_share_existing_cache_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = cache_config(&temp_dir).with_ttl(std::time::Duration::from_secs(3600));

    // Leave a populated cache file behind from an earlier run
    let earlier = AssetService::with_cache_config(
        Arc::new(CatalogDb::from_records(catalog_records())),
        config.clone(),
    )
    .await
    .unwrap();
    earlier.asset_data("props", "table", "oak").await.unwrap();
    earlier.close().await.unwrap();

    let first = AssetService::with_cache_config(
        Arc::new(CatalogDb::from_records(catalog_records())),
        config.clone(),
    )
    .await
    .unwrap();

    let second = AssetService::with_cache_config(
        Arc::new(CatalogDb::from_records(catalog_records())),
        config.clone(),
    )
    .await;
    assert!(matches!(second, Err(AssetError::StorageUnavailable { .. })));

    // The owner still writes to its cache: a fresh lookup survives a restart
    // against an empty database
    first.asset_data("props", "chair", "oak").await.unwrap();
    first.close().await.unwrap();

    let service = AssetService::with_cache_config(Arc::new(CatalogDb::from_records(Vec::new())), config)
        .await
        .unwrap();
    let data = service.asset_data("props", "chair", "oak").await.unwrap();
    assert_eq!(data.version, 7);
    service.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups() {
    let temp_dir = TempDir::new().unwrap();
    let service = Arc::new(
        AssetService::with_cache_config(
            Arc::new(CatalogDb::from_records(catalog_records())),
            cache_config(&temp_dir),
        )
        .await
        .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service.matches("props", "", "", 0).await.map(|m| m.len())
            } else {
                service
                    .asset_data("props", "table", "oak")
                    .await
                    .map(|d| d.version as usize)
            }
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value, 2, "task {} got {}", i, value);
    }

    service.close().await.unwrap();
}
