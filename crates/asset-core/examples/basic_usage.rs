//! Basic usage example - look up assets from a JSON catalog

use asset_core::{AssetService, CacheConfig, CatalogDb, Result};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Get catalog path from args or use the current directory
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./catalog.json".to_string());

    println!("Loading catalog from: {}", path);

    let db = Arc::new(CatalogDb::from_file(&path));
    let service = AssetService::with_cache_config(db, CacheConfig::default()).await?;

    for name in service.suggest_initial().await? {
        let matches = service.matches(&name, "", "", 0).await?;
        println!("{} ({} assets on the first page):", name, matches.len());
        for asset in matches {
            println!("  - {}/{}", asset.class, asset.subclass);
        }
    }

    service.close().await
}
