//! Asset Server - HTTP front end for asset lookups.
//!
//! Serves the JSON lookup API under `/api/1/` and the viewer UI from a
//! static directory, backed by an [`asset_core::AssetService`].

mod handler;
mod server;

use anyhow::Result;
use asset_core::{AssetService, CacheConfig, CatalogDb, DynAssetDatabase};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "asset-server")]
#[command(about = "Asset lookup API and viewer host")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "7600")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory holding the viewer UI
    #[arg(short = 'd', long, default_value = "ui/dist/")]
    www_root: PathBuf,

    /// JSON catalog of asset records to serve
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Folder for the lookup cache (defaults to the system temp dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Seconds a cached lookup stays valid
    #[arg(long, default_value_t = CacheConfig::DEFAULT_TTL_SECS)]
    cache_ttl: u64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting asset server");

    let db: DynAssetDatabase = match &args.catalog {
        Some(path) => {
            info!("Catalog: {}", path.display());
            Arc::new(CatalogDb::from_file(path))
        }
        None => {
            warn!("No --catalog given, serving an empty asset database");
            Arc::new(CatalogDb::from_records(Vec::new()))
        }
    };

    let mut cache_config = CacheConfig::default().with_ttl(Duration::from_secs(args.cache_ttl));
    if let Some(dir) = args.cache_dir {
        cache_config = cache_config.with_root_folder(dir);
    }
    info!("Cache file: {}", cache_config.database_path().display());

    let service = Arc::new(AssetService::with_cache_config(db, cache_config).await?);

    // Close the service on every way out, including a failed bind
    let served = serve(Arc::clone(&service), &args.www_root, &args.host, args.port).await;
    let closed = service.close().await;
    served?;
    closed?;

    Ok(())
}

/// Serve until Ctrl-C.
async fn serve(service: Arc<AssetService>, www_root: &Path, host: &str, port: u16) -> Result<()> {
    let addr = server::start_server(service, www_root, host, port).await?;

    // Intentional stdout so launchers and tests can find an auto-assigned port
    println!("LISTEN_PORT={}", addr.port());

    info!("Serving {} on {}", www_root.display(), addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, closing asset service");

    Ok(())
}
