//! comic-page-cache: on-demand page extraction for comic archives.
//!
//! Pages are pulled out of zip archives, resized to the requested bounding
//! box, and cached on disk as JPEG. Reading ahead is handled by background
//! prefetching; a periodic sweep bounds the cache by archive directories.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use comic_page_cache::cache::pages::PageService;
use comic_page_cache::catalog::memory::MemoryCatalog;
use comic_page_cache::config::{Cli, Config};
use comic_page_cache::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "comic_page_cache=debug,tower_http=debug"
    } else {
        "comic_page_cache=info,tower_http=info"
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("comic-page-cache v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    let config = Arc::new(config);

    info!(
        page_dir = %config.cache.page_dir.display(),
        max_directories = config.cache.max_directories,
        lock_scope = ?config.cache.lock_scope,
        prefetch_depth = config.prefetch.enabled.then_some(config.prefetch.depth).unwrap_or(0),
        "Configuration loaded"
    );

    let catalog = Arc::new(MemoryCatalog::new());
    let pages = PageService::new(config.clone(), catalog.clone())?;

    for path in &cli.archives {
        let record = match catalog.register(path).await {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Skipping archive");
                continue;
            }
        };
        if let Err(err) = pages.create_thumbnail(&record.identity).await {
            warn!(archive = %record.identity, error = %err, "Thumbnail creation failed");
        }
    }
    info!(archives = catalog.len().await, "Catalog ready");

    let state = Arc::new(AppState {
        pages,
        config: config.clone(),
        start_time: Instant::now(),
    });

    if config.eviction.interval_secs > 0 {
        let sweeper = state.clone();
        let period = Duration::from_secs(config.eviction.interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = sweeper.pages.sweep().await {
                    warn!(error = %err, "Eviction sweep failed");
                }
            }
        });
    }

    let app = build_router(state);

    let listen_addr = config.server.listen.clone();
    info!(addr = listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
