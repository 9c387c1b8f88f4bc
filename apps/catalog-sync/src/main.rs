use std::sync::Arc;
use tokio::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_sync::config::Config;
use catalog_sync::db::{self, CatalogStore};
use catalog_sync::services::{FileLocator, JobContext, LidarrClient, Scheduler, SyncEngine};
use catalog_sync::{router, AppState};

fn init_tracing() {
    // RUST_LOG controls log levels
    // Default: debug for our crate, info for axum, warn for dependencies
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("catalog_sync=debug,tower_http=debug,axum=info,warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    // Initialize tracing first so we can log configuration loading
    init_tracing();

    tracing::info!("Starting catalog sync v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(cfg) => {
            tracing::info!("Configuration loaded successfully");
            tracing::debug!("Server: {}:{}", cfg.server.host, cfg.server.port);
            tracing::debug!("Database: {:?}", cfg.database.path);
            tracing::debug!("Catalog source: {:?}", cfg.catalog_source);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Ensure database directory exists
    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
        }
    }

    let conn = match db::init_db(&config.database.path) {
        Ok(conn) => {
            tracing::info!("Database initialized at {:?}", config.database.path);
            conn
        }
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    let db = Arc::new(Mutex::new(conn));

    let source = match LidarrClient::new_shared(&config.catalog_source) {
        Ok(client) => {
            tracing::info!(base_url = %config.catalog_source.base_url, "Catalog source client initialized");
            client
        }
        Err(e) => {
            tracing::error!("Failed to create catalog source client: {}", e);
            std::process::exit(1);
        }
    };

    if !config.media.root.exists() {
        tracing::warn!(root = ?config.media.root, "Media root does not exist, audio paths will be guesses");
    }

    let engine = SyncEngine::new_shared(
        CatalogStore::new(Arc::clone(&db)),
        source,
        FileLocator::new(config.media.root.clone()),
        config.catalog_source.clone(),
    );

    let ctx = JobContext {
        engine: Arc::clone(&engine),
    };
    let scheduler = match Scheduler::new_shared(&config.sync, ctx).await {
        Ok(scheduler) => {
            if let Err(e) = scheduler.start().await {
                tracing::error!("Failed to start scheduler: {}", e);
                std::process::exit(1);
            }
            tracing::info!(
                interval_secs = config.sync.interval_secs,
                run_on_startup = config.sync.run_on_startup,
                "Scheduler started"
            );
            scheduler
        }
        Err(e) => {
            tracing::error!("Failed to create scheduler: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        engine,
        start_time: std::time::Instant::now(),
    };

    let app = router(state);

    let addr = config.server_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Catalog sync listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Failed to shut down scheduler: {}", e);
    }
    tracing::info!("Catalog sync stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
