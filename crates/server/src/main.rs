use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sopreg_core::{
    load_config, validate_config, CatalogStore, GitHubPlatform, HostingPlatform, JsonCatalogStore,
    Reconciler, SweepScheduler,
};
use sopreg_server::api::create_router;
use sopreg_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("SOPREG_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Catalog path: {:?}", config.catalog.path);
    info!(
        "Hosting: raw={} api={} branch={}",
        config.hosting.raw_base_url, config.hosting.api_base_url, config.hosting.default_branch
    );

    let store: Arc<dyn CatalogStore> = Arc::new(JsonCatalogStore::new(config.catalog.path.clone()));
    let catalog = store
        .load()
        .with_context(|| format!("Failed to load catalog from {:?}", config.catalog.path))?;
    info!(
        "Catalog loaded: {} packages, {} valid",
        catalog.len(),
        catalog.valid_count()
    );
    sopreg_core::metrics::set_catalog_health(catalog.len(), catalog.valid_count());

    let platform: Arc<dyn HostingPlatform> = Arc::new(
        GitHubPlatform::new(&config.hosting).context("Failed to create hosting client")?,
    );

    let reconciler = Arc::new(Reconciler::new(store, platform, &config));

    // Start periodic sweeps if enabled
    let scheduler = if config.sweep.enabled {
        let scheduler = SweepScheduler::new(
            Arc::clone(&reconciler),
            Duration::from_secs(config.sweep.interval_secs),
        );
        scheduler.start().await;
        info!(
            "Sweep scheduler started (every {}s, {} concurrent fetches)",
            config.sweep.interval_secs, config.sweep.max_concurrent_fetches
        );
        Some(scheduler)
    } else {
        info!("Scheduled sweeps disabled in config");
        None
    };

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), reconciler));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
        info!("Sweep scheduler stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
