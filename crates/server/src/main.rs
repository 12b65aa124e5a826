use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytaudio_core::{load_config, load_config_from_env, validate_config, AudioService, Config};
use ytaudio_server::{api::create_router, state::AppState};

/// Default config file, used when present and `YTAUDIO_CONFIG` is unset
const DEFAULT_CONFIG_FILE: &str = "config.toml";

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

    let config = load()?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        ytdlp = %config.downloader.ytdlp_path.display(),
        ffmpeg = %config.transcoder.ffmpeg_path.display(),
        temp_dir = %config.temp_dir.display(),
        "External tools"
    );

    let service = AudioService::from_config(&config).context("Failed to create audio service")?;

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), service));

    // Create router
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

    info!("Server stopped");
    Ok(())
}

/// `YTAUDIO_CONFIG` must name an existing file; otherwise `config.toml` is
/// used if present, and defaults plus environment if not.
fn load() -> Result<Config> {
    if let Ok(path) = std::env::var("YTAUDIO_CONFIG") {
        let path = PathBuf::from(path);
        info!("Loading configuration from {:?}", path);
        return load_config(&path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if path.exists() {
        info!("Loading configuration from {:?}", path);
        load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
    } else {
        info!("No config file, using defaults and environment");
        load_config_from_env().context("Failed to load config from environment")
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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

    info!("Shutdown signal received");
}
