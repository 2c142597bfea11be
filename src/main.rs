//! URL Inspector - quota-aware batch URL inspection server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use url_inspector::api::create_router;
use url_inspector::clock::{Clock, SystemClock};
use url_inspector::inspection::{SearchConsoleClient, StaticTokenProvider};
use url_inspector::{spawn_cleanup_task, AppState, Config};

/// Main entry point for the inspection server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the API client, cache, quota tracker and scheduler
/// 4. Start background cache sweep task
/// 5. Serve the HTTP API on the configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "url_inspector=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting URL Inspector");

    let config = Config::from_env();
    info!(
        "Configuration loaded: batch_size={}, inter_batch_delay={}s, cache_ttl={}h, quota={}/day {}/min, port={}",
        config.batch_size,
        config.inter_batch_delay_secs,
        config.cache_ttl_hours,
        config.daily_quota,
        config.per_minute_quota,
        config.server_port
    );

    let token = config
        .access_token
        .clone()
        .context("GSC_ACCESS_TOKEN must be set to a valid OAuth access token")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = SearchConsoleClient::new(
        &config,
        Arc::new(StaticTokenProvider::new(token)),
        clock.clone(),
    )
    .context("failed to build HTTP client")?;

    let state = AppState::from_config(&config, Arc::new(client), clock);
    info!("Inspection engine initialized");

    let cleanup_handle = spawn_cleanup_task(state.cache(), config.cleanup_interval);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep task.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cache sweep task aborted");
}
