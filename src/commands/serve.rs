//! Run the request handler.
//!
//! Mounts the generate endpoint on every path and, unless disabled, runs the
//! retention sweeper on `retention.schedule` in the same process.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::http::{AppState, router};
use crate::inference::WorkersAiGenerator;
use crate::scheduler::SweepScheduler;
use crate::storage::open_store;
use crate::sweeper::RetentionSweeper;

/// Serve until Ctrl+C or SIGTERM.
///
/// `port_override` replaces `server.port`; `no_sweep` skips the scheduler.
///
/// # Errors
///
/// Returns an error if the store or inference client cannot be set up, the
/// schedule is invalid, or the listener cannot bind.
pub async fn execute(config: &Config, port_override: Option<u16>, no_sweep: bool) -> Result<()> {
    let store = open_store(&config.storage).await?;
    let generator = WorkersAiGenerator::from_config(&config.inference)
        .context("Failed to configure inference client")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    info!(
        endpoint = %generator.endpoint(),
        backend = ?config.storage.backend,
        "Request handler configured"
    );

    let scheduler = if no_sweep {
        warn!("Retention sweeps disabled (--no-sweep)");
        None
    } else {
        let sweeper =
            RetentionSweeper::new(Arc::clone(&store), Arc::clone(&clock), config.retention_config());
        Some(SweepScheduler::start(sweeper, &config.retention.schedule).await?)
    };

    let state = AppState::new(config.handler_config(), Arc::new(generator), store, clock);
    let app = router(state);

    let port = port_override.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{port}", config.server.bind)
        .parse()
        .with_context(|| format!("Invalid bind address '{}:{port}'", config.server.bind))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("Starting server on http://{addr}");
    println!("Routes: GET /?prompt=..., POST / {{\"prompt\": \"...\"}}");
    println!("Health: /health");
    if let Some(scheduler) = &scheduler {
        println!("Retention sweep: {}", scheduler.schedule());
    }
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
