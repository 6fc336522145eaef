// SPDX-License-Identifier: GPL-3.0-only
mod api;
mod config;
mod logging;
mod monitor;
mod registry;
#[cfg(test)]
mod test_helpers;

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use api::{ApiHandlers, HttpServer};
use config::Config;
use logging::setup_logging;
use monitor::{HitCounter, IdleShutdownMonitor, ShutdownReason};
use registry::{InMemoryRegistry, Registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level, config.log_format)?;

    info!("Starting logistics-daemon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        listen_addr = %config.listen_addr,
        sample_interval_ms = config.sample_interval_ms,
        idle_threshold = config.idle_threshold,
        request_timeout_secs = config.request_timeout_secs,
        "Loaded configuration"
    );

    let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
    let hits = Arc::new(HitCounter::new());

    // Stops the listener and the monitor
    let shutdown = CancellationToken::new();
    // Cancels in-flight operations that outlive the drain period
    let abort = CancellationToken::new();

    let (idle_tx, idle_rx) = oneshot::channel();
    let monitor = IdleShutdownMonitor::new(
        hits.clone(),
        Arc::clone(&registry),
        config.sample_interval(),
        config.idle_threshold,
    );
    let monitor_task = tokio::spawn(monitor.run(idle_tx, shutdown.clone()));

    let listener = TcpListener::bind(config.listen_addr.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    let handlers = ApiHandlers::new(Arc::clone(&registry), abort.clone(), config.request_timeout());
    let http_server = HttpServer::new(handlers, Arc::clone(&hits));
    let mut http_task = tokio::spawn(http_server.serve(listener, shutdown.clone()));

    info!("All services started. Waiting for idle timeout or shutdown signal...");

    let reason = tokio::select! {
        received = idle_rx => match received {
            Ok(reason) => reason,
            Err(_) => {
                warn!("Idle monitor exited without a shutdown notification");
                ShutdownReason::Idle
            }
        },
        () = shutdown_signal() => ShutdownReason::Signal,
    };

    // Graceful shutdown
    info!(?reason, "Initiating graceful shutdown...");
    shutdown.cancel();

    let served = match tokio::time::timeout(config.request_timeout(), &mut http_task).await {
        Ok(joined) => joined,
        Err(_) => {
            warn!("In-flight requests did not drain in time, cancelling them");
            abort.cancel();
            http_task.await
        }
    };
    match served {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server error"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
    }

    if let Err(e) = monitor_task.await {
        error!(error = %e, "Idle monitor task failed");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Unable to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal (Ctrl+C)");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received shutdown signal (SIGTERM)");
            }
            Err(err) => {
                error!(error = %err, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
