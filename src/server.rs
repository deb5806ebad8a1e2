// ABOUTME: HTTP server lifecycle for the coaching stream service
// ABOUTME: Binds the listener, serves the router, and shuts down gracefully on ctrl-c or SIGTERM
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::resources::CoachResources;
use crate::routes::router;

/// Bind `0.0.0.0:port` and serve until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn run(resources: Arc<CoachResources>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {addr}"))?;
    serve(resources, listener).await
}

/// Serve on an already-bound listener
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(resources: Arc<CoachResources>, listener: TcpListener) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!("Coaching stream server listening on http://{local_addr}");

    axum::serve(listener, router(resources))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Coaching stream server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install ctrl-c handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
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
    info!("Shutdown signal received, draining connections");
}
