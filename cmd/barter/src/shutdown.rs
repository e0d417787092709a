//! Resolves on SIGINT or SIGTERM so `axum::serve` can drain connections.

use std::io;

use thiserror::Error;
use tokio::signal;

#[derive(Debug, Error)]
enum ShutdownSignalError {
    #[error("failed to install Ctrl+C handler: {0}")]
    CtrlC(#[source] io::Error),

    #[cfg(unix)]
    #[error("failed to install SIGTERM handler: {0}")]
    SigTerm(#[source] io::Error),
}

async fn wait() -> Result<(), ShutdownSignalError> {
    let ctrl_c = async { signal::ctrl_c().await.map_err(ShutdownSignalError::CtrlC) };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(ShutdownSignalError::SigTerm)?
            .recv()
            .await;
        Ok::<(), ShutdownSignalError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), ShutdownSignalError>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            tracing::info!("ctrl_c signal received");
        }
        result = terminate => {
            result?;
            tracing::info!("terminate signal received");
        }
    }
    Ok(())
}

pub async fn signal() {
    if let Err(e) = wait().await {
        // Without a handler the only way out is killing the process.
        tracing::error!(error = %e, "shutdown signal unavailable");
        std::future::pending::<()>().await;
    }
}
