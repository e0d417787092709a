//! # barter
//!
//! Assembles the server from configuration: storage backend, services, the
//! axum router, then serves until SIGINT/SIGTERM.

mod shutdown;
mod telemetry;
mod wiring;

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{router, AppState, HttpMetrics};
use configs::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file = configs::load_env_file();
    let settings = Settings::load().context("loading configuration")?;
    telemetry::init(&settings.log)?;
    if let Err(e) = env_file {
        tracing::warn!(error = %e, "ignoring unreadable .env file");
    }

    let repos = wiring::repositories(&settings.database).await?;
    let services = wiring::services(repos, &settings.auth)?;

    let state = AppState {
        ads: services.ads,
        proposals: services.proposals,
        accounts: services.accounts,
        page_size: settings.pagination.page_size,
        metrics: Arc::new(HttpMetrics::new()),
    };

    let addr = settings.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, backend = ?settings.database.backend, "barter listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
