//! Server entry point.
//!
//! # Responsibility
//! - Parse configuration, start logging and open the store.
//! - Serve the REST router until interrupted.

use anyhow::{anyhow, Context};
use clap::Parser;
use conference_core::db::{open_db, open_db_in_memory};
use conference_core::{core_version, init_logging};
use conference_server::{router, AppState, ServerConfig};
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(config.log_level(), config.log_dir.as_deref())
        .map_err(|err| anyhow!("logging setup failed: {err}"))?;

    let conn = if config.is_in_memory() {
        open_db_in_memory()
    } else {
        open_db(&config.database)
    }
    .with_context(|| format!("failed to open database {}", config.database))?;

    let app = router(AppState::new(conn, config.paging(), config.cache_capacity));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(
        "event=server_start module=server status=ok version={} addr={}",
        core_version(),
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("event=server_stop module=server status=error error={err}");
    }
}
