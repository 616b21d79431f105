//! Process bootstrap: logging, database session, catalog, mount

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use common::Engine;

use crate::config::{Config, LogConfig};
use crate::database::MySqlClient;

pub const LOG_FILE_PREFIX: &str = "sqlfs.log";

/// Install the global subscriber
///
/// Logs go to stderr, and additionally to a daily file when a log directory
/// is configured. Keep the returned guard alive until exit so buffered file
/// output is flushed.
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(file)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .init();
            None
        }
    }
}

/// Connect, discover the catalog and build the engine
pub async fn start_engine(config: &Config) -> anyhow::Result<Arc<Engine>> {
    config.validate()?;

    let client = MySqlClient::connect(&config.database)
        .await
        .with_context(|| {
            format!(
                "failed to connect to {}:{}",
                config.database.host, config.database.port
            )
        })?;

    let engine = Engine::new(Box::new(client), config.catalog.clone());
    let stats = engine.refresh().await.context("failed to load catalog")?;
    tracing::info!(
        databases = stats.databases,
        tables = stats.tables,
        failed = stats.failed_databases,
        "catalog loaded"
    );

    Ok(Arc::new(engine))
}

/// Serve the catalog at `mountpoint` until SIGINT or SIGTERM
#[cfg(feature = "fuse")]
pub async fn run(config: &Config, mountpoint: &Path) -> anyhow::Result<()> {
    let engine = start_engine(config).await?;

    let session = crate::fuse::mount(
        engine,
        mountpoint,
        &config.mount,
        tokio::runtime::Handle::current(),
    )
    .with_context(|| format!("failed to mount at {}", mountpoint.display()))?;

    shutdown_signal().await;
    tracing::info!(mountpoint = %mountpoint.display(), "unmounting");
    // the session thread may be waiting on the runtime; let it finish
    tokio::task::block_in_place(move || drop(session));
    Ok(())
}

#[cfg(not(feature = "fuse"))]
pub async fn run(_config: &Config, _mountpoint: &Path) -> anyhow::Result<()> {
    anyhow::bail!("sqlfs was built without the `fuse` feature")
}

#[cfg(feature = "fuse")]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "cannot listen for ctrl-c");
            }
        }
        _ = terminate => {}
    }
}
