use anyhow::Context;
use clap::Parser;

use sqlfs_daemon::{init_logging, run, Config};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("failed to load config")?;
    args.apply(&mut config);

    let _log_guard = init_logging(&config.log);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting sqlfs");

    if let Err(e) = run(&config, &args.mountpoint).await {
        tracing::error!(error = %format!("{:#}", e), "sqlfs failed");
        return Err(e);
    }
    Ok(())
}
