use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chainsync_worker::settings::{Settings, SettingsError};
use chainsync_worker::supervisor::{signals, Supervisor};
use chainsync_worker::{bootstrap, setup};
use clap::Parser;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON settings file.
    #[arg(long, default_value = "config/worker.json")]
    config: PathBuf,

    /// Synchronize a single chain (requires --network).
    #[arg(long, env = "CHAIN")]
    chain: Option<String>,

    /// Synchronize a single network (requires --chain).
    #[arg(long, env = "NETWORK")]
    network: Option<String>,

    /// Maximum tracing level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    bootstrap::tracing::setup(&args.log_level);

    let settings = match Settings::load(&args.config) {
        Ok(settings) => settings,
        Err(e @ SettingsError::Unreadable { .. }) => {
            warn!(%e, "falling back to default settings");
            Settings::default()
        }
        Err(e) => return Err(e).context("could not load settings"),
    };

    let (fatal_tx, fatal_rx) = signals::fatal_channel();

    let registry = setup::setup(&settings, args.chain.as_deref(), args.network.as_deref(), &fatal_tx)
        .context("could not assemble the service registry")?;

    let supervisor = Arc::new(Supervisor::new(registry));

    supervisor.startup().await;

    signals::watch(supervisor, fatal_rx)
        .await
        .context("shutdown completed with failures")?;

    Ok(())
}
