//! modeguard agent entry point.

mod app;
mod commands;
mod config;
mod log_tray;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting modeguard agent"
    );

    // Load configuration.
    let config = config::Config::load()?;
    tracing::info!(initial_level = %config.initial_level, "configuration loaded");

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(app::run(config));

    // The stdin reader may still be parked in a blocking read.
    rt.shutdown_background();
    result?;

    tracing::info!("agent shut down cleanly");
    Ok(())
}
