//! SensorHub - Main Entry Point

use anyhow::Context;
use hub::{init_logging, install_metrics, Hub, HubConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let config = HubConfig::load(path.as_deref()).context("failed to load configuration")?;

    init_logging(&config.logging)?;
    info!("=== SensorHub v{} ===", env!("CARGO_PKG_VERSION"));

    install_metrics(&config.metrics)?;

    let hub = Hub::bind(config).await?;
    hub.run().await?;

    info!("SensorHub stopped");
    Ok(())
}
