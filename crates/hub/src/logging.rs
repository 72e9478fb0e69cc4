//! Logging and metrics setup

use crate::config::{LoggingConfig, MetricsConfig};
use crate::HubError;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), HubError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| HubError::Logging(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| HubError::Logging(e.to_string()))
}

/// Start the Prometheus scrape endpoint when configured
pub fn install_metrics(config: &MetricsConfig) -> Result<(), HubError> {
    let Some(listen) = &config.listen else {
        return Ok(());
    };

    let addr: SocketAddr = listen
        .parse()
        .map_err(|_| HubError::InvalidAddress(listen.clone()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| HubError::Metrics(e.to_string()))?;

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
