//! Layered configuration
//!
//! Defaults, then an optional TOML file, then `SENSORHUB_*` environment
//! variables (`__` separates sections, e.g. `SENSORHUB_QUERY__FORMAT=html`).

use crate::HubError;
use config::{Config, Environment, File, FileFormat};
use ingestion::{DatagramConfig, IngestConfig};
use query::QueryConfig;
use serde::{Deserialize, Serialize};
use storage::StoreConfig;

/// Config file read when no path is given, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "sensorhub.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SENSORHUB";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prometheus exporter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Scrape endpoint address; exporter is off when unset
    pub listen: Option<String>,
}

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub storage: StoreConfig,
    pub ingest: IngestConfig,
    pub datagram: DatagramConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

impl HubConfig {
    /// Load defaults, the config file and the environment
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&str>) -> Result<Self, HubError> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(HubError::from)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(source: &str) -> Result<Self, HubError> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(HubError::from)
    }
}
