//! Query server configuration

use crate::formatter::{HtmlFormatter, JsonFormatter, ResponseFormatter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Response body format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `application/json` array of `{time, value}` objects
    #[default]
    Json,
    /// `text/html` table with human-readable timestamps
    Html,
}

impl OutputFormat {
    /// Build the formatter for this format
    pub fn formatter(&self) -> Arc<dyn ResponseFormatter> {
        match self {
            OutputFormat::Json => Arc::new(JsonFormatter),
            OutputFormat::Html => Arc::new(HtmlFormatter),
        }
    }
}

/// Query listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Address the query listener binds
    pub listen: String,
    /// Time allowed for a client to deliver its request line
    pub read_timeout_ms: u64,
    /// Request bytes read before parsing gives up on a terminator
    pub max_request_bytes: usize,
    /// Response body format
    pub format: OutputFormat,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            read_timeout_ms: 5_000,
            max_request_bytes: 4096,
            format: OutputFormat::Json,
        }
    }
}

impl QueryConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
