//! Query Responder
//!
//! Serves the stored reading history over a deliberately minimal text
//! protocol: one `GET /temperature` or `GET /humidity` request per
//! connection, one rendered response, then close.

mod config;
mod formatter;
mod request;
mod responder;
mod response;

pub use config::{OutputFormat, QueryConfig};
pub use formatter::{HtmlFormatter, JsonFormatter, ResponseFormatter};
pub use request::{parse_request_line, route, RequestLine};
pub use responder::{run_listener, QueryResponder};
pub use response::{Response, Status, NOT_FOUND_RESPONSE};

use thiserror::Error;

/// Errors while answering a query
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
    #[error("Render error: {0}")]
    Render(#[from] serde_json::Error),
}
