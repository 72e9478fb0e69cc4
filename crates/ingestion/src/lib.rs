//! Sensor Ingestion
//!
//! Turns sensor network input into committed readings:
//! - TCP sessions carrying CRLF terminated data and liveness lines
//! - a UDP gateway that requires a `REQUEST TRANSMISSION` handshake
//!
//! All readings decoded from one inbound chunk are committed as one batch.

mod batch;
mod config;
mod datagram;
mod session;

pub use batch::ChunkBatch;
pub use config::{DatagramConfig, IngestConfig};
pub use datagram::DatagramGateway;
pub use session::{run_listener, serve_session, SessionSummary};
