//! Sensor Line Protocol
//!
//! Decodes the text protocol spoken by temperature and humidity sensors.
//! Each line carries a keyword and zero or more `time:value` pairs:
//!
//! ```text
//! TEMP 1700000000:21 1700000001:22\r\n
//! HUMID 1700000000:64\r\n
//! ALIVE\r\n
//! REQUEST TRANSMISSION\r\n
//! ```

mod error;
mod frame;
mod framer;
mod reading;

pub use error::ProtocolError;
pub use frame::{decode_line, Frame};
pub use framer::{LineFramer, MAX_LINE_LEN};
pub use reading::{Kind, Reading};

/// Wire keywords and handshake replies
pub mod keyword {
    /// Temperature data line
    pub const TEMP: &str = "TEMP";
    /// Humidity data line
    pub const HUMID: &str = "HUMID";
    /// Liveness heartbeat
    pub const ALIVE: &str = "ALIVE";
    /// Datagram handshake request
    pub const HANDSHAKE: &str = "REQUEST TRANSMISSION";
    /// Handshake accepted
    pub const STATUS_OK: &str = "200\r\n";
    /// Handshake expected but something else arrived
    pub const STATUS_BAD_REQUEST: &str = "400\r\n";
}
