//! Stream Line Framing
//!
//! A TCP read returns an arbitrary slice of the sensor stream. The framer
//! keeps the unterminated tail between reads and hands back whole lines.

use crate::error::ProtocolError;
use tracing::debug;

/// Longest line accepted before the pending bytes are discarded
pub const MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream into `\n` terminated lines
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
    /// Dropping the rest of an oversized line
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, ProtocolError>> {
        let mut lines = Vec::new();

        for segment in chunk.split_inclusive(|&b| b == b'\n') {
            let terminated = segment.last() == Some(&b'\n');

            if self.discarding {
                if terminated {
                    self.discarding = false;
                }
                continue;
            }

            self.pending.extend_from_slice(segment);

            if terminated {
                lines.push(take_line(&mut self.pending));
            } else if self.pending.len() > MAX_LINE_LEN {
                debug!("Discarding {} bytes of unterminated input", self.pending.len());
                self.pending.clear();
                self.discarding = true;
                lines.push(Err(ProtocolError::LineTooLong(MAX_LINE_LEN)));
            }
        }

        lines
    }

    /// Flush the unterminated remainder at end of stream
    pub fn finish(&mut self) -> Option<Result<String, ProtocolError>> {
        self.discarding = false;
        if self.pending.is_empty() {
            return None;
        }
        Some(take_line(&mut self.pending))
    }

    /// Bytes buffered waiting for a terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn take_line(pending: &mut Vec<u8>) -> Result<String, ProtocolError> {
    let mut bytes = std::mem::take(pending);
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}
