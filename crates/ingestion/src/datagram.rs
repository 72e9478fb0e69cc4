//! UDP Handshake Gateway
//!
//! Datagram sensors must send `REQUEST TRANSMISSION` and receive `200`
//! before their data is accepted. A sensor that stays silent for longer
//! than the liveness timeout is considered down and has to handshake again.

use crate::batch::ChunkBatch;
use crate::config::DatagramConfig;
use sensor_protocol::{keyword, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use storage::ReadingStore;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Largest datagram read in one call
const MAX_DATAGRAM: usize = 512;

/// Pause after a failed receive before trying again
const RECV_BACKOFF: Duration = Duration::from_millis(100);

enum Event {
    Datagram(std::io::Result<(usize, SocketAddr)>),
    LivenessExpired,
}

/// Handshake-gated UDP ingestion
pub struct DatagramGateway {
    socket: UdpSocket,
    store: Arc<ReadingStore>,
    config: DatagramConfig,
    /// Address that completed the handshake
    sensor: Option<SocketAddr>,
    /// When the authorized sensor is declared down
    deadline: Option<Instant>,
}

impl DatagramGateway {
    pub fn new(socket: UdpSocket, store: Arc<ReadingStore>, config: DatagramConfig) -> Self {
        Self {
            socket,
            store,
            config,
            sensor: None,
            deadline: None,
        }
    }

    /// Receive datagrams until the task is dropped
    pub async fn run(mut self) {
        match self.socket.local_addr() {
            Ok(addr) => info!("Listening for datagram sensors on {}", addr),
            Err(e) => warn!("Datagram socket has no local address: {}", e),
        }

        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            let deadline = self.deadline;
            let event = tokio::select! {
                received = self.socket.recv_from(&mut buf) => Event::Datagram(received),
                _ = expire(deadline) => Event::LivenessExpired,
            };

            match event {
                Event::Datagram(Ok((n, from))) => self.handle_datagram(&buf[..n], from).await,
                Event::Datagram(Err(e)) => recv_failed(&e).await,
                Event::LivenessExpired => {
                    if let Some(sensor) = self.sensor.take() {
                        warn!("Datagram sensor {} down, handshake required", sensor);
                    }
                    self.deadline = None;
                }
            }
        }
    }

    async fn handle_datagram(&mut self, payload: &[u8], from: SocketAddr) {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(_) => {
                warn!("Dropping non UTF-8 datagram from {}", from);
                self.reject_if_unknown(from).await;
                return;
            }
        };
        debug!("Datagram from {}: {:?}", from, text.trim_end());

        if text.trim() == keyword::HANDSHAKE {
            if self.sensor.is_some_and(|sensor| sensor != from) {
                info!("Datagram sensor {} replaces {:?}", from, self.sensor);
            }
            info!("Handshake from {} accepted", from);
            self.sensor = Some(from);
            self.arm_deadline();
            self.reply(keyword::STATUS_OK, from).await;
            return;
        }

        if self.sensor != Some(from) {
            warn!("Expected handshake from {}, got {:?}", from, text.trim_end());
            self.reply(keyword::STATUS_BAD_REQUEST, from).await;
            return;
        }

        self.arm_deadline();
        let lines = text.lines().map(|line| Ok::<_, ProtocolError>(line.to_string()));
        let batch = ChunkBatch::from_lines(lines);
        if let Err(e) = batch.commit(&self.store).await {
            error!("Failed to commit datagram batch from {}: {}", from, e);
        }
    }

    async fn reject_if_unknown(&self, from: SocketAddr) {
        if self.sensor != Some(from) {
            self.reply(keyword::STATUS_BAD_REQUEST, from).await;
        }
    }

    /// Restart the liveness timer; a timeout too large to represent never expires
    fn arm_deadline(&mut self) {
        self.deadline = Instant::now().checked_add(self.config.liveness_timeout());
    }

    async fn reply(&self, status: &str, to: SocketAddr) {
        if let Err(e) = self.socket.send_to(status.as_bytes(), to).await {
            warn!("Failed to send status {:?} to {}: {}", status.trim_end(), to, e);
        }
    }
}

async fn recv_failed(e: &std::io::Error) {
    warn!("Datagram receive failed: {}", e);
    tokio::time::sleep(RECV_BACKOFF).await;
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
