//! TCP Sensor Sessions

use crate::batch::ChunkBatch;
use crate::config::IngestConfig;
use sensor_protocol::LineFramer;
use std::sync::Arc;
use std::time::Duration;
use storage::ReadingStore;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Per-session ingestion statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Batches committed
    pub batches: usize,
    /// Readings committed
    pub readings: usize,
    /// Lines dropped as malformed
    pub decode_errors: usize,
    /// Liveness and unrecognised lines
    pub ignored: usize,
    /// Batches lost to storage faults
    pub storage_errors: usize,
}

impl SessionSummary {
    async fn apply(&mut self, batch: ChunkBatch, store: &ReadingStore) {
        self.decode_errors += batch.decode_errors;
        self.ignored += batch.alive + batch.ignored + batch.handshakes;

        if !batch.has_readings() {
            return;
        }

        match batch.commit(store).await {
            Ok(()) => {
                self.batches += 1;
                self.readings += batch.readings.len();
            }
            Err(e) => {
                error!("Failed to commit batch of {} readings: {}", batch.readings.len(), e);
                self.storage_errors += 1;
            }
        }
    }
}

/// Accept sensors one at a time, forever
///
/// A new sensor is accepted as soon as the previous session ends.
pub async fn run_listener(listener: TcpListener, store: Arc<ReadingStore>, config: IngestConfig) {
    match listener.local_addr() {
        Ok(addr) => info!("Listening for sensors on {}", addr),
        Err(e) => warn!("Sensor listener has no local address: {}", e),
    }

    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept sensor connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        info!("Sensor connected from {}", peer);
        let summary = serve_session(&mut stream, &store, &config).await;
        info!(
            "Sensor {} disconnected: {} readings in {} batches, {} decode errors",
            peer, summary.readings, summary.batches, summary.decode_errors
        );
    }
}

/// Read one sensor stream until it closes or resets (or idles, if enabled)
pub async fn serve_session<S>(
    stream: &mut S,
    store: &ReadingStore,
    config: &IngestConfig,
) -> SessionSummary
where
    S: AsyncRead + Unpin,
{
    let mut framer = LineFramer::new();
    let mut summary = SessionSummary::default();
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];

    loop {
        let read = match config.idle_timeout() {
            Some(limit) => match tokio::time::timeout(limit, stream.read(&mut buf)).await {
                Ok(read) => read,
                Err(_) => {
                    info!("Sensor idle for {:?}, closing session", limit);
                    break;
                }
            },
            None => stream.read(&mut buf).await,
        };

        match read {
            Ok(0) => {
                debug!("Sensor closed the connection");
                break;
            }
            Ok(n) => {
                let batch = ChunkBatch::from_lines(framer.push(&buf[..n]));
                summary.apply(batch, store).await;
            }
            Err(e) => {
                warn!("Sensor connection error: {}", e);
                break;
            }
        }
    }

    if let Some(line) = framer.finish() {
        summary.apply(ChunkBatch::from_lines([line]), store).await;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_protocol::{Kind, Reading};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    async fn ingest(input: &[u8]) -> (SessionSummary, ReadingStore) {
        let store = ReadingStore::open_in_memory().await.unwrap();
        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(input).await.unwrap();
        drop(client);

        let summary = serve_session(&mut server, &store, &IngestConfig::default()).await;
        (summary, store)
    }

    #[tokio::test]
    async fn test_valid_line_is_persisted() {
        let (summary, store) = ingest(b"TEMP 1700000000:21\r\n").await;
        assert_eq!(summary.readings, 1);
        assert_eq!(
            store.query(Kind::Temperature).await.unwrap(),
            vec![Reading::new(Kind::Temperature, 1700000000, 21)]
        );
    }

    #[tokio::test]
    async fn test_alive_is_never_persisted() {
        let (summary, store) = ingest(b"ALIVE\r\nALIVE\r\n").await;
        assert_eq!(summary.decode_errors, 0);
        assert_eq!(summary.ignored, 2);
        assert_eq!(store.count(Kind::Temperature).await.unwrap(), 0);
        assert_eq!(store.count(Kind::Humidity).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_end_session() {
        let (summary, store) = ingest(b"TEMP abc:xyz\r\nHUMID 10:55\r\n").await;
        assert_eq!(summary.decode_errors, 1);
        assert_eq!(
            store.query(Kind::Humidity).await.unwrap(),
            vec![Reading::new(Kind::Humidity, 10, 55)]
        );
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_flushed_at_eof() {
        let (summary, store) = ingest(b"TEMP 1:2\r\nTEMP 3:4").await;
        assert_eq!(summary.readings, 2);
        assert_eq!(store.count(Kind::Temperature).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_then_valid_across_reads() {
        let store = ReadingStore::open_in_memory().await.unwrap();
        let (mut client, mut server) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            client.write_all(b"TEMP abc:xyz\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"TEMP 5:25\r\n").await.unwrap();
        });

        let summary = serve_session(&mut server, &store, &IngestConfig::default()).await;
        writer.await.unwrap();

        assert_eq!(summary.decode_errors, 1);
        assert_eq!(summary.batches, 1);
        assert_eq!(store.count(Kind::Temperature).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_idle_session_is_closed() {
        let store = ReadingStore::open_in_memory().await.unwrap();
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"TEMP 1:1\r\n").await.unwrap();

        let config = IngestConfig {
            idle_timeout_ms: 50,
            ..Default::default()
        };
        let summary = serve_session(&mut server, &store, &config).await;
        assert_eq!(summary.readings, 1);
        drop(client);
    }

    #[tokio::test]
    async fn test_quiet_sensor_stays_connected_by_default() {
        let store = ReadingStore::open_in_memory().await.unwrap();
        let (mut client, mut server) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            client.write_all(b"TEMP 1:1\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            client.write_all(b"TEMP 2:2\r\n").await.unwrap();
        });

        let summary = serve_session(&mut server, &store, &IngestConfig::default()).await;
        writer.await.unwrap();

        assert_eq!(summary.readings, 2);
        assert_eq!(summary.batches, 2);
        assert_eq!(store.count(Kind::Temperature).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_storage_fault_does_not_end_session() {
        let store = ReadingStore::open_in_memory().await.unwrap();
        store.close().await;
        let (mut client, mut server) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            client.write_all(b"TEMP 1:1\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"TEMP 2:2\r\n").await.unwrap();
        });

        let summary = serve_session(&mut server, &store, &IngestConfig::default()).await;
        writer.await.unwrap();

        assert_eq!(summary.storage_errors, 2);
        assert_eq!(summary.readings, 0);
        assert_eq!(summary.batches, 0);
    }

    #[tokio::test]
    async fn test_listener_accepts_next_sensor() {
        let store = Arc::new(ReadingStore::open_in_memory().await.unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(run_listener(listener, store.clone(), IngestConfig::default()));

        for (i, line) in [b"TEMP 1:10\r\n", b"TEMP 2:20\r\n"].iter().enumerate() {
            let mut sensor = TcpStream::connect(addr).await.unwrap();
            sensor.write_all(*line).await.unwrap();
            sensor.shutdown().await.unwrap();
            drop(sensor);

            let expected = (i + 1) as i64;
            for _ in 0..100 {
                if store.count(Kind::Temperature).await.unwrap() == expected {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            assert_eq!(store.count(Kind::Temperature).await.unwrap(), expected);
        }

        task.abort();
    }
}
