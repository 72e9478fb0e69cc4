//! Chunk Decoding into Batches

use sensor_protocol::{decode_line, Frame, ProtocolError, Reading};
use storage::{ReadingStore, StorageError};
use tracing::{debug, warn};

/// Everything decoded from one inbound chunk
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChunkBatch {
    /// Readings to commit together, in wire order
    pub readings: Vec<Reading>,
    /// Lines dropped because they failed to decode
    pub decode_errors: usize,
    /// Liveness lines seen
    pub alive: usize,
    /// Handshake requests seen
    pub handshakes: usize,
    /// Lines that matched no keyword
    pub ignored: usize,
}

impl ChunkBatch {
    /// Decode a chunk's framed lines; bad lines are counted and dropped
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ProtocolError>>,
    {
        let mut batch = Self::default();
        for line in lines {
            match line.and_then(|line| decode_line(&line)) {
                Ok(Frame::Data(readings)) => batch.readings.extend(readings),
                Ok(Frame::Alive) => batch.alive += 1,
                Ok(Frame::Handshake) => batch.handshakes += 1,
                Ok(Frame::Ignored) => batch.ignored += 1,
                Err(e) => {
                    warn!("Dropping malformed sensor line: {}", e);
                    batch.decode_errors += 1;
                }
            }
        }

        if batch.decode_errors > 0 {
            metrics::counter!("sensorhub_decode_errors_total")
                .increment(batch.decode_errors as u64);
        }
        batch
    }

    /// Whether there is anything to persist
    pub fn has_readings(&self) -> bool {
        !self.readings.is_empty()
    }

    /// Commit the readings as one atomic batch
    pub async fn commit(&self, store: &ReadingStore) -> Result<(), StorageError> {
        if !self.has_readings() {
            return Ok(());
        }

        store.append_batch(&self.readings).await?;

        for reading in &self.readings {
            metrics::counter!("sensorhub_readings_ingested_total", "kind" => reading.kind.as_str())
                .increment(1);
        }
        debug!("Committed {} readings", self.readings.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_protocol::{Kind, LineFramer};

    fn batch_of(input: &[u8]) -> ChunkBatch {
        let mut framer = LineFramer::new();
        let mut lines = framer.push(input);
        lines.extend(framer.finish());
        ChunkBatch::from_lines(lines)
    }

    #[test]
    fn test_mixed_chunk() {
        let batch = batch_of(b"TEMP 1:20\r\nALIVE\r\nHUMID 1:60 2:61\r\nTEMP abc:xyz\r\nNOISE\r\n");
        assert_eq!(
            batch.readings,
            vec![
                Reading::new(Kind::Temperature, 1, 20),
                Reading::new(Kind::Humidity, 1, 60),
                Reading::new(Kind::Humidity, 2, 61),
            ]
        );
        assert_eq!(batch.alive, 1);
        assert_eq!(batch.decode_errors, 1);
        assert_eq!(batch.ignored, 1);
    }

    #[test]
    fn test_alive_only_chunk_has_nothing_to_commit() {
        let batch = batch_of(b"ALIVE\r\n");
        assert!(!batch.has_readings());
        assert_eq!(batch.decode_errors, 0);
    }

    #[tokio::test]
    async fn test_commit_persists_readings() {
        let store = ReadingStore::open_in_memory().await.unwrap();
        let batch = batch_of(b"HUMID 5:70\r\n");
        batch.commit(&store).await.unwrap();
        assert_eq!(store.count(Kind::Humidity).await.unwrap(), 1);
    }
}
