//! Reading Store Implementation

use crate::StorageError;
use sensor_protocol::{Kind, Reading};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite connection URL (e.g. `sqlite://sensorhub.db` or `sqlite::memory:`)
    pub url: String,
    /// Pool size; in-memory databases always use a single connection
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sensorhub.db".to_string(),
            max_connections: 4,
        }
    }
}

impl StoreConfig {
    /// Config for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Durable store of readings, one table per kind
pub struct ReadingStore {
    pool: SqlitePool,
    /// Serializes appends across ingestion loops
    write_lock: Mutex<()>,
}

impl ReadingStore {
    /// Open (creating if missing) the database and its tables
    pub async fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        info!("Opening reading store at {}", config.url);

        let mut options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new();

        if config.is_memory() {
            // Every connection would otherwise see its own empty database
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            pool_options = pool_options.max_connections(config.max_connections.max(1));
        }

        let pool = pool_options.connect_with(options).await?;
        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.create_tables().await?;
        Ok(store)
    }

    /// Open a private in-memory store
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(&StoreConfig::in_memory()).await
    }

    async fn create_tables(&self) -> Result<(), StorageError> {
        for kind in Kind::ALL {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} (time INTEGER NOT NULL, value INTEGER NOT NULL)",
                kind.table()
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Append `(time, value)` samples of one kind as a single atomic batch
    pub async fn append(&self, kind: Kind, samples: &[(i64, i64)]) -> Result<(), StorageError> {
        let readings: Vec<Reading> = samples
            .iter()
            .map(|&(time, value)| Reading::new(kind, time, value))
            .collect();
        self.append_batch(&readings).await
    }

    /// Append a batch that may span both tables; all rows commit or none do
    pub async fn append_batch(&self, readings: &[Reading]) -> Result<(), StorageError> {
        if readings.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        for reading in readings {
            let sql = format!(
                "INSERT INTO {} (time, value) VALUES (?, ?)",
                reading.kind.table()
            );
            sqlx::query(&sql)
                .bind(reading.time)
                .bind(reading.value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Committed batch of {} readings", readings.len());
        Ok(())
    }

    /// All readings of a kind, newest `time` first
    pub async fn query(&self, kind: Kind) -> Result<Vec<Reading>, StorageError> {
        let sql = format!(
            "SELECT time, value FROM {} ORDER BY time DESC, rowid DESC",
            kind.table()
        );
        let rows = sqlx::query_as::<_, (i64, i64)>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(time, value)| Reading::new(kind, time, value))
            .collect())
    }

    /// Number of stored readings of a kind
    pub async fn count(&self, kind: Kind) -> Result<i64, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        info!("Closing reading store");
        self.pool.close().await;
    }
}
