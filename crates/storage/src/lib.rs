//! Storage Layer
//!
//! Durable, kind-partitioned SQLite tables for sensor readings. Writes are
//! append-only batches committed in a single transaction; reads scan a
//! table ordered by time, newest first.

mod repository;

pub use repository::{ReadingStore, StoreConfig};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
