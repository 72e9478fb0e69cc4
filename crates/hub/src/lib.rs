//! SensorHub Server
//!
//! Binds the sensor, datagram and query sockets and runs their loops as
//! independent tasks over one shared reading store.

mod config;
mod logging;

pub use crate::config::{HubConfig, LoggingConfig, MetricsConfig, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use crate::logging::{init_logging, install_metrics};

use ingestion::DatagramGateway;
use query::QueryResponder;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{ReadingStore, StorageError};
use thiserror::Error;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Server errors
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Metrics exporter failed: {0}")]
    Metrics(String),

    #[error("Listener task exited unexpectedly")]
    LoopExited,

    #[error("Listener task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Bound sockets and the open store, ready to run
pub struct Hub {
    config: HubConfig,
    store: Arc<ReadingStore>,
    ingest: TcpListener,
    query: TcpListener,
    datagram: Option<UdpSocket>,
}

impl Hub {
    /// Open the store and bind every listener
    pub async fn bind(config: HubConfig) -> Result<Self, HubError> {
        let store = Arc::new(ReadingStore::open(&config.storage).await?);

        let ingest = bind_tcp(&config.ingest.listen).await?;
        let query = bind_tcp(&config.query.listen).await?;
        let datagram = if config.datagram.enabled {
            let addr = &config.datagram.listen;
            let socket = UdpSocket::bind(addr).await.map_err(|source| HubError::Bind {
                addr: addr.clone(),
                source,
            })?;
            Some(socket)
        } else {
            None
        };

        Ok(Self {
            config,
            store,
            ingest,
            query,
            datagram,
        })
    }

    /// Address of the TCP sensor listener
    pub fn ingest_addr(&self) -> std::io::Result<SocketAddr> {
        self.ingest.local_addr()
    }

    /// Address of the query listener
    pub fn query_addr(&self) -> std::io::Result<SocketAddr> {
        self.query.local_addr()
    }

    /// Address of the datagram gateway, when enabled
    pub fn datagram_addr(&self) -> Option<SocketAddr> {
        self.datagram.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Shared reading store
    pub fn store(&self) -> Arc<ReadingStore> {
        self.store.clone()
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> Result<(), HubError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes or a listener loop dies
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), HubError>
    where
        F: Future<Output = ()>,
    {
        let Hub {
            config,
            store,
            ingest,
            query,
            datagram,
        } = self;

        let mut tasks = JoinSet::new();
        tasks.spawn(ingestion::run_listener(ingest, store.clone(), config.ingest.clone()));

        let responder = Arc::new(QueryResponder::new(store.clone(), config.query.clone()));
        tasks.spawn(query::run_listener(query, responder));

        if let Some(socket) = datagram {
            let gateway = DatagramGateway::new(socket, store.clone(), config.datagram.clone());
            tasks.spawn(gateway.run());
        }

        let result = tokio::select! {
            _ = shutdown => {
                info!("Shutdown requested");
                Ok(())
            }
            Some(joined) = tasks.join_next() => match joined {
                Ok(()) => Err(HubError::LoopExited),
                Err(e) => Err(HubError::Task(e)),
            },
        };

        tasks.shutdown().await;
        store.close().await;
        result
    }
}

async fn bind_tcp(addr: &str) -> Result<TcpListener, HubError> {
    TcpListener::bind(addr).await.map_err(|source| HubError::Bind {
        addr: addr.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> HubConfig {
        let mut config = HubConfig::default();
        config.storage = storage::StoreConfig::in_memory();
        config.ingest.listen = "127.0.0.1:0".to_string();
        config.query.listen = "127.0.0.1:0".to_string();
        config.datagram.listen = "127.0.0.1:0".to_string();
        config
    }

    #[tokio::test]
    async fn test_bind_reports_addresses() {
        let hub = Hub::bind(local_config()).await.unwrap();
        assert_ne!(hub.ingest_addr().unwrap().port(), 0);
        assert_ne!(hub.query_addr().unwrap().port(), 0);
        assert!(hub.datagram_addr().is_some());
    }

    #[tokio::test]
    async fn test_datagram_can_be_disabled() {
        let mut config = local_config();
        config.datagram.enabled = false;
        let hub = Hub::bind(config).await.unwrap();
        assert!(hub.datagram_addr().is_none());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = local_config();
        config.query.listen = taken.local_addr().unwrap().to_string();

        let result = Hub::bind(config).await;
        assert!(matches!(result, Err(HubError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_hub() {
        let hub = Hub::bind(local_config()).await.unwrap();
        hub.run_until(async {}).await.unwrap();
    }
}
