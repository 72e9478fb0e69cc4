//! Connection Handling

use crate::config::QueryConfig;
use crate::formatter::ResponseFormatter;
use crate::request::{parse_request_line, route};
use crate::response::Response;
use crate::QueryError;
use sensor_protocol::Kind;
use std::sync::Arc;
use std::time::Duration;
use storage::ReadingStore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Answers one request per connection from the reading store
pub struct QueryResponder {
    store: Arc<ReadingStore>,
    formatter: Arc<dyn ResponseFormatter>,
    config: QueryConfig,
}

impl QueryResponder {
    /// Create a responder using the formatter named in `config`
    pub fn new(store: Arc<ReadingStore>, config: QueryConfig) -> Self {
        let formatter = config.format.formatter();
        Self::with_formatter(store, config, formatter)
    }

    /// Create a responder with a custom formatter
    pub fn with_formatter(
        store: Arc<ReadingStore>,
        config: QueryConfig,
        formatter: Arc<dyn ResponseFormatter>,
    ) -> Self {
        Self {
            store,
            formatter,
            config,
        }
    }

    /// Build the response for a raw request
    pub async fn respond(&self, raw: &str) -> Response {
        let Some(kind) = parse_request_line(raw).as_ref().and_then(route) else {
            debug!("Unmatched request: {:?}", raw.lines().next().unwrap_or_default());
            return Response::NotFound;
        };

        match self.render(kind).await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to answer {} query: {}", kind, e);
                Response::NotFound
            }
        }
    }

    async fn render(&self, kind: Kind) -> Result<Response, QueryError> {
        let readings = self.store.query(kind).await?;
        let body = self.formatter.render(kind, &readings)?;
        debug!("Serving {} {} readings", readings.len(), kind);
        Ok(Response::ok(self.formatter.content_type(), body))
    }

    /// Read one request, write one response, close
    pub async fn handle_connection<S>(&self, mut stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let response = match self.read_request(&mut stream).await {
            Some(raw) => self.respond(&raw).await,
            None => Response::NotFound,
        };

        let status = response.status().code();
        metrics::counter!("sensorhub_queries_total", "status" => status.to_string()).increment(1);

        // Client may already be gone; nothing to report in that case
        if let Err(e) = stream.write_all(&response.to_bytes()).await {
            debug!("Client went away before the response was written: {}", e);
            return;
        }
        if let Err(e) = stream.shutdown().await {
            debug!("Client closed first: {}", e);
        }
    }

    /// Read until the first line is complete, the size limit, EOF or timeout
    async fn read_request<S>(&self, stream: &mut S) -> Option<String>
    where
        S: AsyncRead + Unpin,
    {
        let limit = self.config.max_request_bytes.max(1);
        let mut raw = Vec::with_capacity(limit.min(1024));
        let mut buf = [0u8; 1024];

        let read_line = async {
            while raw.len() < limit && !raw.contains(&b'\n') {
                match stream.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => raw.extend_from_slice(&buf[..n]),
                    Err(e) => {
                        debug!("Failed to read request: {}", e);
                        break;
                    }
                }
            }
        };

        if tokio::time::timeout(self.config.read_timeout(), read_line).await.is_err() {
            warn!("Request not received within {:?}", self.config.read_timeout());
            return None;
        }

        Some(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// Accept query clients forever, one task per connection
pub async fn run_listener(listener: TcpListener, responder: Arc<QueryResponder>) {
    match listener.local_addr() {
        Ok(addr) => info!("Serving queries on {}", addr),
        Err(e) => warn!("Query listener has no local address: {}", e),
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Query client connected from {}", peer);
                let responder = responder.clone();
                tokio::spawn(async move {
                    responder.handle_connection(stream).await;
                });
            }
            Err(e) => {
                warn!("Failed to accept query connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
