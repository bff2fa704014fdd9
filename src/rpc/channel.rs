//! JSON-RPC channel to the planning service.
//!
//! [`RpcChannel`] is the seam between the planning client and the network.
//! [`JsonRpcChannel`] implements it over TCP using Content-Length framing.
//! A call owns its connection from request write until its response is
//! read. One idle connection is kept between calls; a call that finds it
//! taken by another in-flight call opens its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::config::{ChannelSecurity, ClientConfig};
use crate::rpc::framing::{read_message, write_message};
use crate::rpc::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Transport-level failures.
///
/// Any of these on a planner call means the call did not succeed; the
/// client forwards the message to its caller without retrying.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the planning service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] std::io::Error),

    /// No response arrived within the call deadline.
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Framing or envelope violation.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with a JSON-RPC error object.
    #[error("Server error {code}: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// I/O error on an established connection.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// The configured channel security has no transport in this build.
    #[error("Channel security '{0}' is not supported by this client")]
    UnsupportedSecurity(ChannelSecurity),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                TransportError::ConnectionFailed(err)
            }
            _ => TransportError::Io(err),
        }
    }
}

impl From<JsonRpcError> for TransportError {
    fn from(err: JsonRpcError) -> Self {
        TransportError::ServerError {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

/// A request/response channel to a single service instance.
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Invoke `method` with `params` and wait for its result.
    ///
    /// `deadline` bounds the whole call, connecting included; `None` waits
    /// until the server answers or the connection fails.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
        deadline: Option<Duration>,
    ) -> Result<serde_json::Value, TransportError>;
}

/// One established TCP connection.
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    /// Send a request and receive the matching response (no deadline).
    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let request_json = serde_json::to_string(request)
            .map_err(|e| TransportError::Protocol(format!("Failed to serialize request: {}", e)))?;

        write_message(&mut self.writer, &request_json)
            .await
            .map_err(|e| TransportError::Protocol(format!("Failed to send request: {:#}", e)))?;

        let response_json = read_message(&mut self.reader)
            .await
            .map_err(|e| TransportError::Protocol(format!("Failed to read response: {:#}", e)))?;

        let response: JsonRpcResponse = serde_json::from_str(&response_json)
            .map_err(|e| TransportError::Protocol(format!("Failed to parse response: {}", e)))?;

        match response.id {
            Some(id) if id == request.id => Ok(response),
            // Server could not read our id; its error object is still meaningful
            None if response.error.is_some() => Ok(response),
            other => Err(TransportError::Protocol(format!(
                "Response id {:?} does not match request id {}",
                other, request.id
            ))),
        }
    }
}

/// JSON-RPC 2.0 over TCP.
///
/// Connections are opened on demand. A finished call parks its connection
/// in the idle slot for the next one, unless the slot is already occupied.
/// After a transport fault (deadline, I/O, framing) the connection is
/// dropped, so no later call can read a stale response.
pub struct JsonRpcChannel {
    endpoint: String,
    security: ChannelSecurity,
    connect_timeout: Duration,
    /// Locked only to take or park a connection, never across a call.
    idle: Mutex<Option<Connection>>,
    /// Monotonically increasing JSON-RPC message id.
    request_id: AtomicU64,
}

impl JsonRpcChannel {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            security: config.security,
            connect_timeout: config.connect_timeout(),
            idle: Mutex::new(None),
            request_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn open(&self) -> Result<Connection, TransportError> {
        if self.security != ChannelSecurity::Insecure {
            return Err(TransportError::UnsupportedSecurity(self.security));
        }

        let stream = match timeout(self.connect_timeout, TcpStream::connect(&self.endpoint)).await {
            Ok(result) => result.map_err(TransportError::ConnectionFailed)?,
            Err(_) => {
                return Err(TransportError::ConnectionFailed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!(
                        "connecting to {} timed out after {:?}",
                        self.endpoint, self.connect_timeout
                    ),
                )))
            }
        };
        stream.set_nodelay(true)?;

        tracing::debug!(endpoint = %self.endpoint, "Connected to planning service");

        let (read_half, write_half) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Take the idle connection, or open a new one if another call holds it.
    async fn checkout(&self) -> Result<Connection, TransportError> {
        let parked = self.idle.lock().await.take();
        match parked {
            Some(connection) => Ok(connection),
            None => self.open().await,
        }
    }

    /// Park a healthy connection; a surplus one is closed.
    async fn checkin(&self, connection: Connection) {
        let mut idle = self.idle.lock().await;
        if idle.is_none() {
            *idle = Some(connection);
        }
    }

    async fn round_trip(&self, method: &str, request: &JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        let mut connection = self.checkout().await?;
        match connection.exchange(request).await {
            Ok(response) => {
                self.checkin(connection).await;
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    method,
                    error = %e,
                    "Dropping connection after transport fault"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RpcChannel for JsonRpcChannel {
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
        deadline: Option<Duration>,
    ) -> Result<serde_json::Value, TransportError> {
        let request = JsonRpcRequest::new(method, params, self.next_id());

        let response = match deadline {
            // An expired call drops its connection along with the future
            Some(limit) => match timeout(limit, self.round_trip(method, &request)).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        method,
                        deadline = ?limit,
                        "Abandoning call after its deadline"
                    );
                    return Err(TransportError::DeadlineExceeded(limit));
                }
            },
            None => self.round_trip(method, &request).await?,
        };

        process_response(response)
    }
}

/// Extract the result or error of a JSON-RPC response.
fn process_response(response: JsonRpcResponse) -> Result<serde_json::Value, TransportError> {
    if let Some(err) = response.error {
        return Err(err.into());
    }

    response
        .result
        .ok_or_else(|| TransportError::Protocol("Response missing both result and error".to_string()))
}
