//! CDP WebSocket connection implementation
//!
//! This module provides WebSocket-based connection to Chrome DevTools Protocol.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpResponse};
use super::types::{CdpNotification, CdpRequest, CdpRpcResponse};
use crate::Error;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type PendingMap = std::collections::HashMap<u64, PendingCommand>;

/// CDP timeout configuration
#[derive(Debug, Clone)]
struct CdpTimeoutConfig {
    /// Default timeout for most commands (seconds)
    default_timeout_secs: u64,
    /// Timeout for screenshot commands (seconds)
    screenshot_timeout_secs: u64,
    /// Timeout for page navigation commands (seconds)
    navigation_timeout_secs: u64,
}

impl Default for CdpTimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            screenshot_timeout_secs: 90,
            navigation_timeout_secs: 60,
        }
    }
}

impl CdpTimeoutConfig {
    /// Get timeout duration for a specific command method
    fn get_timeout_for_command(&self, method: &str) -> tokio::time::Duration {
        let method_lower = method.to_lowercase();

        // Screenshot commands need longer timeout
        if method_lower.contains("screenshot") || method_lower.contains("capture") {
            return tokio::time::Duration::from_secs(self.screenshot_timeout_secs);
        }

        if method_lower.contains("navigate") || method_lower.contains("reload") {
            return tokio::time::Duration::from_secs(self.navigation_timeout_secs);
        }

        tokio::time::Duration::from_secs(self.default_timeout_secs)
    }
}

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: tokio::sync::oneshot::Sender<CdpResponse>,
    /// Command method (for logging)
    method: String,
}

/// CDP WebSocket connection implementation
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// WebSocket stream
    ws_stream: Arc<Mutex<Option<WsStream>>>,
    /// Next command ID
    next_id: Arc<AtomicU64>,
    /// Pending commands (ID -> response sender)
    pending_commands: Arc<Mutex<PendingMap>>,
    /// Is connection active
    is_active: Arc<AtomicBool>,
    /// Timeout configuration
    timeout_config: CdpTimeoutConfig,
}

impl CdpWebSocketConnection {
    /// Create a new CDP WebSocket connection
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    pub async fn new<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Creating CDP WebSocket connection to {}", url);

        let connection = Arc::new(Self {
            url,
            ws_stream: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(1)),
            pending_commands: Arc::new(Mutex::new(PendingMap::new())),
            is_active: Arc::new(AtomicBool::new(false)),
            timeout_config: CdpTimeoutConfig::default(),
        });

        connection.connect().await?;

        Ok(connection)
    }

    /// Establish WebSocket connection and spawn the message loop
    async fn connect(&self) -> Result<(), Error> {
        debug!("Connecting to WebSocket: {}", self.url);

        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect: {}", e)))?;

        {
            let mut stream_guard = self.ws_stream.lock().await;
            *stream_guard = Some(ws_stream);
        }
        self.is_active.store(true, Ordering::SeqCst);

        info!("WebSocket connection established");

        let ws_stream = Arc::clone(&self.ws_stream);
        let pending_commands = Arc::clone(&self.pending_commands);
        let is_active = Arc::clone(&self.is_active);

        tokio::spawn(async move {
            if let Err(e) = Self::message_loop(ws_stream, pending_commands, is_active).await {
                error!("Message loop error: {}", e);
            }
            debug!("Message loop task exited");
        });

        Ok(())
    }

    /// Message processing loop
    ///
    /// Uses try_lock with a short receive timeout so send_command can
    /// interleave writes on the same stream.
    async fn message_loop(
        ws_stream: Arc<Mutex<Option<WsStream>>>,
        pending_commands: Arc<Mutex<PendingMap>>,
        is_active: Arc<AtomicBool>,
    ) -> Result<(), Error> {
        while is_active.load(Ordering::SeqCst) {
            let mut stream_guard = match ws_stream.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    // Lock is held by send_command, yield and retry
                    tokio::task::yield_now().await;
                    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                    continue;
                }
            };

            let ws_stream_ref = match stream_guard.as_mut() {
                Some(stream) => stream,
                None => {
                    warn!("WebSocket stream not available");
                    drop(stream_guard);
                    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                    continue;
                }
            };

            let message_result = tokio::time::timeout(
                tokio::time::Duration::from_millis(100),
                ws_stream_ref.next(),
            )
            .await;

            // Release the stream lock before handling the message
            drop(stream_guard);

            match message_result {
                Ok(Some(Ok(Message::Text(text)))) => {
                    if let Err(e) = Self::handle_message(&text, &pending_commands).await {
                        error!("Error handling message: {}", e);
                    }
                }
                Ok(Some(Ok(Message::Close(_)))) => {
                    info!("WebSocket close frame received");
                    is_active.store(false, Ordering::SeqCst);
                    break;
                }
                Ok(Some(Ok(Message::Ping(data)))) => {
                    let mut stream_guard = ws_stream.lock().await;
                    if let Some(stream) = stream_guard.as_mut() {
                        if let Err(e) = stream.send(Message::Pong(data)).await {
                            error!("Failed to send pong: {}", e);
                        }
                    }
                }
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(e))) => {
                    let error_msg = e.to_string();
                    if error_msg.contains("ConnectionClosed")
                        || error_msg.contains("AlreadyClosed")
                        || error_msg.contains("connection closed")
                    {
                        warn!("WebSocket connection closed, deactivating");
                        is_active.store(false, Ordering::SeqCst);
                        break;
                    }
                    return Err(Error::websocket(format!("WebSocket error: {}", e)));
                }
                Ok(None) => {
                    warn!("WebSocket stream ended");
                    is_active.store(false, Ordering::SeqCst);
                    break;
                }
                Err(_) => {
                    // Receive timeout, loop again so senders can grab the lock
                }
            }
        }

        Ok(())
    }

    /// Route an incoming text frame to its pending command, if any
    async fn handle_message(
        text: &str,
        pending_commands: &Arc<Mutex<PendingMap>>,
    ) -> Result<(), Error> {
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            let mut pending = pending_commands.lock().await;
            if let Some(pending_cmd) = pending.remove(&response.id) {
                debug!(
                    "Received response for command {} ({})",
                    response.id, pending_cmd.method
                );
                let cdp_response = CdpResponse {
                    id: response.id,
                    result: Some(response.result),
                    error: response.error.map(|e| CdpErrorResponse {
                        code: e.code,
                        message: e.message,
                        data: e.data,
                    }),
                };
                let _ = pending_cmd.sender.send(cdp_response);
            } else {
                warn!("Received response for unknown command ID: {}", response.id);
            }
            return Ok(());
        }

        // Events are received but not routed; the pipeline is command/response only
        if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            debug!("Ignoring CDP event: {}", notification.method);
            return Ok(());
        }

        warn!("Unknown message format: {}", text);
        Ok(())
    }

    /// Send WebSocket message
    async fn send_message(&self, message: Message) -> Result<(), Error> {
        let mut stream_guard = self.ws_stream.lock().await;
        let ws_stream = stream_guard
            .as_mut()
            .ok_or_else(|| Error::websocket("WebSocket stream not available"))?;

        ws_stream
            .send(message)
            .await
            .map_err(|e| Error::websocket(format!("Failed to send message: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    /// Send a CDP command and wait for response
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
            session_id: None,
        };

        let json = serde_json::to_string(&request)
            .map_err(|e| Error::cdp(format!("Failed to serialize request: {}", e)))?;

        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = tokio::sync::oneshot::channel();

        {
            let mut pending = self.pending_commands.lock().await;
            pending.insert(
                id,
                PendingCommand {
                    sender,
                    method: method.to_string(),
                },
            );
        }

        self.send_message(Message::Text(json)).await?;

        let timeout_duration = self.timeout_config.get_timeout_for_command(method);

        match tokio::time::timeout(timeout_duration, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{} (code: {})",
                        error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::timeout(format!(
                "Command {} response channel closed",
                id
            ))),
            Err(_) => {
                // Clean up pending command
                let mut pending = self.pending_commands.lock().await;
                pending.remove(&id);
                Err(Error::timeout(format!("Command {} ({}) timed out", id, method)))
            }
        }
    }

    /// Close the connection
    async fn close(&self) -> Result<(), Error> {
        info!("Closing CDP WebSocket connection");

        self.is_active.store(false, Ordering::SeqCst);

        let mut stream_guard = self.ws_stream.lock().await;
        if let Some(ws_stream) = stream_guard.as_mut() {
            ws_stream
                .close(None)
                .await
                .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;
        }

        Ok(())
    }

    /// Check if connection is active
    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
