//! CDP browser control implementation
//!
//! This module provides browser-level operations via CDP.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Browser WebSocket endpoint (e.g., "ws://localhost:9222")
    endpoint: String,
    /// Page load timeout handed to every client this controller creates
    page_load_timeout: Duration,
    /// Active connections (target_id -> connection)
    connections: Arc<tokio::sync::Mutex<std::collections::HashMap<String, Arc<dyn CdpConnection>>>>,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - Browser WebSocket endpoint (e.g., "ws://localhost:9222")
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint_str = endpoint.into();
        info!("Creating CDP browser controller for endpoint: {}", endpoint_str);
        Self {
            endpoint: endpoint_str,
            page_load_timeout: Duration::from_secs(30),
            connections: Arc::new(tokio::sync::Mutex::new(std::collections::HashMap::new())),
        }
    }

    /// Override the page load timeout for clients created by this controller
    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    /// Browser HTTP endpoint derived from the WebSocket endpoint
    fn http_endpoint(&self) -> String {
        self.endpoint
            .replace("ws://", "http://")
            .replace("wss://", "https://")
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    /// Create a new CDP client attached to a target WebSocket URL
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        info!("Creating CDP client for target: {}", target_url);

        let connection = CdpWebSocketConnection::new(target_url).await?;

        let target_id = target_url
            .rsplit('/')
            .next()
            .unwrap_or("unknown")
            .to_string();

        {
            let mut connections = self.connections.lock().await;
            connections.insert(target_id, Arc::clone(&connection) as Arc<dyn CdpConnection>);
        }

        let client =
            Arc::new(CdpClientImpl::new(connection).with_page_load_timeout(self.page_load_timeout));

        // Page and Runtime are the only domains every pipeline run needs;
        // anything else is enabled by the caller.
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    /// Create a new browser target (page) via the /json/new HTTP API
    ///
    /// Returns the WebSocket URL of the newly created target.
    async fn create_target(&self, url: &str) -> Result<String, Error> {
        info!("Creating new target with URL: {}", url);

        let new_url = format!("{}/json/new?{}", self.http_endpoint(), url);

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Creating new page via HTTP API: {}", new_url);

        let response = http_client.put(&new_url).send().await.map_err(|e| {
            Error::internal(format!(
                r#"Failed to connect to Chrome CDP endpoint at {}.
Please start Chrome with:
  macOS: /Applications/Google\ Chrome.app/Contents/MacOS/Google\ Chrome --remote-debugging-port=9222 --user-data-dir=/tmp/chrome-debug
  Linux: google-chrome --remote-debugging-port=9222 --user-data-dir=/tmp/chrome-debug
Original error: {}"#,
                self.endpoint, e
            ))
        })?;

        let response_text = response
            .text()
            .await
            .map_err(|e| Error::internal(format!("Failed to read response: {}", e)))?;

        let target_json: serde_json::Value = serde_json::from_str(&response_text).map_err(|e| {
            Error::internal(format!(
                "Failed to parse new target response: {} (response was: {})",
                e, response_text
            ))
        })?;

        let ws_url = target_json
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::internal("No webSocketDebuggerUrl in new target response"))?;

        debug!("Created new target with WebSocket URL: {}", ws_url);

        Ok(ws_url.to_string())
    }

    /// Get browser version
    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        let url = format!("{}/json/version", self.http_endpoint());
        debug!("Fetching browser version from {}", url);

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::internal(format!("Failed to connect to browser: {}", e)))?;

        let version_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::internal(format!("Failed to parse version: {}", e)))?;

        Ok(BrowserVersion {
            protocol_version: version_json
                .get("Protocol-Version")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            product: version_json
                .get("Browser")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            user_agent: version_json
                .get("User-Agent")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
        })
    }

    /// Close all connections held by this controller
    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;
        let connection_count = connections.len();

        if connection_count == 0 {
            debug!("No active connections to close");
            return Ok(());
        }

        info!("Closing {} active CDP connections", connection_count);

        for (target_id, connection) in connections.iter() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target_id, e);
            }
        }

        connections.clear();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_creation() {
        let browser = CdpBrowserImpl::new("ws://localhost:9222")
            .with_page_load_timeout(Duration::from_secs(10));
        assert_eq!(browser.endpoint, "ws://localhost:9222");
        assert_eq!(browser.page_load_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_endpoint_conversion() {
        let browser = CdpBrowserImpl::new("wss://remote.example.com:9222");
        assert_eq!(browser.http_endpoint(), "https://remote.example.com:9222");
    }
}
