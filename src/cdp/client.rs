//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for the
//! operations the screenshot pipeline needs.

use super::traits::*;
use super::types::{EvaluateParams, EvaluateResponse, NavigateParams};
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Main-document HTTP status via navigation timing; not every page exposes
/// it, so consumers treat the value as best-effort
const DOCUMENT_STATUS_SCRIPT: &str =
    "(performance.getEntriesByType('navigation')[0] || {}).responseStatus || 0";

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
    /// How long navigation may poll for document readiness
    page_load_timeout: Duration,
}

impl CdpClientImpl {
    /// Create a new CDP client
    ///
    /// # Arguments
    /// * `connection` - CDP connection instance
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self {
            connection,
            page_load_timeout: Duration::from_secs(30),
        }
    }

    /// Override the page load timeout
    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    /// Read the main document's HTTP status, defaulting to 200 when the
    /// page does not expose navigation timing
    async fn document_status(&self) -> u16 {
        match self.evaluate(DOCUMENT_STATUS_SCRIPT, false).await {
            Ok(result) => match result.as_number() {
                Some(status) if status >= 100.0 => status as u16,
                _ => 200,
            },
            Err(_) => 200,
        }
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &super::types::RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => {
                let value = obj
                    .value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                EvaluationResult::String(value)
            }
            "number" => {
                let value = obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
                EvaluationResult::Number(value)
            }
            "boolean" => {
                let value = obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false);
                EvaluationResult::Bool(value)
            }
            "undefined" | "null" => EvaluationResult::Null,
            "object" | "function" | "bigint" | "symbol" => {
                let value = obj.value.clone().unwrap_or(serde_json::Value::Null);
                EvaluationResult::Object(value)
            }
            other => {
                debug!("parse_remote_object: unknown type '{}', returning Null", other);
                EvaluationResult::Null
            }
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    /// Get the underlying connection
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
            referrer: None,
        };

        let result = self
            .call_method("Page.navigate", serde_json::to_value(params)?)
            .await?;

        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            if !error_text.is_empty() {
                return Err(Error::navigation(error_text.to_string()));
            }
        }

        // Wait for page load by polling document.readyState; more reliable
        // than event-based waiting because the load event may fire before
        // the listener is attached.
        let deadline = tokio::time::Instant::now() + self.page_load_timeout;
        let mut page_loaded = false;

        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;

            match self.evaluate("document.readyState", false).await {
                Ok(EvaluationResult::String(state)) if state == "complete" => {
                    debug!("Page loaded");
                    page_loaded = true;
                    break;
                }
                Ok(EvaluationResult::String(state)) => {
                    debug!("Document ready state: {}", state);
                }
                Ok(_) => {}
                Err(e) => {
                    // Page might not be ready yet, continue polling
                    debug!("Error checking ready state: {}", e);
                }
            }
        }

        if !page_loaded {
            return Err(Error::navigation(format!(
                "Page did not finish loading within {:?}",
                self.page_load_timeout
            )));
        }

        Ok(NavigationResult {
            url: result
                .get("frame")
                .and_then(|f| f.get("url"))
                .and_then(|u| u.as_str())
                .unwrap_or(url)
                .to_string(),
            status_code: self.document_status().await,
        })
    }

    /// Evaluate JavaScript in the page
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        };

        let result = self
            .call_method("Runtime.evaluate", serde_json::to_value(params)?)
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            return Err(Error::script_execution_failed(
                exception
                    .get("exception")
                    .and_then(|e| e.get("description"))
                    .and_then(|d| d.as_str())
                    .unwrap_or("Unknown error")
                    .to_string(),
            ));
        }

        // CDP response structure: {"result": {"result": {...}}}
        let eval_response: EvaluateResponse = serde_json::from_value(result)
            .map_err(|e| Error::cdp(format!("Failed to parse EvaluateResponse: {}", e)))?;

        Ok(Self::parse_remote_object(&eval_response.result))
    }

    /// Capture a screenshot of the current viewport
    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        let (format_str, quality) = match format {
            ScreenshotFormat::Png => ("png", None),
            ScreenshotFormat::Jpeg(q) => ("jpeg", Some(q)),
        };

        let mut params = serde_json::json!({
            "format": format_str,
        });

        if let Some(q) = quality {
            params["quality"] = serde_json::json!(q);
        }

        let result = self.call_method("Page.captureScreenshot", params).await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    /// Enable a domain
    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);

        let method = format!("{}.enable", domain);
        let _ = self.call_method(&method, serde_json::json!({})).await?;

        Ok(())
    }

    /// Call a raw CDP method
    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        debug!("Calling CDP method: {}", method);

        let response = self.connection().send_command(method, params).await?;

        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }
}
