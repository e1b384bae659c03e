//! Mock CDP implementations for testing
//!
//! `MockCdpClient` emulates a page with a single scrollable container so the
//! session and pipeline layers can be exercised without a running Chrome.

use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Mock CDP connection that acknowledges every command
#[derive(Debug, Default)]
pub struct MockCdpConnection;

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, _method: &str, _params: Value) -> Result<CdpResponse, Error> {
        Ok(CdpResponse {
            id: 1,
            result: Some(json!({})),
            error: None,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct MockClientState {
    url: String,
    scroll_top: i64,
    method_calls: Vec<String>,
    evaluated_scripts: Vec<String>,
}

/// Mock CDP client backed by a synthetic scrollable page
///
/// Scroll scripts mutate an internal offset, the geometry probe reads it
/// back, and screenshots are real PNGs sized to the configured viewport.
#[derive(Debug)]
pub struct MockCdpClient {
    scroll_height: i64,
    client_height: i64,
    viewport_width: i64,
    viewport_height: i64,
    state: Mutex<MockClientState>,
}

impl MockCdpClient {
    pub fn new() -> Self {
        Self::with_geometry(2600, 800, 390, 844)
    }

    pub fn with_geometry(
        scroll_height: i64,
        client_height: i64,
        viewport_width: i64,
        viewport_height: i64,
    ) -> Self {
        Self {
            scroll_height,
            client_height,
            viewport_width,
            viewport_height,
            state: Mutex::new(MockClientState {
                url: "about:blank".to_string(),
                scroll_top: 0,
                method_calls: Vec::new(),
                evaluated_scripts: Vec::new(),
            }),
        }
    }

    /// Methods invoked through call_method, in order
    pub fn method_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().method_calls.clone()
    }

    /// Scripts passed to evaluate, in order
    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.state.lock().unwrap().evaluated_scripts.clone()
    }

    /// Current synthetic scroll offset
    pub fn scroll_top(&self) -> i64 {
        self.state.lock().unwrap().scroll_top
    }

    fn max_scroll_top(&self) -> i64 {
        (self.scroll_height - self.client_height).max(0)
    }

    fn set_scroll_top(&self, state: &mut MockClientState, requested: i64) {
        state.scroll_top = requested.clamp(0, self.max_scroll_top());
    }

    fn geometry_value(&self, state: &MockClientState) -> Value {
        json!({
            "width": self.viewport_width,
            "height": self.viewport_height,
            "scrollHeight": self.scroll_height,
            "clientHeight": self.client_height,
            "scrollTop": state.scroll_top,
            "bodyScrollHeight": self.scroll_height,
            "documentScrollHeight": self.scroll_height,
            "devicePixelRatio": 3.0,
            "containerSelector": "detail-container__body",
            "hasScrollContainer": true,
        })
    }
}

impl Default for MockCdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::new(MockCdpConnection)
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        if url.contains("unreachable") {
            return Err(Error::navigation("net::ERR_NAME_NOT_RESOLVED"));
        }

        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.scroll_top = 0;

        Ok(NavigationResult {
            url: url.to_string(),
            status_code: 200,
        })
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult, Error> {
        let mut state = self.state.lock().unwrap();
        state.evaluated_scripts.push(script.to_string());

        if script.contains("devicePixelRatio") {
            return Ok(EvaluationResult::Object(self.geometry_value(&state)));
        }

        if script.contains("document.readyState") {
            return Ok(EvaluationResult::String("complete".to_string()));
        }

        if script.contains("document.title") {
            return Ok(EvaluationResult::String("Mock Page".to_string()));
        }

        if let Some(pos) = script.find("scrollTop = ") {
            let rest = &script[pos + "scrollTop = ".len()..];
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                let offset = digits.parse::<i64>().unwrap_or(0);
                self.set_scroll_top(&mut state, offset);
            } else {
                // Assignment from an expression means "scroll to the end"
                let max = self.max_scroll_top();
                self.set_scroll_top(&mut state, max);
            }
            return Ok(EvaluationResult::Null);
        }

        Ok(EvaluationResult::Null)
    }

    async fn screenshot(&self, _format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        let shade = {
            let state = self.state.lock().unwrap();
            (state.scroll_top % 256) as u8
        };

        let img = image::RgbaImage::from_pixel(
            self.viewport_width as u32,
            self.viewport_height as u32,
            image::Rgba([shade, shade, shade, 255]),
        );

        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.method_calls.push(format!("{}.enable", domain));
        Ok(())
    }

    async fn call_method(&self, method: &str, params: Value) -> Result<Value, Error> {
        let mut state = self.state.lock().unwrap();
        state.method_calls.push(method.to_string());

        match method {
            "Input.dispatchKeyEvent" => {
                match params.get("key").and_then(|k| k.as_str()) {
                    Some("End") => {
                        let max = self.max_scroll_top();
                        self.set_scroll_top(&mut state, max);
                    }
                    Some("Home") => self.set_scroll_top(&mut state, 0),
                    _ => {}
                }
            }
            "Input.dispatchMouseEvent" => {
                if params.get("type").and_then(|t| t.as_str()) == Some("mouseWheel") {
                    let delta = params.get("deltaY").and_then(|d| d.as_i64()).unwrap_or(0);
                    let current = state.scroll_top;
                    self.set_scroll_top(&mut state, current + delta);
                }
            }
            _ => {}
        }

        Ok(json!({}))
    }
}

/// Mock CDP browser that hands out `MockCdpClient` instances
#[derive(Debug, Default)]
pub struct MockCdpBrowser {
    next_target: AtomicU64,
    clients: Mutex<Vec<Arc<MockCdpClient>>>,
}

impl MockCdpBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clients created so far, in creation order
    pub fn clients(&self) -> Vec<Arc<MockCdpClient>> {
        self.clients.lock().unwrap().clone()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_client(&self, _target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        let client = Arc::new(MockCdpClient::new());
        self.clients.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }

    async fn create_target(&self, _url: &str) -> Result<String, Error> {
        let n = self.next_target.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ws://mock/devtools/page/target-{}", n))
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "MockChrome/120.0".to_string(),
            user_agent: "MockChrome".to_string(),
        })
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scroll_script_moves_offset() {
        let client = MockCdpClient::new();

        let result = client
            .evaluate("scrollContainer.scrollTop = 500;", false)
            .await
            .unwrap();
        assert!(matches!(result, EvaluationResult::Null));
        assert_eq!(client.scroll_top(), 500);

        // Offsets clamp to the scrollable extent (2600 - 800)
        client
            .evaluate("scrollContainer.scrollTop = 99999;", false)
            .await
            .unwrap();
        assert_eq!(client.scroll_top(), 1800);
    }

    #[tokio::test]
    async fn test_geometry_reflects_offset() {
        let client = MockCdpClient::new();
        client
            .evaluate("scrollContainer.scrollTop = 700;", false)
            .await
            .unwrap();

        let result = client
            .evaluate("({devicePixelRatio: window.devicePixelRatio})", false)
            .await
            .unwrap();
        let obj = result.as_object().unwrap();
        assert_eq!(obj["scrollTop"], 700);
        assert_eq!(obj["scrollHeight"], 2600);
    }

    #[tokio::test]
    async fn test_navigate_failure() {
        let client = MockCdpClient::new();
        let err = client.navigate("https://unreachable.invalid/").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_screenshot_is_valid_png() {
        let client = MockCdpClient::new();
        let bytes = client.screenshot(ScreenshotFormat::Png).await.unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), 390);
        assert_eq!(img.height(), 844);
    }
}
