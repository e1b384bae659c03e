//! CDP-backed page session

use super::scripts;
use super::traits::{Key, PageSession, ScrollTarget};
use crate::cdp::{CdpClient, EvaluationResult, ScreenshotFormat};
use crate::Error;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Page session driving a real Chrome tab over CDP
#[derive(Debug)]
pub struct CdpPageSession {
    id: String,
    cdp_client: Arc<dyn CdpClient>,
    active: AtomicBool,
}

impl CdpPageSession {
    pub fn new<S: Into<String>>(id: S, cdp_client: Arc<dyn CdpClient>) -> Self {
        Self {
            id: id.into(),
            cdp_client,
            active: AtomicBool::new(true),
        }
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(Error::capture("Page session is closed"));
        }
        Ok(())
    }

    fn pick_number(value: &serde_json::Value, field: &str) -> Result<i64, Error> {
        value
            .get(field)
            .and_then(|v| v.as_f64())
            .map(|n| n.round() as i64)
            .ok_or_else(|| Error::cdp(format!("Geometry probe missing field '{}'", field)))
    }

    fn parse_geometry(
        value: &serde_json::Value,
    ) -> Result<crate::pipeline::geometry::PageGeometry, Error> {
        Ok(crate::pipeline::geometry::PageGeometry {
            viewport_width: Self::pick_number(value, "width")?,
            viewport_height: Self::pick_number(value, "height")?,
            scroll_height: Self::pick_number(value, "scrollHeight")?,
            client_height: Self::pick_number(value, "clientHeight")?,
            scroll_top: Self::pick_number(value, "scrollTop")?,
            body_scroll_height: Self::pick_number(value, "bodyScrollHeight")?,
            document_scroll_height: Self::pick_number(value, "documentScrollHeight")?,
            device_pixel_ratio: value
                .get("devicePixelRatio")
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0),
            container_selector: value
                .get("containerSelector")
                .and_then(|v| v.as_str())
                .unwrap_or("BODY")
                .to_string(),
            uses_inner_container: value
                .get("hasScrollContainer")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}

#[async_trait]
impl PageSession for CdpPageSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn scroll_geometry(&self) -> Result<crate::pipeline::geometry::PageGeometry, Error> {
        self.ensure_active()?;

        let result = self
            .cdp_client
            .evaluate(scripts::GEOMETRY_SCRIPT, false)
            .await?;

        let value = result
            .as_object()
            .ok_or_else(|| Error::cdp("Geometry probe did not return an object"))?;

        let geometry = Self::parse_geometry(value)?;
        debug!(
            session_id = %self.id,
            scroll_height = geometry.scroll_height,
            scroll_top = geometry.scroll_top,
            container = %geometry.container_selector,
            "Sampled scroll geometry"
        );

        Ok(geometry)
    }

    async fn set_scroll(&self, target: ScrollTarget) -> Result<(), Error> {
        self.ensure_active()?;

        let script = match target {
            ScrollTarget::Top => scripts::scroll_to_script(0),
            ScrollTarget::Bottom => scripts::scroll_to_bottom_script(),
            ScrollTarget::Offset(offset) => scripts::scroll_to_script(offset.max(0)),
        };

        self.cdp_client.evaluate(&script, false).await?;
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<(), Error> {
        self.ensure_active()?;

        for event_type in ["rawKeyDown", "keyUp"] {
            self.cdp_client
                .call_method(
                    "Input.dispatchKeyEvent",
                    json!({
                        "type": event_type,
                        "key": key.dom_key(),
                        "code": key.dom_code(),
                        "windowsVirtualKeyCode": key.virtual_key_code(),
                        "nativeVirtualKeyCode": key.virtual_key_code(),
                    }),
                )
                .await?;
        }

        Ok(())
    }

    async fn wheel(&self, delta_y: i64) -> Result<(), Error> {
        self.ensure_active()?;

        // Dispatch at the viewport center so the event lands on the
        // scrollable container rather than a fixed header.
        self.cdp_client
            .call_method(
                "Input.dispatchMouseEvent",
                json!({
                    "type": "mouseWheel",
                    "x": 195,
                    "y": 422,
                    "deltaX": 0,
                    "deltaY": delta_y,
                }),
            )
            .await?;

        Ok(())
    }

    async fn screenshot_to(&self, path: &Path) -> Result<(), Error> {
        self.ensure_active()?;

        let data = self.cdp_client.screenshot(ScreenshotFormat::Png).await?;
        tokio::fs::write(path, data).await?;

        debug!(session_id = %self.id, path = %path.display(), "Persisted viewport frame");
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Page.close tears down the tab; the connection close is best-effort
        let _ = self.cdp_client.call_method("Page.close", json!({})).await;
        let _ = self.cdp_client.connection().close().await;

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Read the document title via the session's CDP client
pub(crate) async fn read_title(cdp_client: &Arc<dyn CdpClient>) -> String {
    match cdp_client.evaluate(scripts::TITLE_SCRIPT, false).await {
        Ok(EvaluationResult::String(title)) => title,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::MockCdpClient;

    fn session() -> (Arc<MockCdpClient>, CdpPageSession) {
        let client = Arc::new(MockCdpClient::new());
        let session = CdpPageSession::new("test-session", Arc::clone(&client) as Arc<dyn CdpClient>);
        (client, session)
    }

    #[tokio::test]
    async fn test_scroll_geometry_parses_probe() {
        let (_, session) = session();
        let geometry = session.scroll_geometry().await.unwrap();

        assert_eq!(geometry.scroll_height, 2600);
        assert_eq!(geometry.client_height, 800);
        assert_eq!(geometry.viewport_width, 390);
        assert!(geometry.uses_inner_container);
    }

    #[tokio::test]
    async fn test_set_scroll_offset_round_trips() {
        let (client, session) = session();

        session.set_scroll(ScrollTarget::Offset(500)).await.unwrap();
        assert_eq!(client.scroll_top(), 500);

        let geometry = session.scroll_geometry().await.unwrap();
        assert_eq!(geometry.scroll_top, 500);

        session.set_scroll(ScrollTarget::Top).await.unwrap();
        assert_eq!(client.scroll_top(), 0);
    }

    #[tokio::test]
    async fn test_press_end_scrolls_to_bottom() {
        let (client, session) = session();

        session.press_key(Key::End).await.unwrap();
        assert_eq!(client.scroll_top(), 1800); // 2600 - 800

        session.press_key(Key::Home).await.unwrap();
        assert_eq!(client.scroll_top(), 0);

        let calls = client.method_calls();
        assert!(calls.iter().any(|m| m == "Input.dispatchKeyEvent"));
    }

    #[tokio::test]
    async fn test_wheel_nudges_offset() {
        let (client, session) = session();

        session.wheel(250).await.unwrap();
        assert_eq!(client.scroll_top(), 250);
    }

    #[tokio::test]
    async fn test_screenshot_to_writes_png() {
        let (_, session) = session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        session.screenshot_to(&path).await.unwrap();

        let (width, height) = image::image_dimensions(&path).unwrap();
        assert_eq!((width, height), (390, 844));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_operations() {
        let (_, session) = session();
        session.close().await.unwrap();

        assert!(!session.is_active());
        assert!(session.scroll_geometry().await.is_err());
        assert!(session.set_scroll(ScrollTarget::Top).await.is_err());
    }
}
