//! Mock page sessions for pipeline testing
//!
//! `MockPageSession` models a synthetic scrollable container whose scroll
//! behavior (clamping, stalling) is configurable, and writes real PNG
//! frames so the stitcher can operate on its output.

use super::traits::{Key, OpenedPage, PageOpener, PageSession, ScrollTarget};
use crate::pipeline::geometry::PageGeometry;
use crate::Error;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Scroll behavior of the synthetic container
#[derive(Debug, Clone)]
pub struct MockPageBehavior {
    pub scroll_height: i64,
    pub client_height: i64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Clamp offsets to `scroll_height - client_height` like a plain
    /// overflow container; virtual scrollers report requested offsets as-is
    pub clamp_to_content: bool,
    /// Offset the container refuses to scroll past (sticky overlay pages)
    pub stall_at: Option<i64>,
}

impl Default for MockPageBehavior {
    fn default() -> Self {
        Self {
            scroll_height: 2600,
            client_height: 800,
            viewport_width: 390,
            viewport_height: 844,
            clamp_to_content: true,
            stall_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct MockPageState {
    scroll_top: i64,
    frames_written: Vec<PathBuf>,
    key_presses: Vec<Key>,
    wheel_deltas: Vec<i64>,
    closed: bool,
}

/// Synthetic page session
#[derive(Debug)]
pub struct MockPageSession {
    behavior: MockPageBehavior,
    state: Mutex<MockPageState>,
}

impl MockPageSession {
    pub fn new(behavior: MockPageBehavior) -> Self {
        Self {
            behavior,
            state: Mutex::new(MockPageState::default()),
        }
    }

    pub fn frames_written(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().frames_written.clone()
    }

    pub fn key_presses(&self) -> Vec<Key> {
        self.state.lock().unwrap().key_presses.clone()
    }

    pub fn wheel_deltas(&self) -> Vec<i64> {
        self.state.lock().unwrap().wheel_deltas.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn settle_offset(&self, requested: i64) -> i64 {
        let mut offset = requested.max(0);
        if self.behavior.clamp_to_content {
            let max = (self.behavior.scroll_height - self.behavior.client_height).max(0);
            offset = offset.min(max);
        }
        if let Some(stall) = self.behavior.stall_at {
            offset = offset.min(stall);
        }
        offset
    }

    fn end_offset(&self) -> i64 {
        if self.behavior.clamp_to_content {
            (self.behavior.scroll_height - self.behavior.client_height).max(0)
        } else {
            self.behavior.scroll_height
        }
    }
}

#[async_trait]
impl PageSession for MockPageSession {
    fn id(&self) -> &str {
        "mock-page"
    }

    async fn scroll_geometry(&self) -> Result<PageGeometry, Error> {
        let state = self.state.lock().unwrap();
        Ok(PageGeometry {
            viewport_width: self.behavior.viewport_width as i64,
            viewport_height: self.behavior.viewport_height as i64,
            scroll_height: self.behavior.scroll_height,
            client_height: self.behavior.client_height,
            scroll_top: state.scroll_top,
            body_scroll_height: self.behavior.scroll_height,
            document_scroll_height: self.behavior.scroll_height,
            device_pixel_ratio: 3.0,
            container_selector: "detail-container__body".to_string(),
            uses_inner_container: true,
        })
    }

    async fn set_scroll(&self, target: ScrollTarget) -> Result<(), Error> {
        let requested = match target {
            ScrollTarget::Top => 0,
            ScrollTarget::Bottom => self.end_offset(),
            ScrollTarget::Offset(offset) => offset,
        };

        let mut state = self.state.lock().unwrap();
        state.scroll_top = self.settle_offset(requested);
        debug!(requested, observed = state.scroll_top, "Mock scroll");
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<(), Error> {
        let target = match key {
            Key::Home => 0,
            Key::End => self.end_offset(),
        };

        let mut state = self.state.lock().unwrap();
        state.key_presses.push(key);
        state.scroll_top = self.settle_offset(target);
        Ok(())
    }

    async fn wheel(&self, delta_y: i64) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.wheel_deltas.push(delta_y);
        // Wheel nudges settle to where the programmatic scroll already
        // landed; pages that need the nudge are modeled via stall_at
        Ok(())
    }

    async fn screenshot_to(&self, path: &Path) -> Result<(), Error> {
        let shade = {
            let state = self.state.lock().unwrap();
            (state.scroll_top % 256) as u8
        };

        let img = image::RgbaImage::from_pixel(
            self.behavior.viewport_width,
            self.behavior.viewport_height,
            image::Rgba([shade, shade.wrapping_add(40), shade.wrapping_add(80), 255]),
        );
        img.save(path)?;

        self.state
            .lock()
            .unwrap()
            .frames_written
            .push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.state.lock().unwrap().closed
    }
}

/// Page opener that serves a prepared mock page or a scripted failure
#[derive(Debug)]
pub struct MockPageOpener {
    page: Option<Arc<MockPageSession>>,
    navigation_error: Option<String>,
    open_delay: Duration,
    opened_urls: Mutex<Vec<String>>,
}

impl MockPageOpener {
    pub fn serving(page: Arc<MockPageSession>) -> Self {
        Self {
            page: Some(page),
            navigation_error: None,
            open_delay: Duration::ZERO,
            opened_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing<S: Into<String>>(reason: S) -> Self {
        Self {
            page: None,
            navigation_error: Some(reason.into()),
            open_delay: Duration::ZERO,
            opened_urls: Mutex::new(Vec::new()),
        }
    }

    /// Opener that hangs for `delay` before producing anything, modeling a
    /// page that never finishes loading
    pub fn stalling(delay: Duration) -> Self {
        Self {
            page: None,
            navigation_error: None,
            open_delay: delay,
            opened_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.opened_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageOpener for MockPageOpener {
    async fn open_page(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn PageSession>, OpenedPage), Error> {
        self.opened_urls.lock().unwrap().push(url.to_string());

        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        if let Some(reason) = &self.navigation_error {
            return Err(Error::navigation(reason.clone()));
        }

        let page = self
            .page
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| Error::navigation("No page configured"))?;

        let opened = OpenedPage {
            final_url: url.to_string(),
            http_status: 200,
            title: "Mock Page".to_string(),
        };

        Ok((page as Arc<dyn PageSession>, opened))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clamped_container_limits_offset() {
        let page = MockPageSession::new(MockPageBehavior::default());
        page.set_scroll(ScrollTarget::Offset(5000)).await.unwrap();

        let geometry = page.scroll_geometry().await.unwrap();
        assert_eq!(geometry.scroll_top, 1800); // 2600 - 800
    }

    #[tokio::test]
    async fn test_virtual_container_reports_requested_offset() {
        let page = MockPageSession::new(MockPageBehavior {
            clamp_to_content: false,
            ..MockPageBehavior::default()
        });
        page.set_scroll(ScrollTarget::Offset(2500)).await.unwrap();

        let geometry = page.scroll_geometry().await.unwrap();
        assert_eq!(geometry.scroll_top, 2500);

        page.set_scroll(ScrollTarget::Bottom).await.unwrap();
        let geometry = page.scroll_geometry().await.unwrap();
        assert_eq!(geometry.scroll_top, 2600);
    }

    #[tokio::test]
    async fn test_stalled_container_never_passes_limit() {
        let page = MockPageSession::new(MockPageBehavior {
            stall_at: Some(700),
            ..MockPageBehavior::default()
        });

        page.set_scroll(ScrollTarget::Offset(1200)).await.unwrap();
        assert_eq!(page.scroll_geometry().await.unwrap().scroll_top, 700);

        page.press_key(Key::End).await.unwrap();
        assert_eq!(page.scroll_geometry().await.unwrap().scroll_top, 700);
    }

    #[tokio::test]
    async fn test_failing_opener_reports_navigation_error() {
        let opener = MockPageOpener::failing("net::ERR_CONNECTION_REFUSED");
        let result = opener.open_page("https://example.com/").await;
        assert!(matches!(result, Err(Error::Navigation(_))));
    }
}
