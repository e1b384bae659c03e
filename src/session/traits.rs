//! Session layer traits
//!
//! A page session exposes exactly the capabilities the capture pipeline
//! needs; everything CDP-specific stays behind the trait so the pipeline
//! can run against mock pages in tests.

use crate::pipeline::geometry::PageGeometry;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Scroll destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    /// Absolute top of the container
    Top,
    /// Absolute end of the container
    Bottom,
    /// Absolute offset in CSS pixels
    Offset(i64),
}

/// Key presses the pipeline dispatches as trusted input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Home,
    End,
}

impl Key {
    /// DOM key value
    pub fn dom_key(&self) -> &'static str {
        match self {
            Key::Home => "Home",
            Key::End => "End",
        }
    }

    /// DOM code value
    pub fn dom_code(&self) -> &'static str {
        match self {
            Key::Home => "Home",
            Key::End => "End",
        }
    }

    /// Windows virtual key code, required for non-printable keys
    pub fn virtual_key_code(&self) -> u32 {
        match self {
            Key::Home => 36,
            Key::End => 35,
        }
    }
}

/// Metadata observed when a page finished loading
#[derive(Debug, Clone)]
pub struct OpenedPage {
    /// URL after redirects
    pub final_url: String,
    /// HTTP status of the main document, best-effort (200 when the page
    /// does not expose navigation timing)
    pub http_status: u16,
    /// Document title
    pub title: String,
}

/// An open page with scripting, input, and capture capabilities
#[async_trait]
pub trait PageSession: Send + Sync + std::fmt::Debug {
    /// Session identifier (for logging)
    fn id(&self) -> &str;

    /// Sample the scroll geometry of the page's scrollable container
    async fn scroll_geometry(&self) -> Result<PageGeometry, crate::Error>;

    /// Scroll the container to a destination
    async fn set_scroll(&self, target: ScrollTarget) -> Result<(), crate::Error>;

    /// Dispatch a trusted key press to the page
    async fn press_key(&self, key: Key) -> Result<(), crate::Error>;

    /// Dispatch a mouse wheel scroll at the viewport center
    async fn wheel(&self, delta_y: i64) -> Result<(), crate::Error>;

    /// Capture the current viewport as a lossless PNG at `path`
    async fn screenshot_to(&self, path: &Path) -> Result<(), crate::Error>;

    /// Close the page
    async fn close(&self) -> Result<(), crate::Error>;

    /// Whether the page is still usable
    fn is_active(&self) -> bool;
}

/// Anything that can open a page session for a URL
///
/// Implemented by `BrowserSession`; mocks implement it to inject synthetic
/// pages or navigation failures into the pipeline.
#[async_trait]
pub trait PageOpener: Send + Sync {
    /// Open `url` in a fresh page and wait for it to load
    async fn open_page(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn PageSession>, OpenedPage), crate::Error>;
}
