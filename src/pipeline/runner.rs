//! Run orchestration
//!
//! One `Pipeline` value serves the whole process. Runs are serialized with
//! an internal lock because they share the browser viewport; overlapping
//! scroll passes would corrupt each other's captures.

use super::scroll::{ScrollDriver, ScrollOutcome, ScrollTunables};
use super::stitch::stitch;
use crate::config::Config;
use crate::session::{OpenedPage, PageOpener, PageSession};
use crate::Error;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Terminal result of one long-screenshot request
///
/// Failures are data, not errors: callers always get an outcome and decide
/// how to surface `error`, which carries a machine-readable tag.
#[derive(Debug, Clone, Serialize)]
pub struct LongScreenshotOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub screenshot_count: usize,
    pub total_height: u32,
    pub file_size_bytes: u64,
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LongScreenshotOutcome {
    fn failure(url: &str, error: &Error) -> Self {
        Self {
            success: false,
            output_path: None,
            screenshot_count: 0,
            total_height: 0,
            file_size_bytes: 0,
            original_url: url.to_string(),
            current_url: None,
            title: None,
            error: Some(error.kind().to_string()),
        }
    }
}

/// Scroll-capture-and-stitch pipeline
pub struct Pipeline {
    output_dir: PathBuf,
    output_prefix: String,
    crop_bottom_pixels: u32,
    page_open_timeout: Duration,
    tunables: ScrollTunables,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        let tunables = ScrollTunables {
            scroll_step: config.scroll_step,
            max_frames: config.max_frames,
            ..ScrollTunables::default()
        };

        Self::with_parts(
            PathBuf::from(&config.output_dir),
            config.crop_bottom_pixels,
            Duration::from_secs(config.screenshot_timeout),
            tunables,
        )
    }

    pub fn with_parts(
        output_dir: PathBuf,
        crop_bottom_pixels: u32,
        page_open_timeout: Duration,
        tunables: ScrollTunables,
    ) -> Self {
        Self {
            output_dir,
            output_prefix: "long_screenshot".to_string(),
            crop_bottom_pixels,
            page_open_timeout,
            tunables,
            run_lock: Mutex::new(()),
        }
    }

    /// Capture `url` into a stitched long screenshot
    ///
    /// Debug frames stay on disk next to the composite for inspection.
    pub async fn take_long_screenshot(
        &self,
        opener: &dyn PageOpener,
        url: &str,
    ) -> LongScreenshotOutcome {
        match self.run(opener, url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(url = %url, "Long screenshot failed: {}", e);
                LongScreenshotOutcome::failure(url, &e)
            }
        }
    }

    async fn run(
        &self,
        opener: &dyn PageOpener,
        url: &str,
    ) -> Result<LongScreenshotOutcome, Error> {
        let _guard = self.run_lock.lock().await;

        let run_id = uuid::Uuid::new_v4();
        info!(run_id = %run_id, url = %url, "Starting long screenshot run");
        tokio::fs::create_dir_all(&self.output_dir).await?;

        // A page that never opens is a navigation failure, same as a DNS or
        // connection error
        let (page, opened) = tokio::time::timeout(self.page_open_timeout, opener.open_page(url))
            .await
            .map_err(|_| Error::navigation(format!("Opening {} timed out", url)))??;

        let result = self.capture_and_stitch(&*page, url, &opened).await;

        // The page is released regardless of how the run ended
        if let Err(e) = page.close().await {
            error!("Failed to close page after run: {}", e);
        }

        result
    }

    async fn capture_and_stitch(
        &self,
        page: &dyn PageSession,
        url: &str,
        opened: &OpenedPage,
    ) -> Result<LongScreenshotOutcome, Error> {
        let driver = ScrollDriver::new(self.tunables.clone());
        let outcome = driver.run(page, &self.output_dir).await?;

        let filename = format!(
            "{}_{}.png",
            self.output_prefix,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let output_path = self.output_dir.join(filename);

        let frames = outcome.frames.clone();
        let crop = self.crop_bottom_pixels;
        let stitch_target = output_path.clone();
        let stitched = tokio::task::spawn_blocking(move || stitch(&frames, crop, &stitch_target))
            .await
            .map_err(|e| Error::internal(format!("Stitch task failed: {}", e)))??;

        let total_height = self.reported_height(&outcome, stitched.total_height);

        info!(
            path = %output_path.display(),
            frames = outcome.frames.len(),
            total_height,
            bytes = stitched.file_size_bytes,
            "Long screenshot complete"
        );

        Ok(LongScreenshotOutcome {
            success: true,
            output_path: Some(output_path.display().to_string()),
            screenshot_count: outcome.frames.len(),
            total_height,
            file_size_bytes: stitched.file_size_bytes,
            original_url: url.to_string(),
            current_url: Some(opened.final_url.clone()),
            title: Some(opened.title.clone()),
            error: None,
        })
    }

    /// Single-viewport pages report the container height, not the frame's
    /// device-pixel height
    fn reported_height(&self, outcome: &ScrollOutcome, stitched_height: u32) -> u32 {
        if outcome.frames.len() == 1 && outcome.initial_geometry.fits_viewport() {
            outcome.initial_geometry.client_height.max(0) as u32
        } else {
            stitched_height
        }
    }
}
