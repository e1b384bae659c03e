//! Data model for one scroll-capture-and-stitch run

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scroll geometry of the page's true scrollable container
///
/// Sampled fresh at the start of a run and re-sampled after every scroll
/// step. Detail pages often scroll an inner container rather than the body,
/// so the container heights are reported separately from the document ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Layout viewport width in CSS pixels
    pub viewport_width: i64,
    /// Layout viewport height in CSS pixels
    pub viewport_height: i64,
    /// Total scrollable extent of the detected container
    pub scroll_height: i64,
    /// Visible height of the detected container
    pub client_height: i64,
    /// Current scroll offset of the detected container
    pub scroll_top: i64,
    /// document.body scrollHeight (diagnostic)
    pub body_scroll_height: i64,
    /// documentElement scrollHeight (diagnostic)
    pub document_scroll_height: i64,
    /// Device pixel ratio of the context
    pub device_pixel_ratio: f64,
    /// Class name or tag of the detected container
    pub container_selector: String,
    /// Whether scrolling happens on an inner container instead of the body
    pub uses_inner_container: bool,
}

impl PageGeometry {
    /// Content fits in a single viewport; no scrolling needed
    pub fn fits_viewport(&self) -> bool {
        self.scroll_height <= self.viewport_height || self.scroll_height <= self.client_height
    }

    /// Container reports its bottom within `tolerance` pixels
    pub fn at_bottom(&self, tolerance: i64) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - tolerance
    }
}

/// One capture iteration of the scroll driver
///
/// Steps form an append-only sequence strictly ordered by `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollStep {
    /// Iteration index, starting at 0
    pub index: usize,
    /// Offset the driver asked the page to be at for this capture
    pub requested_offset: i64,
    /// Offset the container actually reported (post-resynchronization)
    pub observed_offset: i64,
    /// Frame persisted for this step
    pub frame_path: PathBuf,
}

/// An immutable raster frame persisted to disk
///
/// Owned by the run that produced it until handed to the stitcher.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFrame {
    /// On-disk PNG path
    pub path: PathBuf,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
}

/// Terminal artifact of one run
#[derive(Debug, Clone, PartialEq)]
pub struct StitchResult {
    /// Composite width in pixels
    pub total_width: u32,
    /// Composite height in pixels
    pub total_height: u32,
    /// Number of frames composited (degenerate frames excluded)
    pub frame_count: usize,
    /// Final composite path
    pub output_path: PathBuf,
    /// Size of the composite on disk
    pub file_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(scroll_height: i64, viewport_height: i64, client_height: i64) -> PageGeometry {
        PageGeometry {
            viewport_width: 390,
            viewport_height,
            scroll_height,
            client_height,
            scroll_top: 0,
            body_scroll_height: scroll_height,
            document_scroll_height: scroll_height,
            device_pixel_ratio: 3.0,
            container_selector: "detail-container__body".to_string(),
            uses_inner_container: true,
        }
    }

    #[test]
    fn test_fits_viewport() {
        assert!(geometry(600, 844, 844).fits_viewport());
        assert!(!geometry(2600, 844, 800).fits_viewport());
        // Fits the inner container even though it exceeds the viewport
        assert!(geometry(900, 844, 900).fits_viewport());
    }

    #[test]
    fn test_at_bottom_tolerance() {
        let mut g = geometry(2600, 800, 800);
        g.scroll_top = 1800;
        assert!(g.at_bottom(10)); // 1800 + 800 >= 2590

        g.scroll_top = 1700;
        assert!(!g.at_bottom(10));
    }
}
