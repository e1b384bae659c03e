//! Per-step frame capture

use super::geometry::CaptureFrame;
use crate::session::PageSession;
use crate::Error;
use std::path::Path;
use tracing::debug;

/// Capture the current viewport to a numbered debug frame
///
/// Frames are named `debug_screenshot_{index:02}_scroll_{offset}.png` so a
/// run's captures sort in capture order and carry the offset they were
/// taken at. Pixel dimensions are read back from the written file.
pub async fn capture_frame(
    session: &dyn PageSession,
    out_dir: &Path,
    index: usize,
    offset: i64,
) -> Result<CaptureFrame, Error> {
    let path = out_dir.join(format!("debug_screenshot_{:02}_scroll_{}.png", index, offset));

    session.screenshot_to(&path).await?;

    let (width, height) = image::image_dimensions(&path)?;
    debug!(
        index,
        offset,
        width,
        height,
        path = %path.display(),
        "Captured frame"
    );

    Ok(CaptureFrame {
        path,
        width,
        height,
    })
}
