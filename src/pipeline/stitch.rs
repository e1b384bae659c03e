//! Vertical frame composition
//!
//! Consecutive frames overlap by design (fixed UI chrome, partial last
//! scroll step), so every frame except the final one loses a fixed band
//! from its bottom before being stacked. The final frame is kept whole so
//! no trailing content is lost.

use super::geometry::{CaptureFrame, StitchResult};
use crate::Error;
use image::RgbaImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// Crop the overlap band off the bottom of a non-final frame
fn crop_band(img: &RgbaImage, crop: u32, index: usize) -> Result<RgbaImage, Error> {
    let (width, height) = img.dimensions();
    if height <= crop {
        return Err(Error::DegenerateFrame {
            index,
            height,
            crop,
        });
    }
    Ok(image::imageops::crop_imm(img, 0, 0, width, height - crop).to_image())
}

/// Composite captured frames into one tall lossless PNG
///
/// A single frame degenerates to a plain copy. With multiple frames the
/// canvas width is fixed by the first frame and a width mismatch in any
/// later frame is a hard error.
pub fn stitch(
    frames: &[CaptureFrame],
    crop_bottom_pixels: u32,
    output_path: &Path,
) -> Result<StitchResult, Error> {
    let (first, rest) = frames.split_first().ok_or(Error::InsufficientFrames)?;

    if rest.is_empty() {
        std::fs::copy(&first.path, output_path)?;
        let file_size_bytes = std::fs::metadata(output_path)?.len();
        info!(
            path = %output_path.display(),
            width = first.width,
            height = first.height,
            "Single frame, no stitching needed"
        );
        return Ok(StitchResult {
            total_width: first.width,
            total_height: first.height,
            frame_count: 1,
            output_path: output_path.to_path_buf(),
            file_size_bytes,
        });
    }

    let canvas_width = first.width;
    let last_index = frames.len() - 1;
    let mut bands: Vec<RgbaImage> = Vec::with_capacity(frames.len());

    for (index, frame) in frames.iter().enumerate() {
        if frame.width != canvas_width {
            return Err(Error::FrameWidthMismatch {
                index,
                width: frame.width,
                expected: canvas_width,
            });
        }

        let img = image::open(&frame.path)?.to_rgba8();

        if index == last_index {
            // Keep the final frame whole; its overlap duplicates content
            // already present but guarantees the page bottom is included
            bands.push(img);
        } else {
            match crop_band(&img, crop_bottom_pixels, index) {
                Ok(band) => bands.push(band),
                Err(e @ Error::DegenerateFrame { .. }) => {
                    warn!("Skipping frame: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    let total_height: u32 = bands.iter().map(|b| b.height()).sum();
    let mut canvas = RgbaImage::new(canvas_width, total_height);

    let mut y: i64 = 0;
    for band in &bands {
        image::imageops::replace(&mut canvas, band, 0, y);
        y += band.height() as i64;
    }

    canvas.save(output_path)?;
    let file_size_bytes = std::fs::metadata(output_path)?.len();

    debug!(
        frames_in = frames.len(),
        frames_used = bands.len(),
        total_height,
        "Stitched composite"
    );

    Ok(StitchResult {
        total_width: canvas_width,
        total_height,
        frame_count: bands.len(),
        output_path: output_path.to_path_buf(),
        file_size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn make_frame(dir: &Path, name: &str, width: u32, height: u32, shade: u8) -> CaptureFrame {
        let path = dir.join(name);
        let img = RgbaImage::from_pixel(width, height, image::Rgba([shade, shade, shade, 255]));
        img.save(&path).unwrap();
        CaptureFrame {
            path,
            width,
            height,
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let out = PathBuf::from("/tmp/never-written.png");
        let result = stitch(&[], 300, &out);
        assert!(matches!(result, Err(Error::InsufficientFrames)));
    }

    #[test]
    fn test_single_frame_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let frame = make_frame(dir.path(), "only.png", 120, 300, 10);
        let out = dir.path().join("out.png");

        let result = stitch(&[frame], 300, &out).unwrap();

        assert_eq!(result.total_width, 120);
        assert_eq!(result.total_height, 300);
        assert_eq!(result.frame_count, 1);
        assert!(result.file_size_bytes > 0);
        assert_eq!(image::image_dimensions(&out).unwrap(), (120, 300));
    }

    #[test]
    fn test_stitched_height_formula() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<_> = (0..3)
            .map(|i| make_frame(dir.path(), &format!("f{}.png", i), 100, 500, i as u8 * 60))
            .collect();
        let out = dir.path().join("out.png");

        // 2 cropped frames of 200 plus the whole last frame
        let result = stitch(&frames, 300, &out).unwrap();
        assert_eq!(result.total_height, 2 * 200 + 500);
        assert_eq!(result.frame_count, 3);
        assert_eq!(image::image_dimensions(&out).unwrap(), (100, 900));
    }

    #[test]
    fn test_band_content_order() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![
            make_frame(dir.path(), "f0.png", 50, 400, 10),
            make_frame(dir.path(), "f1.png", 50, 400, 200),
        ];
        let out = dir.path().join("out.png");

        stitch(&frames, 300, &out).unwrap();

        let canvas = image::open(&out).unwrap().to_rgba8();
        assert_eq!(canvas.get_pixel(0, 0).0[0], 10); // first band
        assert_eq!(canvas.get_pixel(0, 100).0[0], 200); // last frame starts at 400 - 300
    }

    #[test]
    fn test_degenerate_frame_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![
            make_frame(dir.path(), "f0.png", 100, 500, 0),
            make_frame(dir.path(), "f1.png", 100, 250, 60), // shorter than the crop band
            make_frame(dir.path(), "f2.png", 100, 500, 120),
        ];
        let out = dir.path().join("out.png");

        let result = stitch(&frames, 300, &out).unwrap();

        assert_eq!(result.total_height, 200 + 500);
        assert_eq!(result.frame_count, 2);
    }

    #[test]
    fn test_short_final_frame_is_kept_whole() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![
            make_frame(dir.path(), "f0.png", 100, 500, 0),
            make_frame(dir.path(), "f1.png", 100, 120, 60),
        ];
        let out = dir.path().join("out.png");

        let result = stitch(&frames, 300, &out).unwrap();
        assert_eq!(result.total_height, 200 + 120);
    }

    #[test]
    fn test_width_mismatch_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![
            make_frame(dir.path(), "f0.png", 100, 500, 0),
            make_frame(dir.path(), "f1.png", 120, 500, 60),
        ];
        let out = dir.path().join("out.png");

        let result = stitch(&frames, 300, &out);
        assert!(matches!(
            result,
            Err(Error::FrameWidthMismatch {
                index: 1,
                width: 120,
                expected: 100
            })
        ));
    }
}
