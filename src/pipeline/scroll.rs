//! Scroll-and-capture driver
//!
//! Walks the page's scrollable container from top to bottom in fixed steps,
//! persisting one viewport frame per step. Scrolling real pages is
//! adversarial: containers clamp, snap, lazily grow, or ignore programmatic
//! scrolls entirely, so every move is an ordered list of strategies
//! (programmatic scroll, key press, wheel nudge) followed by a verifying
//! re-read of the actual offset.

use super::capture::capture_frame;
use super::geometry::{CaptureFrame, PageGeometry, ScrollStep};
use crate::session::{Key, PageSession, ScrollTarget};
use crate::Error;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Timing and bounds for one driver run
///
/// The settle delays exist because mobile detail pages re-layout after
/// every scroll; capturing too early yields half-rendered frames.
#[derive(Debug, Clone)]
pub struct ScrollTunables {
    /// Nominal scroll advance per step, CSS pixels
    pub scroll_step: i64,
    /// Unconditional cap on captured frames
    pub max_frames: usize,
    /// Delay before each capture
    pub settle_before_capture: Duration,
    /// Delay between the programmatic scroll and the follow-up input
    pub settle_after_scroll: Duration,
    /// Delay after the follow-up input, before re-reading the offset
    pub settle_after_nudge: Duration,
    /// Delay used while resetting to the top
    pub reset_settle: Duration,
    /// Observed offsets further than this from the expected one win
    pub resync_tolerance_px: i64,
    /// Slack for the container's bottom detection
    pub bottom_tolerance_px: i64,
}

impl Default for ScrollTunables {
    fn default() -> Self {
        Self {
            scroll_step: 500,
            max_frames: 20,
            settle_before_capture: Duration::from_millis(800),
            settle_after_scroll: Duration::from_millis(500),
            settle_after_nudge: Duration::from_millis(1000),
            reset_settle: Duration::from_millis(500),
            resync_tolerance_px: 50,
            bottom_tolerance_px: 10,
        }
    }
}

impl ScrollTunables {
    /// Default bounds with all settle delays removed
    pub fn instant() -> Self {
        Self {
            settle_before_capture: Duration::ZERO,
            settle_after_scroll: Duration::ZERO,
            settle_after_nudge: Duration::ZERO,
            reset_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Everything a completed driver run produced
#[derive(Debug)]
pub struct ScrollOutcome {
    pub frames: Vec<CaptureFrame>,
    pub steps: Vec<ScrollStep>,
    pub initial_geometry: PageGeometry,
    pub final_geometry: PageGeometry,
}

/// Drives one top-to-bottom capture pass over a page session
#[derive(Debug, Clone)]
pub struct ScrollDriver {
    tunables: ScrollTunables,
}

impl ScrollDriver {
    pub fn new(tunables: ScrollTunables) -> Self {
        Self { tunables }
    }

    /// Scroll to the bottom and back so lazily loaded content is forced in
    /// before the container height is measured
    async fn prime_lazy_load(&self, session: &dyn PageSession) -> Result<(), Error> {
        debug!("Priming lazy-loaded content");

        session.set_scroll(ScrollTarget::Bottom).await?;
        sleep(self.tunables.settle_after_scroll).await;
        session.press_key(Key::End).await?;
        sleep(self.tunables.settle_after_nudge).await;

        session.set_scroll(ScrollTarget::Top).await?;
        session.press_key(Key::Home).await?;
        sleep(self.tunables.settle_after_scroll).await;

        Ok(())
    }

    /// Put the container back at offset 0, verifying the result
    async fn reset_to_top(&self, session: &dyn PageSession) -> Result<(), Error> {
        session.set_scroll(ScrollTarget::Top).await?;
        sleep(self.tunables.reset_settle).await;
        session.press_key(Key::Home).await?;
        sleep(self.tunables.reset_settle).await;

        let geometry = session.scroll_geometry().await?;
        if geometry.scroll_top != 0 {
            warn!(
                scroll_top = geometry.scroll_top,
                "Container did not return to the top; continuing from its offset"
            );
        }

        Ok(())
    }

    /// Run one capture pass, leaving numbered frames under `out_dir`
    pub async fn run(
        &self,
        session: &dyn PageSession,
        out_dir: &Path,
    ) -> Result<ScrollOutcome, Error> {
        self.prime_lazy_load(session).await?;

        let initial = session.scroll_geometry().await?;
        info!(
            scroll_height = initial.scroll_height,
            client_height = initial.client_height,
            viewport_height = initial.viewport_height,
            container = %initial.container_selector,
            inner_container = initial.uses_inner_container,
            "Starting capture pass"
        );

        if initial.fits_viewport() {
            info!("Content fits in one viewport, capturing a single frame");
            sleep(self.tunables.settle_before_capture).await;
            let frame = capture_frame(session, out_dir, 0, initial.scroll_top).await?;
            let step = ScrollStep {
                index: 0,
                requested_offset: 0,
                observed_offset: initial.scroll_top,
                frame_path: frame.path.clone(),
            };
            return Ok(ScrollOutcome {
                frames: vec![frame],
                steps: vec![step],
                initial_geometry: initial.clone(),
                final_geometry: initial,
            });
        }

        self.reset_to_top(session).await?;

        // The bound is fixed from the initial sample; pages that keep
        // growing while we scroll would otherwise never terminate
        let bound = initial.scroll_height;
        let step = self.tunables.scroll_step;

        let mut current: i64 = 0;
        let mut requested: i64 = 0;
        let mut reached_end = false;
        let mut frames: Vec<CaptureFrame> = Vec::new();
        let mut steps: Vec<ScrollStep> = Vec::new();
        let mut final_geometry = initial.clone();

        loop {
            sleep(self.tunables.settle_before_capture).await;

            let index = frames.len();
            let frame = capture_frame(session, out_dir, index, current).await?;
            steps.push(ScrollStep {
                index,
                requested_offset: requested,
                observed_offset: current,
                frame_path: frame.path.clone(),
            });
            frames.push(frame);

            if reached_end {
                debug!(frames = frames.len(), "Bottom frame captured");
                break;
            }

            if frames.len() >= self.tunables.max_frames {
                warn!(
                    max_frames = self.tunables.max_frames,
                    "Frame cap reached before the end of content"
                );
                break;
            }

            let next = current + step;
            if next + step > bound {
                // Less than a full step would remain after the next move;
                // go straight to the end so the last frame covers the
                // true bottom of the page
                session.set_scroll(ScrollTarget::Bottom).await?;
                sleep(self.tunables.settle_after_scroll).await;
                session.press_key(Key::End).await?;
                requested = bound;
                current = bound;
                reached_end = true;
            } else {
                session.set_scroll(ScrollTarget::Offset(next)).await?;
                sleep(self.tunables.settle_after_scroll).await;
                // Half-step wheel nudge for containers that only react to
                // real input events
                session.wheel(step / 2).await?;
                requested = next;
                current = next;
            }

            sleep(self.tunables.settle_after_nudge).await;

            let geometry = session.scroll_geometry().await?;
            let actual = geometry.scroll_top;
            final_geometry = geometry.clone();

            if (actual - current).abs() > self.tunables.resync_tolerance_px {
                debug!(
                    expected = current,
                    actual, "Observed offset disagrees, resynchronizing"
                );
                current = actual;
            }

            // A bottom reading right after the first scroll is unreliable
            // while the page is still settling
            if !reached_end
                && steps.len() > 1
                && actual > 0
                && geometry.at_bottom(self.tunables.bottom_tolerance_px)
            {
                info!(scroll_top = actual, "Container reports its bottom, stopping");
                break;
            }
        }

        info!(
            frames = frames.len(),
            final_offset = current,
            "Capture pass complete"
        );

        Ok(ScrollOutcome {
            frames,
            steps,
            initial_geometry: initial,
            final_geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{MockPageBehavior, MockPageSession};

    fn driver() -> ScrollDriver {
        ScrollDriver::new(ScrollTunables::instant())
    }

    fn small_frames(behavior: MockPageBehavior) -> MockPageBehavior {
        // Tiny PNGs keep the tests fast
        MockPageBehavior {
            viewport_width: 40,
            viewport_height: 30,
            ..behavior
        }
    }

    #[tokio::test]
    async fn test_short_page_captures_single_frame() {
        let dir = tempfile::tempdir().unwrap();
        let page = MockPageSession::new(small_frames(MockPageBehavior {
            scroll_height: 600,
            client_height: 844,
            ..MockPageBehavior::default()
        }));

        let outcome = driver().run(&page, dir.path()).await.unwrap();

        assert_eq!(outcome.frames.len(), 1);
        assert_eq!(outcome.steps.len(), 1);
        assert!(outcome.frames[0].path.exists());
    }

    #[tokio::test]
    async fn test_full_pass_over_virtual_container() {
        let dir = tempfile::tempdir().unwrap();
        // Virtual scroller: reports requested offsets as-is, inner panel
        // shorter than the viewport
        let page = MockPageSession::new(small_frames(MockPageBehavior {
            scroll_height: 2600,
            client_height: 500,
            clamp_to_content: false,
            ..MockPageBehavior::default()
        }));

        let outcome = driver().run(&page, dir.path()).await.unwrap();

        let observed: Vec<i64> = outcome.steps.iter().map(|s| s.observed_offset).collect();
        assert_eq!(observed, vec![0, 500, 1000, 1500, 2000, 2600]);
        assert_eq!(outcome.frames.len(), 6);

        // Offsets never decrease and indices are sequential
        for (i, s) in outcome.steps.iter().enumerate() {
            assert_eq!(s.index, i);
        }
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_clamped_container_stops_at_reported_bottom() {
        let dir = tempfile::tempdir().unwrap();
        let page = MockPageSession::new(small_frames(MockPageBehavior {
            scroll_height: 3100,
            client_height: 800,
            clamp_to_content: true,
            ..MockPageBehavior::default()
        }));

        let outcome = driver().run(&page, dir.path()).await.unwrap();

        // Clamp forces a resync at 2300 and the bottom check ends the pass
        // well before the frame cap
        assert!(outcome.frames.len() < ScrollTunables::default().max_frames);
        assert_eq!(outcome.frames.len(), 5);
        assert_eq!(outcome.final_geometry.scroll_top, 2300);
    }

    #[tokio::test]
    async fn test_stalled_container_hits_frame_cap() {
        let dir = tempfile::tempdir().unwrap();
        let page = MockPageSession::new(small_frames(MockPageBehavior {
            scroll_height: 5000,
            client_height: 800,
            stall_at: Some(700),
            ..MockPageBehavior::default()
        }));

        let tunables = ScrollTunables {
            max_frames: 8,
            ..ScrollTunables::instant()
        };
        let outcome = ScrollDriver::new(tunables).run(&page, dir.path()).await.unwrap();

        // A stall is not a stop condition; the cap is what ends the run
        assert_eq!(outcome.frames.len(), 8);
        let last = outcome.steps.last().unwrap();
        assert_eq!(last.observed_offset, 700);
    }

    #[tokio::test]
    async fn test_bound_fixed_from_initial_sample() {
        let dir = tempfile::tempdir().unwrap();
        let page = MockPageSession::new(small_frames(MockPageBehavior {
            scroll_height: 1400,
            client_height: 500,
            clamp_to_content: false,
            ..MockPageBehavior::default()
        }));

        let outcome = driver().run(&page, dir.path()).await.unwrap();

        // 0, 500, then the sub-step remainder folds into the end jump
        let observed: Vec<i64> = outcome.steps.iter().map(|s| s.observed_offset).collect();
        assert_eq!(observed, vec![0, 500, 1400]);
    }
}
