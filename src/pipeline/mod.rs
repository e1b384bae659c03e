//! Scroll-capture-and-stitch pipeline
//!
//! A run opens a page, walks its scrollable container from top to bottom
//! capturing viewport frames, then composites the frames into one tall PNG.

pub mod capture;
pub mod geometry;
pub mod runner;
pub mod scroll;
pub mod stitch;

pub use geometry::{CaptureFrame, PageGeometry, ScrollStep, StitchResult};
pub use runner::{LongScreenshotOutcome, Pipeline};
pub use scroll::{ScrollDriver, ScrollOutcome, ScrollTunables};
pub use stitch::stitch;
