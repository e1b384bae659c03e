//! Longshot: long-screenshot capture service
//!
//! Attaches to a running Chrome over the DevTools Protocol, scrolls a page's
//! scrollable container from top to bottom capturing viewport frames, and
//! stitches the frames into one tall lossless PNG. An HTTP API exposes the
//! pipeline to callers.

pub mod api;
pub mod cdp;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod stealth;

pub use config::Config;
pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
