//! Configuration management for Longshot

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// CDP WebSocket endpoint of the browser to attach to
    pub cdp_endpoint: String,

    /// Directory where debug frames and composites are written
    pub output_dir: String,

    /// Page load timeout in seconds
    pub screenshot_timeout: u64,

    /// Scroll advance per capture step in CSS pixels
    pub scroll_step: i64,

    /// Overlap band removed from the bottom of every non-final frame
    pub crop_bottom_pixels: u32,

    /// Hard cap on capture iterations per run
    pub max_frames: usize,

    /// Emulated viewport width
    pub viewport_width: u32,

    /// Emulated viewport height
    pub viewport_height: u32,

    /// Emulated device pixel ratio
    pub device_scale_factor: f64,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cdp_endpoint: "ws://localhost:9222".to_string(),
            output_dir: "screenshots".to_string(),
            screenshot_timeout: 30,
            scroll_step: 500,
            crop_bottom_pixels: 300,
            max_frames: 20,
            viewport_width: 390,
            viewport_height: 844,
            device_scale_factor: 3.0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = env::var("LONGSHOT_HOST") {
            config.host = host;
        }

        if let Ok(port) = env::var("LONGSHOT_PORT") {
            config.port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid LONGSHOT_PORT"))?;
        }

        if let Ok(endpoint) = env::var("LONGSHOT_CDP_ENDPOINT") {
            config.cdp_endpoint = endpoint;
        }

        if let Ok(dir) = env::var("LONGSHOT_OUTPUT_DIR") {
            config.output_dir = dir;
        }

        if let Ok(timeout) = env::var("LONGSHOT_SCREENSHOT_TIMEOUT") {
            config.screenshot_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid LONGSHOT_SCREENSHOT_TIMEOUT"))?;
        }

        if let Ok(step) = env::var("LONGSHOT_SCROLL_STEP") {
            config.scroll_step = step
                .parse()
                .map_err(|_| Error::configuration("Invalid LONGSHOT_SCROLL_STEP"))?;
        }

        if let Ok(crop) = env::var("LONGSHOT_CROP_BOTTOM") {
            config.crop_bottom_pixels = crop
                .parse()
                .map_err(|_| Error::configuration("Invalid LONGSHOT_CROP_BOTTOM"))?;
        }

        if let Ok(max_frames) = env::var("LONGSHOT_MAX_FRAMES") {
            config.max_frames = max_frames
                .parse()
                .map_err(|_| Error::configuration("Invalid LONGSHOT_MAX_FRAMES"))?;
        }

        if let Ok(log_level) = env::var("LONGSHOT_LOG_LEVEL") {
            config.log_level = log_level;
        }

        if config.scroll_step <= 0 {
            return Err(Error::configuration("scroll_step must be positive"));
        }
        if config.max_frames == 0 {
            return Err(Error::configuration("max_frames must be at least 1"));
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_capture_tuning() {
        let config = Config::default();
        assert_eq!(config.scroll_step, 500);
        assert_eq!(config.crop_bottom_pixels, 300);
        assert_eq!(config.max_frames, 20);
        assert_eq!(config.viewport_width, 390);
        assert_eq!(config.viewport_height, 844);
    }

    #[test]
    fn test_from_toml() {
        let config: Config = toml::from_str(
            r#"
            port = 9090
            scroll_step = 400
            output_dir = "/tmp/shots"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.scroll_step, 400);
        assert_eq!(config.output_dir, "/tmp/shots");
        // Unset keys fall back to defaults
        assert_eq!(config.crop_bottom_pixels, 300);
    }
}
