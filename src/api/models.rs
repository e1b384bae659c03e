//! HTTP request and response bodies

use crate::pipeline::LongScreenshotOutcome;
use serde::{Deserialize, Serialize};

/// Body of POST /open and POST /long-screenshot
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

/// Service banner returned from GET /
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

/// GET /health payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub browser_initialized: bool,
}

/// POST /open success payload
#[derive(Debug, Serialize)]
pub struct OpenResponse {
    pub success: bool,
    pub original_url: String,
    pub current_url: String,
    pub title: String,
    pub status_code: u16,
}

/// POST /long-screenshot success payload
#[derive(Debug, Serialize)]
pub struct LongScreenshotResponse {
    pub message: String,
    pub data: LongScreenshotOutcome,
}

/// Simple acknowledgement payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error payload for 4xx/5xx responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
