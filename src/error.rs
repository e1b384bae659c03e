//! Unified error types for Longshot

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Longshot
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image decode/encode errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Navigation failed (URL unreachable, load timeout)
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Screenshot capture failed
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Stitching was asked to composite an empty frame list
    #[error("No frames to stitch")]
    InsufficientFrames,

    /// A frame is too short to survive the overlap crop
    #[error("Frame {index} height {height} does not exceed crop band {crop}")]
    DegenerateFrame {
        index: usize,
        height: u32,
        crop: u32,
    },

    /// Frames handed to the stitcher must share one width
    #[error("Frame {index} width {width} differs from canvas width {expected}")]
    FrameWidthMismatch {
        index: usize,
        width: u32,
        expected: u32,
    },

    /// Operation attempted before the browser session was initialized
    #[error("Browser session not initialized")]
    UninitializedSession,

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new navigation error
    pub fn navigation<S: Into<String>>(msg: S) -> Self {
        Error::Navigation(msg.into())
    }

    /// Create a new capture error
    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Error::Capture(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Short machine-readable tag used in `{success:false, error}` results
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "IoError",
            Error::WebSocket(_) => "WebSocketError",
            Error::Cdp(_) => "CdpError",
            Error::Serialization(_) => "SerializationError",
            Error::Image(_) => "ImageError",
            Error::Timeout(_) => "TimeoutError",
            Error::Navigation(_) => "NavigationError",
            Error::Capture(_) => "CaptureError",
            Error::InsufficientFrames => "InsufficientFramesError",
            Error::DegenerateFrame { .. } => "DegenerateFrameError",
            Error::FrameWidthMismatch { .. } => "FrameWidthMismatchError",
            Error::UninitializedSession => "UninitializedSessionError",
            Error::ScriptExecutionFailed(_) => "ScriptExecutionError",
            Error::Configuration(_) => "ConfigurationError",
            Error::Internal(_) => "InternalError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::navigation("timeout").kind(), "NavigationError");
        assert_eq!(Error::InsufficientFrames.kind(), "InsufficientFramesError");
        assert_eq!(Error::UninitializedSession.kind(), "UninitializedSessionError");
    }

    #[test]
    fn test_degenerate_frame_display() {
        let err = Error::DegenerateFrame {
            index: 2,
            height: 200,
            crop: 300,
        };
        let msg = err.to_string();
        assert!(msg.contains("200"));
        assert!(msg.contains("300"));
    }
}
