//! Chrome DevTools Protocol layer
//!
//! WebSocket transport, typed command wrappers, and browser-level control
//! for an already-running Chrome with remote debugging enabled.

pub mod browser;
pub mod client;
pub mod connection;
pub mod mock;
pub mod traits;
pub mod types;

pub use browser::CdpBrowserImpl;
pub use client::CdpClientImpl;
pub use connection::CdpWebSocketConnection;
pub use traits::{
    BrowserVersion, CdpBrowser, CdpClient, CdpConnection, EvaluationResult, NavigationResult,
    ScreenshotFormat,
};
