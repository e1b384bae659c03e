//! Browser and page session management

pub mod browser;
pub mod mock;
pub mod page;
pub mod scripts;
pub mod traits;

pub use browser::{BrowserSession, SessionOptions};
pub use page::CdpPageSession;
pub use traits::{Key, OpenedPage, PageOpener, PageSession, ScrollTarget};
