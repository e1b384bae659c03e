//! Browser session lifecycle
//!
//! One `BrowserSession` owns the connection to a running Chrome. Pages are
//! opened on demand, configured for mobile presentation, and handed to the
//! pipeline as `PageSession` trait objects.

use super::page::{read_title, CdpPageSession};
use super::traits::{OpenedPage, PageOpener, PageSession};
use crate::cdp::CdpBrowser;
use crate::stealth;
use crate::Error;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

type BrowserFactory = Box<dyn Fn() -> Arc<dyn CdpBrowser> + Send + Sync>;

/// Device presentation and load behavior for every opened page
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_scale_factor: f64,
    pub user_agent: String,
    /// Extra settle after the document reports ready, for late resources
    pub post_load_settle: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            viewport_width: 390,
            viewport_height: 844,
            device_scale_factor: 3.0,
            user_agent: stealth::MOBILE_USER_AGENT.to_string(),
            post_load_settle: Duration::from_secs(3),
        }
    }
}

/// Explicit browser lifecycle with lazy initialization support
pub struct BrowserSession {
    options: SessionOptions,
    factory: BrowserFactory,
    browser: RwLock<Option<Arc<dyn CdpBrowser>>>,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    pub fn new(options: SessionOptions, factory: BrowserFactory) -> Self {
        Self {
            options,
            factory,
            browser: RwLock::new(None),
        }
    }

    /// Connect to the browser and verify it responds
    pub async fn init(&self) -> Result<(), Error> {
        let mut guard = self.browser.write().await;
        if guard.is_some() {
            debug!("Browser session already initialized");
            return Ok(());
        }

        let browser = (self.factory)();
        let version = browser.get_version().await?;
        info!(
            product = %version.product,
            protocol = %version.protocol_version,
            "Browser session initialized"
        );

        *guard = Some(browser);
        Ok(())
    }

    /// Initialize on first use
    pub async fn ensure_init(&self) -> Result<(), Error> {
        if self.browser.read().await.is_some() {
            return Ok(());
        }
        self.init().await
    }

    pub async fn is_initialized(&self) -> bool {
        self.browser.read().await.is_some()
    }

    /// Close every page connection and release the browser handle
    pub async fn shutdown(&self) -> Result<(), Error> {
        let mut guard = self.browser.write().await;
        match guard.take() {
            Some(browser) => {
                info!("Shutting down browser session");
                browser.close().await
            }
            None => {
                debug!("Shutdown requested but session was not initialized");
                Ok(())
            }
        }
    }

    async fn browser(&self) -> Result<Arc<dyn CdpBrowser>, Error> {
        self.browser
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(Error::UninitializedSession)
    }

    /// Apply mobile emulation and anti-automation setup to a fresh page
    async fn prepare_page(&self, client: &Arc<dyn crate::cdp::CdpClient>) -> Result<(), Error> {
        client
            .call_method(
                "Emulation.setDeviceMetricsOverride",
                json!({
                    "width": self.options.viewport_width,
                    "height": self.options.viewport_height,
                    "deviceScaleFactor": self.options.device_scale_factor,
                    "mobile": true,
                }),
            )
            .await?;

        client
            .call_method(
                "Emulation.setTouchEmulationEnabled",
                json!({ "enabled": true, "maxTouchPoints": 5 }),
            )
            .await?;

        client.enable_domain("Network").await?;
        client
            .call_method(
                "Network.setUserAgentOverride",
                json!({ "userAgent": self.options.user_agent }),
            )
            .await?;
        client
            .call_method(
                "Network.setExtraHTTPHeaders",
                json!({ "headers": stealth::mobile_headers() }),
            )
            .await?;

        for source in [stealth::ANTI_AUTOMATION_SCRIPT, stealth::MOBILE_EMULATION_SCRIPT] {
            client
                .call_method(
                    "Page.addScriptToEvaluateOnNewDocument",
                    json!({ "source": source }),
                )
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl PageOpener for BrowserSession {
    async fn open_page(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn PageSession>, OpenedPage), Error> {
        let browser = self.browser().await?;

        let target_url = browser.create_target("about:blank").await?;
        let client = browser.create_client(&target_url).await?;

        let session_id = target_url
            .rsplit('/')
            .next()
            .unwrap_or("page")
            .to_string();

        self.prepare_page(&client).await?;

        let navigation = match client.navigate(url).await {
            Ok(nav) => nav,
            Err(e) => {
                warn!(url = %url, "Navigation failed: {}", e);
                let _ = client.connection().close().await;
                return Err(e);
            }
        };

        if !self.options.post_load_settle.is_zero() {
            tokio::time::sleep(self.options.post_load_settle).await;
        }

        let title = read_title(&client).await;
        info!(
            session_id = %session_id,
            final_url = %navigation.url,
            title = %title,
            "Page opened"
        );

        let page = Arc::new(CdpPageSession::new(session_id, client));
        let opened = OpenedPage {
            final_url: navigation.url,
            http_status: navigation.status_code,
            title,
        };

        Ok((page as Arc<dyn PageSession>, opened))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::MockCdpBrowser;
    use crate::session::traits::ScrollTarget;

    fn mock_session() -> (Arc<MockCdpBrowser>, BrowserSession) {
        let browser = Arc::new(MockCdpBrowser::new());
        let factory_browser = Arc::clone(&browser);
        let options = SessionOptions {
            post_load_settle: Duration::ZERO,
            ..SessionOptions::default()
        };
        let session = BrowserSession::new(
            options,
            Box::new(move || Arc::clone(&factory_browser) as Arc<dyn CdpBrowser>),
        );
        (browser, session)
    }

    #[tokio::test]
    async fn test_open_page_requires_init() {
        let (_, session) = mock_session();
        let result = session.open_page("https://example.com/").await;
        assert!(matches!(result, Err(Error::UninitializedSession)));
    }

    #[tokio::test]
    async fn test_lazy_init_is_idempotent() {
        let (_, session) = mock_session();
        assert!(!session.is_initialized().await);

        session.ensure_init().await.unwrap();
        session.ensure_init().await.unwrap();
        assert!(session.is_initialized().await);
    }

    #[tokio::test]
    async fn test_open_page_applies_mobile_setup() {
        let (browser, session) = mock_session();
        session.init().await.unwrap();

        let (page, opened) = session.open_page("https://example.com/note/1").await.unwrap();
        assert_eq!(opened.final_url, "https://example.com/note/1");
        assert_eq!(opened.http_status, 200);
        assert_eq!(opened.title, "Mock Page");

        let client = &browser.clients()[0];
        let calls = client.method_calls();
        assert!(calls.iter().any(|m| m == "Emulation.setDeviceMetricsOverride"));
        assert!(calls.iter().any(|m| m == "Network.setUserAgentOverride"));
        assert!(calls.iter().any(|m| m == "Page.addScriptToEvaluateOnNewDocument"));

        // The handed-out page is live and scrollable
        page.set_scroll(ScrollTarget::Offset(300)).await.unwrap();
        assert_eq!(client.scroll_top(), 300);
    }

    #[tokio::test]
    async fn test_shutdown_releases_browser() {
        let (_, session) = mock_session();
        session.init().await.unwrap();
        session.shutdown().await.unwrap();
        assert!(!session.is_initialized().await);

        // Shutdown of an uninitialized session is a no-op
        session.shutdown().await.unwrap();
    }
}
