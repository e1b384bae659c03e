//! Longshot HTTP server entrypoint

use longshot::api::{router, AppState};
use longshot::cdp::{CdpBrowser, CdpBrowserImpl};
use longshot::pipeline::Pipeline;
use longshot::session::{BrowserSession, SessionOptions};
use longshot::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting longshot v{}", longshot::VERSION);

    let options = SessionOptions {
        viewport_width: config.viewport_width,
        viewport_height: config.viewport_height,
        device_scale_factor: config.device_scale_factor,
        ..SessionOptions::default()
    };

    let endpoint = config.cdp_endpoint.clone();
    let page_load_timeout = Duration::from_secs(config.screenshot_timeout);
    let session = Arc::new(BrowserSession::new(
        options,
        Box::new(move || {
            Arc::new(
                CdpBrowserImpl::new(endpoint.clone()).with_page_load_timeout(page_load_timeout),
            ) as Arc<dyn CdpBrowser>
        }),
    ));

    // Connect eagerly so misconfiguration surfaces at startup; a browser
    // that comes up later is still picked up lazily on the first request
    if let Err(e) = session.init().await {
        warn!("Browser not reachable at startup: {}", e);
    }

    let pipeline = Arc::new(Pipeline::new(&config));
    let state = AppState {
        session: Arc::clone(&session),
        pipeline,
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = session.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
