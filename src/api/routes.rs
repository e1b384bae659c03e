//! HTTP surface
//!
//! Thin adapter between HTTP and the capture pipeline. Page-level failures
//! (bad URL, navigation error) map to 400; an unusable browser maps to 500.

use super::models::*;
use crate::pipeline::Pipeline;
use crate::session::{BrowserSession, PageOpener};
use crate::Error;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<BrowserSession>,
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/open", post(open_url))
        .route("/long-screenshot", post(long_screenshot))
        .route("/close-browser", post(close_browser))
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

/// Page-level failures are the caller's problem; everything else is ours
fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Navigation(_)
        | Error::Timeout(_)
        | Error::ScriptExecutionFailed(_)
        | Error::Capture(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "longshot",
        version: crate::VERSION,
        status: "running",
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        browser_initialized: state.session.is_initialized().await,
    })
}

/// Open a URL, report its final location and title, and close the page
async fn open_url(
    State(state): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<OpenResponse>, ApiError> {
    state.session.ensure_init().await.map_err(|e| {
        error!("Browser initialization failed: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Browser initialization failed: {}", e),
        )
    })?;

    let (page, opened) = state.session.open_page(&request.url).await.map_err(|e| {
        info!(url = %request.url, "Open failed: {}", e);
        api_error(status_for(&e), format!("Failed to open URL: {}", e))
    })?;

    // Metadata is all this endpoint needs; release the tab immediately
    if let Err(e) = page.close().await {
        error!("Failed to close page after open: {}", e);
    }

    Ok(Json(OpenResponse {
        success: true,
        original_url: request.url,
        current_url: opened.final_url,
        title: opened.title,
        status_code: opened.http_status,
    }))
}

/// Capture a stitched long screenshot of a URL
async fn long_screenshot(
    State(state): State<AppState>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<LongScreenshotResponse>, ApiError> {
    state.session.ensure_init().await.map_err(|e| {
        error!("Browser initialization failed: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Browser initialization failed: {}", e),
        )
    })?;

    let opener: &dyn PageOpener = state.session.as_ref();
    let outcome = state
        .pipeline
        .take_long_screenshot(opener, &request.url)
        .await;

    if !outcome.success {
        let detail = outcome
            .error
            .unwrap_or_else(|| "UnknownError".to_string());
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Long screenshot failed: {}", detail),
        ));
    }

    Ok(Json(LongScreenshotResponse {
        message: "Long screenshot captured".to_string(),
        data: outcome,
    }))
}

/// Release the browser; the next request re-initializes it
async fn close_browser(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.session.shutdown().await.map_err(|e| {
        error!("Browser shutdown failed: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Browser shutdown failed: {}", e),
        )
    })?;

    Ok(Json(MessageResponse {
        message: "Browser closed".to_string(),
    }))
}
