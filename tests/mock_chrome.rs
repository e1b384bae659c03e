//! Integration tests against a mock Chrome DevTools WebSocket endpoint
//!
//! A real WebSocket server answers CDP commands for a synthetic scrollable
//! page, exercising the connection, client, and page session layers end to
//! end.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures_util::{SinkExt, StreamExt};
use longshot::cdp::{CdpClient, CdpClientImpl, CdpWebSocketConnection, ScreenshotFormat};
use longshot::session::{CdpPageSession, Key, PageSession, ScrollTarget};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const SCROLL_HEIGHT: i64 = 2600;
const CLIENT_HEIGHT: i64 = 800;

fn png_base64(width: u32, height: u32) -> String {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 60, 90, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    BASE64.encode(buf.into_inner())
}

fn evaluate_result(expression: &str, scroll_top: &mut i64) -> Value {
    if expression.contains("devicePixelRatio") {
        return json!({
            "type": "object",
            "value": {
                "width": 390,
                "height": 844,
                "scrollHeight": SCROLL_HEIGHT,
                "clientHeight": CLIENT_HEIGHT,
                "scrollTop": *scroll_top,
                "bodyScrollHeight": SCROLL_HEIGHT,
                "documentScrollHeight": SCROLL_HEIGHT,
                "devicePixelRatio": 3.0,
                "containerSelector": "detail-container__body",
                "hasScrollContainer": true,
            }
        });
    }

    if expression.contains("document.readyState") {
        return json!({ "type": "string", "value": "complete" });
    }

    if expression.contains("responseStatus") {
        return json!({ "type": "number", "value": 200 });
    }

    if expression.contains("document.title") {
        return json!({ "type": "string", "value": "Stub Page" });
    }

    if let Some(pos) = expression.find("scrollTop = ") {
        let rest = &expression[pos + "scrollTop = ".len()..];
        let max = SCROLL_HEIGHT - CLIENT_HEIGHT;
        if rest.starts_with(|c: char| c.is_ascii_digit()) {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            *scroll_top = digits.parse::<i64>().unwrap_or(0).clamp(0, max);
        } else {
            *scroll_top = max;
        }
        return json!({ "type": "undefined" });
    }

    json!({ "type": "undefined" })
}

fn handle_command(request: &Value, scroll_top: &mut i64) -> Value {
    let id = request["id"].as_u64().unwrap();
    let method = request["method"].as_str().unwrap();

    let result = match method {
        "Runtime.evaluate" => {
            let expression = request["params"]["expression"].as_str().unwrap_or("");
            json!({ "result": evaluate_result(expression, scroll_top) })
        }
        "Page.navigate" => {
            *scroll_top = 0;
            let url = request["params"]["url"].as_str().unwrap_or("");
            json!({ "frameId": "frame-1", "frame": { "url": url } })
        }
        "Page.captureScreenshot" => {
            json!({ "data": png_base64(39, 84) })
        }
        "Input.dispatchKeyEvent" => {
            match request["params"]["key"].as_str() {
                Some("End") => *scroll_top = SCROLL_HEIGHT - CLIENT_HEIGHT,
                Some("Home") => *scroll_top = 0,
                _ => {}
            }
            json!({})
        }
        _ => json!({}),
    };

    json!({ "id": id, "result": result })
}

async fn spawn_mock_chrome() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let mut scroll_top: i64 = 0;

                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(text) => {
                            let request: Value = serde_json::from_str(&text).unwrap();
                            let response = handle_command(&request, &mut scroll_top);
                            if ws
                                .send(Message::Text(response.to_string()))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        Message::Ping(data) => {
                            let _ = ws.send(Message::Pong(data)).await;
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    addr
}

#[tokio::test]
async fn test_client_navigates_and_evaluates() {
    let addr = spawn_mock_chrome().await;
    let connection = CdpWebSocketConnection::new(format!("ws://{}/devtools/page/t1", addr))
        .await
        .unwrap();
    let client = CdpClientImpl::new(connection);

    client.enable_domain("Page").await.unwrap();
    client.enable_domain("Runtime").await.unwrap();

    let nav = client.navigate("https://example.com/note/1").await.unwrap();
    assert_eq!(nav.url, "https://example.com/note/1");
    assert_eq!(nav.status_code, 200);

    let bytes = client.screenshot(ScreenshotFormat::Png).await.unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (39, 84));
}

#[tokio::test]
async fn test_page_session_over_websocket() {
    let addr = spawn_mock_chrome().await;
    let connection = CdpWebSocketConnection::new(format!("ws://{}/devtools/page/t2", addr))
        .await
        .unwrap();
    let client: Arc<dyn CdpClient> = Arc::new(CdpClientImpl::new(connection));
    let session = CdpPageSession::new("ws-test", client);

    let geometry = session.scroll_geometry().await.unwrap();
    assert_eq!(geometry.scroll_height, 2600);
    assert_eq!(geometry.scroll_top, 0);
    assert!(geometry.uses_inner_container);

    session.set_scroll(ScrollTarget::Offset(1200)).await.unwrap();
    let geometry = session.scroll_geometry().await.unwrap();
    assert_eq!(geometry.scroll_top, 1200);

    session.press_key(Key::End).await.unwrap();
    let geometry = session.scroll_geometry().await.unwrap();
    assert_eq!(geometry.scroll_top, 1800);
    assert!(geometry.at_bottom(10));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    session.screenshot_to(&path).await.unwrap();
    assert_eq!(image::image_dimensions(&path).unwrap(), (39, 84));

    session.close().await.unwrap();
    assert!(!session.is_active());
}
