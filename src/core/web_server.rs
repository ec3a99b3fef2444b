//! HTTP front door.
//!
//! Receives Telegram updates at `POST /webhook` and processes each one inside
//! the request. The webhook always answers 200; the body carries the status.

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::FutureExt;
use secrecy::ExposeSecret;
use serde_json::json;
use teloxide::types::Update;
use tokio::net::TcpListener;

use crate::app::App;
use crate::core::error::AppResult;
use crate::core::metrics;
use crate::telegram::handlers::handle_update;
use crate::telegram::Bot;

/// Header Telegram uses to echo the webhook secret
const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared state for the web server.
#[derive(Clone)]
struct WebState {
    app: Arc<App>,
    bot: Bot,
}

/// Acknowledgment returned to Telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ack {
    Ok,
    Ignored,
}

impl Ack {
    fn as_str(self) -> &'static str {
        match self {
            Ack::Ok => "ok",
            Ack::Ignored => "ignored",
        }
    }
}

/// Builds the router; exposed separately so tests can drive it without a socket.
pub fn router(app: Arc<App>, bot: Bot) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/webhook", post(webhook_handler))
        .with_state(WebState { app, bot })
}

/// Start the web server and serve until Ctrl+C.
pub async fn start_web_server(addr: SocketAddr, app: Arc<App>, bot: Bot) -> AppResult<()> {
    let router = router(app, bot);

    log::info!("Starting web server on http://{}", addr);
    log::info!("  POST /webhook - Telegram updates");
    log::info!("  GET  /        - Status");
    log::info!("  GET  /health  - Health check");
    log::info!("  GET  /metrics - Prometheus metrics");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Shutting down web server...");
        })
        .await?;

    Ok(())
}

/// POST /webhook: error boundary around update processing.
async fn webhook_handler(State(state): State<WebState>, headers: HeaderMap, body: Bytes) -> Json<serde_json::Value> {
    let processing = AssertUnwindSafe(process_webhook(&state, &headers, &body)).catch_unwind();

    let status = match processing.await {
        Ok(Ok(ack)) => ack.as_str(),
        Ok(Err(e)) => {
            log::error!("Webhook update failed: {}", e);
            "error"
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("Webhook update panicked: {}", message);
            "error"
        }
    };

    Json(json!({ "status": status }))
}

async fn process_webhook(state: &WebState, headers: &HeaderMap, body: &[u8]) -> AppResult<Ack> {
    if let Some(secret) = &state.app.config().webhook_secret {
        let provided = headers.get(SECRET_TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(secret.expose_secret()) {
            log::warn!("Webhook call with missing or wrong secret token, ignoring");
            return Ok(Ack::Ignored);
        }
    }

    let update: Update = serde_json::from_slice(body)?;
    log::debug!("Webhook update {}", update.id.0);
    handle_update(&state.app, &state.bot, update).await?;
    Ok(Ack::Ok)
}

/// GET /: liveness probe.
async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Bot is running" }))
}

/// GET /health: simple health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// GET /metrics: Prometheus text format.
async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to encode metrics: {}", e)).into_response()
        }
    }
}
