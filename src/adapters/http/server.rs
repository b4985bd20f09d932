//! axum server exposing the alert webhook and the SSE troubleshooting stream.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::models::config::ServerConfig;
use crate::domain::models::{AlertWebhook, StreamEvent};
use crate::services::{AlertService, StreamEmitter, WebhookAck};

/// SSE event name used for every stream event.
pub const SSE_EVENT: &str = "message";

/// Shared state for the handlers.
pub struct AppState {
    pub alerts: AlertService,
    pub emitter: StreamEmitter,
}

/// Body of `POST /api/ai_ops/troubleshoot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TroubleshootRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    accepting: bool,
    busy_workers: usize,
}

pub struct HttpServer {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(alerts: AlertService, emitter: StreamEmitter, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AppState { alerts, emitter }),
            config,
        }
    }

    /// Build the router with all endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/webhook/prometheus", post(receive_alerts))
            .route("/api/ai_ops/troubleshoot", post(troubleshoot))
            .route("/health", get(health_check))
            .with_state(Arc::clone(&self.state))
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
    }

    /// Serve until `shutdown` resolves. In-flight connections are drained by
    /// axum; draining the dispatcher is up to the caller.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid listen address {}:{}",
                    self.config.host, self.config.port
                )
            })?;
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "triage HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;
        Ok(())
    }
}

/// Alertmanager webhook. Always acknowledges; an unreadable body is skipped.
async fn receive_alerts(State(state): State<Arc<AppState>>, body: Bytes) -> Json<WebhookAck> {
    let webhook: AlertWebhook = match serde_json::from_slice(&body) {
        Ok(webhook) => webhook,
        Err(err) => {
            warn!(error = %err, "unreadable alert webhook body; skipping");
            return Json(WebhookAck::Skipped);
        }
    };
    Json(state.alerts.handle_webhook(webhook).await)
}

async fn troubleshoot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TroubleshootRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)> {
    if request.query.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query must not be blank".to_string(),
                code: "INVALID_QUERY".to_string(),
            }),
        ));
    }

    let stream = state.emitter.start(request.query, request.conversation_id);
    info!(
        trace_id = %stream.trace_id,
        conversation_id = %stream.conversation_id,
        "troubleshooting stream opened"
    );
    Ok(Sse::new(sse_stream(stream.events)))
}

/// Dropping the returned stream drops the receiver, which cancels the session.
fn sse_stream(
    events: mpsc::Receiver<StreamEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(events, |mut rx| async move {
        let event = rx.recv().await;
        event.map(|event| {
            let sse = Event::default()
                .event(SSE_EVENT)
                .data(serde_json::to_string(&event).unwrap_or_default());
            (Ok::<_, Infallible>(sse), rx)
        })
    })
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let dispatcher = state.alerts.dispatcher();
    Json(HealthResponse {
        status: "ok",
        service: "triage",
        accepting: dispatcher.is_accepting(),
        busy_workers: dispatcher.busy_workers(),
    })
}
