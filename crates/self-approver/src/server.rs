//! Webhook HTTP server
//!
//! Embeds an axum server with two routes on `/`: `GET` answers a liveness
//! banner and `POST` takes GitHub webhook deliveries.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::engine::ApprovalEngine;
use crate::events::{WebhookError, WebhookEvent};

const EVENT_HEADER: &str = "x-github-event";

/// Shared state for the axum routes
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ApprovalEngine>,
    pub banner: Arc<str>,
}

impl AppState {
    pub fn new(engine: ApprovalEngine, app_name: &str) -> Self {
        Self {
            engine: Arc::new(engine),
            banner: format!("{} App up and running!", app_name).into(),
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root).post(webhook))
        .with_state(state)
}

/// Serve `router` on `addr` until Ctrl-C
pub async fn serve(addr: SocketAddr, router: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server starting on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    log::info!("Server stopped");
    Ok(())
}

/// GET / : liveness banner.
async fn root(State(state): State<AppState>) -> String {
    state.banner.to_string()
}

/// POST / : GitHub webhook delivery.
///
/// Answers 400 for deliveries that cannot be parsed and 200 for events the
/// engine ignores or handles. An engine failure answers 500, so GitHub marks
/// the delivery failed and it can be redelivered; approvals already submitted
/// are then reported as "already approved" on the next run.
async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let event_name = match headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()) {
        Some(name) => name,
        None => return bad_request(WebhookError::MissingEventHeader),
    };

    let event = match WebhookEvent::parse(event_name, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            log::debug!("Ignoring {} event", event_name);
            return (StatusCode::OK, "OK").into_response();
        }
        Err(e) => return bad_request(e),
    };

    match state.engine.handle(&event).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            log::error!(
                "Failed to handle {} event for {}: {:#}",
                event_name,
                event.repository().full_name,
                e
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn bad_request(error: WebhookError) -> Response {
    log::warn!("Rejecting webhook delivery: {}", error);
    (StatusCode::BAD_REQUEST, error.to_string()).into_response()
}
