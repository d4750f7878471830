//! HTTP entry point for Telegram webhook deliveries.
//!
//! Each `POST /webhook` carries one update. The update is run through the same
//! skip rules as a polled batch and, when it qualifies, turned into a post.
//! Nothing is deleted or acknowledged here: Telegram does not redeliver a
//! webhook update once it got a response.

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::pipeline::{self, Collaborators, Decision};
use crate::platform::Update;

// ── Shared state ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct WebhookState {
    pub ops: Arc<dyn Collaborators>,
    pub target_chat_id: String,
    pub post_status: String,
}

// ── Handlers ───────────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

async fn receive_update(State(state): State<WebhookState>, body: String) -> (StatusCode, Json<Value>) {
    let (status, value) = handle_body(&state, &body).await;
    (status, Json(value))
}

/// Status and JSON body for one webhook delivery.
async fn handle_body(state: &WebhookState, body: &str) -> (StatusCode, Value) {
    if body.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Missing request body." }),
        );
    }

    let update: Update = match serde_json::from_str(body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Rejected webhook with invalid JSON: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid JSON payload." }),
            );
        }
    };

    let text = match pipeline::classify(&update, &state.target_chat_id) {
        Decision::Skip(reason) => {
            warn!(update_id = update.update_id, reason = %reason, "Ignored webhook update");
            return (
                StatusCode::OK,
                json!({ "ok": true, "ignored": reason.to_string() }),
            );
        }
        Decision::Process { text, .. } => text,
    };

    match pipeline::create_post(state.ops.as_ref(), &text, &state.post_status).await {
        Ok(post) => {
            info!(
                update_id = update.update_id,
                post_id = post.id,
                "Published post from webhook update"
            );
            (
                StatusCode::OK,
                json!({
                    "ok": true,
                    "wordpressPostId": post.id,
                    "wordpressPostUrl": post.link,
                }),
            )
        }
        Err(e) => {
            error!(update_id = update.update_id, "Processing failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Failed to process Telegram message." }),
            )
        }
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(receive_update))
        .with_state(state)
}

pub async fn serve(listen: &str, state: WebhookState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind to {listen}"))?;

    info!("Webhook listening on http://{listen}/webhook");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Server error")?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
