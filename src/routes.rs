//! HTTP routes: embedded page, health, runtime config, claims, WebSocket

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_embed::Embed;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::RuntimeConfig;
use crate::settlement::{ClaimRequest, ClaimResponse, SettlementClient, SettlementError};
use crate::state::AppState;
use crate::ws::ws_handler;

/// Embedded static files
#[derive(Embed)]
#[folder = "static/"]
struct Assets;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/config.json", get(config_handler))
        .route("/claim", post(claim_handler))
        .route("/ws/snake", get(ws_handler))
        .route("/{*path}", get(static_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve embedded static files
fn serve_static(path: &str) -> Response {
    let path = if path.is_empty() { "index.html" } else { path };

    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [("content-type", mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn index_handler() -> Response {
    serve_static("index.html")
}

async fn static_handler(Path(path): Path<String>) -> Response {
    serve_static(&path)
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.session_count(),
    }))
}

/// Payment parameters for the page
async fn config_handler(State(state): State<Arc<AppState>>) -> Json<RuntimeConfig> {
    Json(state.config.runtime.clone())
}

/// Settle a reward claim. Amounts are computed server-side from the counts.
///
/// Counts are taken as sent, so this route is for trusted callers only and
/// must not be exposed publicly. Players claim over the WebSocket, where the
/// counts come from the session's own ledger.
async fn claim_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClaimRequest>,
) -> (StatusCode, Json<ClaimResponse>) {
    match state.settlement.claim(&request).await {
        Ok(receipt) => (StatusCode::OK, Json(ClaimResponse::success(&receipt))),
        Err(e) => {
            let status = match e {
                SettlementError::InvalidAddress(_) | SettlementError::InvalidCount { .. } => StatusCode::BAD_REQUEST,
                SettlementError::Transfer { .. } => StatusCode::BAD_GATEWAY,
            };
            (status, Json(ClaimResponse::failure(&e)))
        }
    }
}
