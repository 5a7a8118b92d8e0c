//! Control API for a running drill session.
//!
//! CORS-permissive so a local settings page can call it. Two operations:
//! observe the session, stop the session. Everything else (settings edits,
//! navigation) belongs to the external UI host.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use parlo_core::types::SessionStatus;

use crate::scheduler::SessionHandle;

/// Build the axum router around a session handle.
pub fn router(handle: SessionHandle) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/stop", post(stop))
        .layer(CorsLayer::permissive())
        .with_state(handle)
}

#[derive(serde::Serialize)]
struct OkResponse {
    ok: bool,
}

async fn status(State(handle): State<SessionHandle>) -> Json<SessionStatus> {
    Json(handle.status())
}

async fn stop(State(handle): State<SessionHandle>) -> Json<OkResponse> {
    handle.stop();
    Json(OkResponse { ok: true })
}
