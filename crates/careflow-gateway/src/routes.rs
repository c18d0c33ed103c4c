//! Route handlers for the gateway.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use careflow_core::error::CareflowError;
use careflow_rules::{handle_record_change, run_awaken_sweep, sync_callback_list};

use super::server::AppState;

/// Webhook payload sent by the store on record changes.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    record_id: Option<String>,
}

/// Parse the webhook body leniently — any malformed or empty body is treated
/// the same as a missing record id, mirroring the webhook contract.
fn record_id_from(body: &str) -> Option<String> {
    serde_json::from_str::<WebhookPayload>(body)
        .ok()
        .and_then(|payload| payload.record_id)
        .filter(|id| !id.is_empty())
}

/// Map a rule error onto the HTTP contract: validation errors carry their
/// diagnostic as a 400; everything else is logged and collapsed into a
/// generic 500 so internal detail never leaks to the caller.
fn error_response(operation: &str, record_id: &str, err: CareflowError) -> Response {
    match err {
        CareflowError::Validation(message) => {
            tracing::warn!("{operation} rejected for record {record_id}: {message}");
            (StatusCode::BAD_REQUEST, message).into_response()
        }
        other => {
            tracing::error!("{operation} failed for record {record_id}: {other}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "careflow-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Record-change webhook: archival, resignation, and SIMP routing.
pub async fn record_change(State(state): State<Arc<AppState>>, body: String) -> Response {
    let Some(record_id) = record_id_from(&body) else {
        return (StatusCode::BAD_REQUEST, "Missing record id in request.").into_response();
    };
    tracing::info!("Record-change webhook received for record {record_id}");

    match handle_record_change(state.store.as_ref(), &record_id, Utc::now()).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => error_response("Record change", &record_id, err),
    }
}

/// Daily awaken sweep, invoked by the external scheduler.
pub async fn awaken_sweep(State(state): State<Arc<AppState>>) -> Response {
    tracing::info!("Starting daily awaken sweep");

    match run_awaken_sweep(state.store.as_ref(), Utc::now()).await {
        Ok(report) if report.matched == 0 => {
            (StatusCode::OK, "OK - no patients due").into_response()
        }
        Ok(report) => (
            StatusCode::OK,
            format!("Awakened {} patients.", report.awakened),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Awaken sweep failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Callback-list sync webhook.
pub async fn callback_sync(State(state): State<Arc<AppState>>, body: String) -> Response {
    let Some(record_id) = record_id_from(&body) else {
        return (StatusCode::BAD_REQUEST, "Missing record id in request.").into_response();
    };
    tracing::info!("Callback-sync webhook received for record {record_id}");

    match sync_callback_list(state.store.as_ref(), &record_id, Utc::now()).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => error_response("Callback sync", &record_id, err),
    }
}
