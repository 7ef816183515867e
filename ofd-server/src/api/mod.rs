//! Dispatch API handlers.
//!
//! Every endpoint requires a bearer token from the configured token set
//! (the WebSocket endpoint takes it as a `token` query parameter instead,
//! since browsers cannot set headers on upgrade requests).
//!
//! # Endpoints
//!
//! - `POST /shipments`                    – create a shipment (shippers)
//! - `GET  /shipments/{shipment_id}`      – fetch current shipment state
//! - `GET  /shipments/{shipment_id}/history` – fetch the status history
//! - `POST /shipments/{shipment_id}/claim`   – claim a shipment (drivers)
//! - `POST /shipments/{shipment_id}/status`  – request a status transition
//! - `GET  /notifications`                – list own notifications
//! - `POST /notifications/{id}/read`      – mark a notification read
//! - `GET  /ws`                           – WebSocket dispatch stream

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ofd_core::dispatch::DispatchError;
use ofd_sdk::objects::ErrorCode;
use serde::Serialize;

use crate::state::AppState;

pub mod extractors;
mod notifications;
mod shipments;
mod ws;

/// Build the dispatch API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shipments", post(shipments::create_shipment))
        .route("/shipments/{shipment_id}", get(shipments::get_shipment))
        .route(
            "/shipments/{shipment_id}/history",
            get(shipments::get_history),
        )
        .route(
            "/shipments/{shipment_id}/claim",
            post(shipments::claim_shipment),
        )
        .route(
            "/shipments/{shipment_id}/status",
            post(shipments::update_status),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_read),
        )
        .route("/ws", get(ws::dispatch_ws))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// JSON error body returned by every failing endpoint.
#[derive(Serialize)]
struct ErrorBody {
    code: ErrorCode,
    reason: String,
}

/// Wrapper mapping coordinator errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub DispatchError);

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DispatchError::Unauthorized => StatusCode::UNAUTHORIZED,
            DispatchError::Forbidden(_) => StatusCode::FORBIDDEN,
            DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::InvalidTransition { .. }
            | DispatchError::AlreadyTerminal(_)
            | DispatchError::AlreadyClaimed
            | DispatchError::NoOp(_) => StatusCode::CONFLICT,
            DispatchError::StoreUnavailable => {
                tracing::error!("request failed: record store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        let body = ErrorBody {
            code: self.0.code(),
            reason: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
