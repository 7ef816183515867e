//! Notification REST handlers.
//!
//! Notifications bypass the intent union: they are personal inbox state,
//! not shipment lifecycle operations, so the handlers talk to the record
//! store directly and scope everything to the authenticated subject.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use ofd_core::dispatch::DispatchError;
use ofd_sdk::objects::notification::NotificationResponse;
use uuid::Uuid;

use super::ApiError;
use crate::api::extractors::AuthedSession;
use crate::state::AppState;

/// `GET /notifications` — the caller's notifications, newest first.
pub(super) async fn list_notifications(
    state: State<AppState>,
    AuthedSession(session): AuthedSession,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state
        .store()
        .notifications_for(session.subject_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list notifications");
            ApiError(DispatchError::StoreUnavailable)
        })?;
    Ok(Json(notifications.iter().map(Into::into).collect()))
}

/// `POST /notifications/{notification_id}/read` — mark one notification read.
///
/// Returns 404 both for unknown ids and for notifications addressed to
/// someone else; the distinction is not observable to the caller.
pub(super) async fn mark_read(
    state: State<AppState>,
    AuthedSession(session): AuthedSession,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .store()
        .mark_notification_read(notification_id, session.subject_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to mark notification read");
            ApiError(DispatchError::StoreUnavailable)
        })?;
    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError(DispatchError::NotFound))
    }
}
