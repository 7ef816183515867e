//! Shipment REST handlers.
//!
//! Thin adapters: parse the request, build the matching [`Intent`], let the
//! dispatch coordinator do everything else.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use ofd_core::dispatch::{Intent, IntentOutcome};
use ofd_sdk::objects::shipment::{
    CreateShipmentRequest, CreatedShipment, HistoryEntryResponse, ShipmentResponse,
    UpdateStatusRequest,
};
use uuid::Uuid;

use super::ApiError;
use crate::api::extractors::AuthedSession;
use crate::state::AppState;

/// `POST /shipments` — create a shipment and list it in the driver pool.
pub(super) async fn create_shipment(
    state: State<AppState>,
    AuthedSession(session): AuthedSession,
    Json(body): Json<CreateShipmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .dispatcher
        .handle(&session, Intent::CreateShipment(body))
        .await?;
    match outcome {
        IntentOutcome::Created(shipment) => Ok((
            StatusCode::CREATED,
            Json(CreatedShipment {
                id: shipment.id,
                order_number: shipment.order_number.clone(),
            }),
        )),
        other => unexpected(other),
    }
}

/// `GET /shipments/{shipment_id}` — current shipment state.
pub(super) async fn get_shipment(
    state: State<AppState>,
    AuthedSession(session): AuthedSession,
    Path(shipment_id): Path<Uuid>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .handle(&session, Intent::GetShipment { shipment_id })
        .await?;
    match outcome {
        IntentOutcome::Shipment(shipment) => Ok(Json((&shipment).into())),
        other => unexpected(other),
    }
}

/// `GET /shipments/{shipment_id}/history` — status history, oldest first.
pub(super) async fn get_history(
    state: State<AppState>,
    AuthedSession(session): AuthedSession,
    Path(shipment_id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let outcome = state
        .dispatcher
        .handle(&session, Intent::GetHistory { shipment_id })
        .await?;
    match outcome {
        IntentOutcome::History { entries, .. } => {
            Ok(Json(entries.iter().map(Into::into).collect()))
        }
        other => unexpected(other),
    }
}

/// `POST /shipments/{shipment_id}/claim` — claim an unclaimed shipment.
pub(super) async fn claim_shipment(
    state: State<AppState>,
    AuthedSession(session): AuthedSession,
    Path(shipment_id): Path<Uuid>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .handle(&session, Intent::Claim { shipment_id })
        .await?;
    match outcome {
        IntentOutcome::Claimed(shipment) => Ok(Json((&shipment).into())),
        other => unexpected(other),
    }
}

/// `POST /shipments/{shipment_id}/status` — request a status transition.
pub(super) async fn update_status(
    state: State<AppState>,
    AuthedSession(session): AuthedSession,
    Path(shipment_id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .handle(
            &session,
            Intent::UpdateStatus {
                shipment_id,
                status: body.status.into(),
                note: body.note,
                lat: body.lat,
                lng: body.lng,
            },
        )
        .await?;
    match outcome {
        IntentOutcome::Updated(shipment) => Ok(Json((&shipment).into())),
        other => unexpected(other),
    }
}

/// The coordinator returned an outcome that does not match the intent it was
/// handed. Unreachable by construction; logged rather than panicking.
fn unexpected<T>(outcome: IntentOutcome) -> Result<T, ApiError> {
    tracing::error!(?outcome, "intent outcome does not match intent");
    Err(ApiError(ofd_core::dispatch::DispatchError::StoreUnavailable))
}
