//! WebSocket dispatch stream.
//!
//! One socket is one session: the client sends [`ClientIntent`] frames, the
//! server answers each with an ack or error frame, and room events for the
//! session's subscriptions arrive interleaved. Browsers cannot set headers
//! on upgrade requests, so the credential travels as a `token` query
//! parameter and is verified after the upgrade (closing with 4001 lets the
//! client observe the rejection, which a plain 401 would not).

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use ofd_core::auth::SessionAuth;
use ofd_core::dispatch::{DispatchError, Intent, IntentOutcome};
use ofd_core::entities::Role;
use ofd_core::rooms::{RoomEvent, Topic, session_channel};
use ofd_sdk::objects::{ClientIntent, ErrorCode, ServerMessage, WsCloseCode};
use ofd_sdk::objects::shipment::CreatedShipment;
use serde::Deserialize;

use crate::api::extractors::session_from_token;
use crate::state::AppState;

#[derive(Deserialize)]
pub(super) struct WsQuery {
    token: Option<String>,
}

/// `GET /ws` — WebSocket dispatch stream.
pub(super) async fn dispatch_ws(
    state: State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_dispatch_ws(socket, app_state, query.token))
}

/// Background task that drives a single WebSocket connection.
async fn handle_dispatch_ws(mut socket: WebSocket, state: AppState, token: Option<String>) {
    let session = match token {
        Some(token) => session_from_token(&state, &token).await,
        None => None,
    };
    let Some(session) = session else {
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: WsCloseCode::UNAUTHORIZED,
                reason: "invalid credential".into(),
            })))
            .await;
        return;
    };

    tracing::debug!(
        session_id = %session.session_id,
        subject_id = %session.subject_id,
        role = ?session.role,
        "WS: session connected"
    );

    // Register the session's outbound channel, then the standing
    // subscriptions every session gets: its own notification stream, and
    // the driver pool for drivers.
    let (tx, mut rx) = session_channel();
    let rooms = state.rooms().clone();
    rooms.register_session(session.session_id, tx).await;
    rooms
        .subscribe(session.session_id, Topic::User(session.subject_id))
        .await;
    if session.role == Role::Driver {
        rooms.subscribe(session.session_id, Topic::DriverPool).await;
    }

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        let msg = room_event_to_message(&event);
                        if send_json(&mut socket, &msg).await.is_err() {
                            break;
                        }
                    }
                    // The registry dropped our sender; nothing more will arrive.
                    None => {
                        let _ = socket
                            .send(Message::Close(Some(CloseFrame {
                                code: WsCloseCode::INTERNAL_ERROR,
                                reason: "event stream closed".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_frame(&state, &session, text.as_str()).await;
                        if send_json(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {
                        // Pings are answered by axum; binary frames are ignored.
                    }
                    Some(Err(_)) => {
                        break;
                    }
                }
            }
        }
    }

    rooms.disconnect(session.session_id).await;
    tracing::debug!(session_id = %session.session_id, "WS: session disconnected");
    let _ = socket.send(Message::Close(None)).await;
}

/// Parse one text frame and run it through the coordinator.
///
/// Intent errors come back as [`ServerMessage::Error`] frames; they never
/// close the connection.
async fn handle_frame(state: &AppState, session: &SessionAuth, text: &str) -> ServerMessage {
    let intent: ClientIntent = match serde_json::from_str(text) {
        Ok(intent) => intent,
        Err(e) => {
            return ServerMessage::Error {
                code: ErrorCode::BadRequest,
                reason: format!("invalid intent frame: {e}"),
            };
        }
    };

    match state.dispatcher.handle(session, to_intent(intent)).await {
        Ok(outcome) => to_ack(outcome),
        Err(e) => to_error(e),
    }
}

fn to_intent(intent: ClientIntent) -> Intent {
    match intent {
        ClientIntent::Create { shipment } => Intent::CreateShipment(shipment),
        ClientIntent::Subscribe { shipment_id } => Intent::Subscribe { shipment_id },
        ClientIntent::Claim { shipment_id } => Intent::Claim { shipment_id },
        ClientIntent::UpdateStatus {
            shipment_id,
            status,
            note,
            lat,
            lng,
        } => Intent::UpdateStatus {
            shipment_id,
            status: status.into(),
            note,
            lat,
            lng,
        },
        ClientIntent::GetShipment { shipment_id } => Intent::GetShipment { shipment_id },
        ClientIntent::GetHistory { shipment_id } => Intent::GetHistory { shipment_id },
    }
}

fn to_ack(outcome: IntentOutcome) -> ServerMessage {
    match outcome {
        IntentOutcome::Created(shipment) => ServerMessage::Created {
            shipment: CreatedShipment {
                id: shipment.id,
                order_number: shipment.order_number.clone(),
            },
        },
        IntentOutcome::Subscribed { shipment_id } => ServerMessage::Subscribed { shipment_id },
        IntentOutcome::Claimed(shipment) => ServerMessage::Claimed {
            shipment: (&shipment).into(),
        },
        IntentOutcome::Updated(shipment) => ServerMessage::Updated {
            shipment: (&shipment).into(),
        },
        IntentOutcome::Shipment(shipment) => ServerMessage::Shipment {
            shipment: (&shipment).into(),
        },
        IntentOutcome::History {
            shipment_id,
            entries,
        } => ServerMessage::History {
            shipment_id,
            entries: entries.iter().map(Into::into).collect(),
        },
    }
}

fn to_error(e: DispatchError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code(),
        reason: e.to_string(),
    }
}

fn room_event_to_message(event: &RoomEvent) -> ServerMessage {
    match event {
        RoomEvent::PoolListed { shipment } => ServerMessage::PoolListed {
            shipment: shipment.clone(),
        },
        RoomEvent::PoolRemoved { shipment_id } => ServerMessage::PoolRemoved {
            shipment_id: *shipment_id,
        },
        RoomEvent::ShipmentAccepted { shipment } => ServerMessage::ShipmentAccepted {
            shipment: shipment.clone(),
        },
        RoomEvent::StatusChanged {
            shipment,
            old_status,
            new_status,
        } => ServerMessage::ShipmentStatusChanged {
            shipment: shipment.clone(),
            old_status: *old_status,
            new_status: *new_status,
        },
        RoomEvent::NotificationCreated { notification } => ServerMessage::NotificationCreated {
            notification: notification.clone(),
        },
    }
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
