//! Server-to-client WebSocket messages.
//!
//! # Protocol
//!
//! 1. After the upgrade the session sends [`ClientIntent`] frames and the
//!    server answers each with an [`ServerMessage::Ack`] or
//!    [`ServerMessage::Error`] frame.
//! 2. Room events ([`ServerMessage::ShipmentAccepted`],
//!    [`ServerMessage::ShipmentStatusChanged`], [`ServerMessage::PoolListed`],
//!    [`ServerMessage::PoolRemoved`], [`ServerMessage::NotificationCreated`])
//!    arrive interleaved, scoped to the topics the session is subscribed to.
//! 3. Errors do **not** close the connection; the server closes only on
//!    client disconnect or shutdown.
//!
//! [`ClientIntent`]: super::intents::ClientIntent

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ErrorCode;
use super::notification::NotificationResponse;
use super::shipment::{CreatedShipment, HistoryEntryResponse, ShipmentResponse, ShipmentStatus};

/// Server-to-client WebSocket message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field:
///
/// ```json
/// {"type":"pool_removed","shipment_id":"..."}
/// {"type":"error","code":"already_claimed","reason":"shipment already claimed"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a `create` intent.
    Created { shipment: CreatedShipment },

    /// Acknowledges a `subscribe` intent.
    Subscribed { shipment_id: Uuid },

    /// Acknowledges a winning `claim` intent with the claimed shipment.
    Claimed { shipment: ShipmentResponse },

    /// Acknowledges an `update_status` intent with the new shipment state.
    Updated { shipment: ShipmentResponse },

    /// Answer to a `get_shipment` intent.
    Shipment { shipment: ShipmentResponse },

    /// Answer to a `get_history` intent, ordered oldest first.
    History {
        shipment_id: Uuid,
        entries: Vec<HistoryEntryResponse>,
    },

    /// A shipment was claimed; sent on `shipment:{id}`.
    ShipmentAccepted { shipment: ShipmentResponse },

    /// A shipment changed status; sent on `shipment:{id}`.
    ShipmentStatusChanged {
        shipment: ShipmentResponse,
        old_status: ShipmentStatus,
        new_status: ShipmentStatus,
    },

    /// A new unclaimed shipment is available; sent on `pool:drivers` and
    /// `region:{pickup city}`.
    PoolListed { shipment: ShipmentResponse },

    /// A shipment left the pool (claimed or cancelled); sent on `pool:drivers`.
    PoolRemoved { shipment_id: Uuid },

    /// A notification was created for this user; sent on `user:{id}`.
    NotificationCreated { notification: NotificationResponse },

    /// An intent failed. Does not close the connection.
    Error { code: ErrorCode, reason: String },
}

/// Well-known WebSocket close codes used by the dispatch stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// An unexpected server-side error prevented the connection from
    /// continuing.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The presented credential was missing or invalid.
    pub const UNAUTHORIZED: u16 = 4001;
}
