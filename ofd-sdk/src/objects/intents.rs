//! Client-to-server intent messages.
//!
//! Every mutation and subscription goes through one tagged union so the
//! coordinator can be driven identically from the WebSocket loop, the REST
//! handlers, and unit tests without a live transport.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shipment::{CreateShipmentRequest, ShipmentStatus};

/// An intent sent by a connected session.
///
/// Serialized as an internally-tagged JSON object:
///
/// ```json
/// {"intent":"claim","shipment_id":"..."}
/// {"intent":"update_status","shipment_id":"...","status":"in_transit","lat":41.3,"lng":69.2}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum ClientIntent {
    /// Create a new shipment (shippers only).
    Create {
        #[serde(flatten)]
        shipment: CreateShipmentRequest,
    },

    /// Subscribe this session to a shipment's event room.
    Subscribe { shipment_id: Uuid },

    /// Claim an unclaimed shipment (drivers only).
    Claim { shipment_id: Uuid },

    /// Request a status transition.
    UpdateStatus {
        shipment_id: Uuid,
        status: ShipmentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lat: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lng: Option<f64>,
    },

    /// Fetch the current shipment state (used on reconnect to re-derive
    /// anything missed while disconnected).
    GetShipment { shipment_id: Uuid },

    /// Fetch the full status history of a shipment.
    GetHistory { shipment_id: Uuid },
}
