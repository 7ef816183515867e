pub mod events;
pub mod intents;
pub mod notification;
pub mod shipment;

pub use events::{ServerMessage, WsCloseCode};
pub use intents::ClientIntent;
pub use notification::{NotificationKind, NotificationResponse};
pub use shipment::{
    CreateShipmentRequest, CreatedShipment, HistoryEntryResponse, Priority, RoutePoint,
    ShipmentResponse, ShipmentStatus, UpdateStatusRequest, VehicleType,
};

use serde::{Deserialize, Serialize};

/// The role claim carried by a session's credential.
///
/// Established once at connect time by the external identity service and
/// immutable for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Shipper,
    Driver,
    Admin,
}

/// Machine-readable error codes returned by intent handlers.
///
/// Mirrors the coordinator's error taxonomy one-to-one so clients can
/// dispatch on the `code` field of an error frame or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidTransition,
    AlreadyTerminal,
    AlreadyClaimed,
    NoOp,
    StoreUnavailable,
    BadRequest,
}
