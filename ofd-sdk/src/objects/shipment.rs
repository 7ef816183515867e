//! Shipment DTOs shared by the REST and WebSocket surfaces.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a shipment.
///
/// `Unclaimed` is the single "no driver yet" state; a shipment moves
/// forward through `Accepted → InTransit → Delivered`, or terminates in
/// `Cancelled` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Unclaimed,
    Accepted,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    /// Returns `true` for statuses that accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ShipmentStatus::Delivered | ShipmentStatus::Cancelled)
    }
}

/// Descriptive urgency of a shipment. Consulted by no arbitration rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Declared vehicle type for the cargo. Informational only; not checked
/// against any driver capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Tent,
    Refrigerated,
    Flatbed,
    Container,
    Van,
}

/// One endpoint of a route: a street address plus coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub street: CompactString,
    pub city: CompactString,
    pub region: CompactString,
    pub lat: f64,
    pub lng: f64,
}

/// Request body for creating a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShipmentRequest {
    pub pickup: RoutePoint,
    pub dropoff: RoutePoint,
    pub weight_kg: Decimal,
    pub volume_m3: Decimal,
    pub vehicle_type: VehicleType,
    pub description: String,
    pub price: Decimal,
    pub currency: CompactString,
    pub priority: Priority,
}

/// Request body for a status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ShipmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

/// Response to a successful shipment creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedShipment {
    pub id: Uuid,
    pub order_number: CompactString,
}

/// Full shipment state as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub order_number: CompactString,
    pub shipper_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup: RoutePoint,
    pub dropoff: RoutePoint,
    pub weight_kg: Decimal,
    pub volume_m3: Decimal,
    pub vehicle_type: VehicleType,
    pub description: String,
    pub price: Decimal,
    pub currency: CompactString,
    pub priority: Priority,
    pub status: ShipmentStatus,
    /// Unix timestamps, present once the corresponding transition fired.
    pub created_at: i64,
    pub accepted_at: Option<i64>,
    pub transit_at: Option<i64>,
    pub delivered_at: Option<i64>,
    pub cancelled_at: Option<i64>,
}

/// One entry of a shipment's audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub status: ShipmentStatus,
    pub actor_id: Uuid,
    pub recorded_at: i64,
    pub note: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}
