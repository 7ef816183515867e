pub mod notifications;
pub mod shipments;
pub mod status_history;

use ofd_sdk::objects::notification::NotificationKind as SdkNotificationKind;
use ofd_sdk::objects::shipment::{
    Priority as SdkPriority, ShipmentStatus as SdkShipmentStatus, VehicleType as SdkVehicleType,
};
use ofd_sdk::objects::Role as SdkRole;

/// Shipment lifecycle status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `ofd_sdk::objects::ShipmentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "shipment_status")]
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

impl From<ShipmentStatus> for SdkShipmentStatus {
    fn from(value: ShipmentStatus) -> Self {
        match value {
            ShipmentStatus::Unclaimed => SdkShipmentStatus::Unclaimed,
            ShipmentStatus::Accepted => SdkShipmentStatus::Accepted,
            ShipmentStatus::InTransit => SdkShipmentStatus::InTransit,
            ShipmentStatus::Delivered => SdkShipmentStatus::Delivered,
            ShipmentStatus::Cancelled => SdkShipmentStatus::Cancelled,
        }
    }
}

impl From<SdkShipmentStatus> for ShipmentStatus {
    fn from(value: SdkShipmentStatus) -> Self {
        match value {
            SdkShipmentStatus::Unclaimed => ShipmentStatus::Unclaimed,
            SdkShipmentStatus::Accepted => ShipmentStatus::Accepted,
            SdkShipmentStatus::InTransit => ShipmentStatus::InTransit,
            SdkShipmentStatus::Delivered => ShipmentStatus::Delivered,
            SdkShipmentStatus::Cancelled => ShipmentStatus::Cancelled,
        }
    }
}

/// Session role for database and authorization use.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `ofd_sdk::objects::Role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "user_role")]
pub enum Role {
    Shipper,
    Driver,
    Admin,
}

impl From<Role> for SdkRole {
    fn from(value: Role) -> Self {
        match value {
            Role::Shipper => SdkRole::Shipper,
            Role::Driver => SdkRole::Driver,
            Role::Admin => SdkRole::Admin,
        }
    }
}

impl From<SdkRole> for Role {
    fn from(value: SdkRole) -> Self {
        match value {
            SdkRole::Shipper => Role::Shipper,
            SdkRole::Driver => Role::Driver,
            SdkRole::Admin => Role::Admin,
        }
    }
}

/// Shipment priority for database operations. Descriptive metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "priority_level")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl From<Priority> for SdkPriority {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Low => SdkPriority::Low,
            Priority::Medium => SdkPriority::Medium,
            Priority::High => SdkPriority::High,
            Priority::Urgent => SdkPriority::Urgent,
        }
    }
}

impl From<SdkPriority> for Priority {
    fn from(value: SdkPriority) -> Self {
        match value {
            SdkPriority::Low => Priority::Low,
            SdkPriority::Medium => Priority::Medium,
            SdkPriority::High => Priority::High,
            SdkPriority::Urgent => Priority::Urgent,
        }
    }
}

/// Declared vehicle type for database operations. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "vehicle_type")]
pub enum VehicleType {
    Tent,
    Refrigerated,
    Flatbed,
    Container,
    Van,
}

impl From<VehicleType> for SdkVehicleType {
    fn from(value: VehicleType) -> Self {
        match value {
            VehicleType::Tent => SdkVehicleType::Tent,
            VehicleType::Refrigerated => SdkVehicleType::Refrigerated,
            VehicleType::Flatbed => SdkVehicleType::Flatbed,
            VehicleType::Container => SdkVehicleType::Container,
            VehicleType::Van => SdkVehicleType::Van,
        }
    }
}

impl From<SdkVehicleType> for VehicleType {
    fn from(value: SdkVehicleType) -> Self {
        match value {
            SdkVehicleType::Tent => VehicleType::Tent,
            SdkVehicleType::Refrigerated => VehicleType::Refrigerated,
            SdkVehicleType::Flatbed => VehicleType::Flatbed,
            SdkVehicleType::Container => VehicleType::Container,
            SdkVehicleType::Van => VehicleType::Van,
        }
    }
}

/// Notification kind for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "notification_kind")]
pub enum NotificationKind {
    Created,
    Accepted,
    StatusChanged,
    Cancelled,
}

impl From<NotificationKind> for SdkNotificationKind {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::Created => SdkNotificationKind::Created,
            NotificationKind::Accepted => SdkNotificationKind::Accepted,
            NotificationKind::StatusChanged => SdkNotificationKind::StatusChanged,
            NotificationKind::Cancelled => SdkNotificationKind::Cancelled,
        }
    }
}

impl From<SdkNotificationKind> for NotificationKind {
    fn from(value: SdkNotificationKind) -> Self {
        match value {
            SdkNotificationKind::Created => NotificationKind::Created,
            SdkNotificationKind::Accepted => NotificationKind::Accepted,
            SdkNotificationKind::StatusChanged => NotificationKind::StatusChanged,
            SdkNotificationKind::Cancelled => NotificationKind::Cancelled,
        }
    }
}
