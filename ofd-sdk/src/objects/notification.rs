use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a directed notification, keyed to the transition that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Accepted,
    StatusChanged,
    Cancelled,
}

/// A persisted notification as returned to its recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub shipment_id: Uuid,
    pub read: bool,
    pub created_at: i64,
}
