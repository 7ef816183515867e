//! Record store abstraction.
//!
//! The coordinator talks to durable storage exclusively through
//! [`RecordStore`]. The contract every backend must honor: `try_claim` and
//! `update_status` are *conditional writes* — they mutate the record only if
//! the stated precondition still holds, atomically with respect to all other
//! writers. That single primitive is the coordinator's only synchronization
//! point, which keeps claim arbitration correct across processes, not just
//! threads.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::ShipmentStatus;
use crate::entities::notifications::{Notification, NotificationInsert};
use crate::entities::shipments::{Shipment, ShipmentInsert};
use crate::entities::status_history::{StatusHistoryEntry, StatusHistoryInsert};

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// Store-level failure (connectivity, timeout, backend error).
///
/// Deliberately opaque: the dispatch coordinator treats every variantless
/// store failure the same way — eligible for a bounded transparent retry,
/// surfaced to the caller on exhaustion.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Result of an atomic claim attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The conditional write applied; this caller won the shipment.
    Claimed(Shipment),
    /// The shipment exists but was no longer unclaimed.
    AlreadyClaimed,
    /// No shipment with that id.
    NotFound,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_shipment(&self, insert: ShipmentInsert) -> Result<Shipment, StoreError>;

    async fn shipment(&self, id: Uuid) -> Result<Option<Shipment>, StoreError>;

    /// Atomic conditional claim: `driver_id`, `status = accepted` and
    /// `accepted_at` are set iff the shipment is still unclaimed.
    async fn try_claim(
        &self,
        id: Uuid,
        driver_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<ClaimOutcome, StoreError>;

    /// Conditional transition: applies iff the current status equals
    /// `expected`. `None` means a concurrent transition won the race.
    async fn update_status(
        &self,
        id: Uuid,
        expected: ShipmentStatus,
        new_status: ShipmentStatus,
        now: OffsetDateTime,
    ) -> Result<Option<Shipment>, StoreError>;

    async fn append_history(
        &self,
        insert: StatusHistoryInsert,
        recorded_at: OffsetDateTime,
    ) -> Result<StatusHistoryEntry, StoreError>;

    /// History entries for a shipment, oldest first.
    async fn history(&self, shipment_id: Uuid) -> Result<Vec<StatusHistoryEntry>, StoreError>;

    async fn insert_notification(
        &self,
        insert: NotificationInsert,
        created_at: OffsetDateTime,
    ) -> Result<Notification, StoreError>;

    /// The recipient's notifications, newest first.
    async fn notifications_for(&self, recipient_id: Uuid)
    -> Result<Vec<Notification>, StoreError>;

    /// Returns `false` when the notification does not exist or belongs to
    /// someone else.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, StoreError>;

    /// Next value of the per-year order-number sequence.
    async fn next_order_sequence(&self, year: i32) -> Result<i64, StoreError>;
}
