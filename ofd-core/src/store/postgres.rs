//! Postgres-backed record store.
//!
//! Delegates to the query functions on the entity types; the conditional
//! writes rely on single-statement row updates, so no explicit transaction
//! or advisory lock is needed for claim arbitration.

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{ClaimOutcome, RecordStore, StoreError};
use crate::entities::ShipmentStatus;
use crate::entities::notifications::{Notification, NotificationInsert};
use crate::entities::shipments::{Shipment, ShipmentInsert};
use crate::entities::status_history::{StatusHistoryEntry, StatusHistoryInsert};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_shipment(&self, insert: ShipmentInsert) -> Result<Shipment, StoreError> {
        Ok(Shipment::insert_new(&self.pool, insert).await?)
    }

    async fn shipment(&self, id: Uuid) -> Result<Option<Shipment>, StoreError> {
        Ok(Shipment::get_by_id(&self.pool, id).await?)
    }

    async fn try_claim(
        &self,
        id: Uuid,
        driver_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<ClaimOutcome, StoreError> {
        match Shipment::try_claim(&self.pool, id, driver_id, now).await? {
            Some(shipment) => Ok(ClaimOutcome::Claimed(shipment)),
            // Zero rows affected: distinguish a lost race from a bad id.
            None => match Shipment::get_by_id(&self.pool, id).await? {
                Some(_) => Ok(ClaimOutcome::AlreadyClaimed),
                None => Ok(ClaimOutcome::NotFound),
            },
        }
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ShipmentStatus,
        new_status: ShipmentStatus,
        now: OffsetDateTime,
    ) -> Result<Option<Shipment>, StoreError> {
        Ok(Shipment::update_status(&self.pool, id, expected, new_status, now).await?)
    }

    async fn append_history(
        &self,
        insert: StatusHistoryInsert,
        recorded_at: OffsetDateTime,
    ) -> Result<StatusHistoryEntry, StoreError> {
        Ok(StatusHistoryEntry::insert_new(&self.pool, insert, recorded_at).await?)
    }

    async fn history(&self, shipment_id: Uuid) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        Ok(StatusHistoryEntry::list_for_shipment(&self.pool, shipment_id).await?)
    }

    async fn insert_notification(
        &self,
        insert: NotificationInsert,
        created_at: OffsetDateTime,
    ) -> Result<Notification, StoreError> {
        Ok(Notification::insert_new(&self.pool, insert, created_at).await?)
    }

    async fn notifications_for(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, StoreError> {
        Ok(Notification::list_for_recipient(&self.pool, recipient_id).await?)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(Notification::mark_read(&self.pool, id, recipient_id).await?)
    }

    async fn next_order_sequence(&self, year: i32) -> Result<i64, StoreError> {
        Ok(Shipment::next_order_sequence(&self.pool, year).await?)
    }
}
