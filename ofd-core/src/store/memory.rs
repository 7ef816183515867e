//! In-memory record store.
//!
//! Backs the coordinator's tests and transport-free development. Every
//! operation runs under one async mutex, which gives the same per-record
//! atomicity guarantee the Postgres backend gets from single-statement
//! conditional updates: a claim observes and mutates the record in one
//! critical section, so concurrent claimants cannot both see "unclaimed".

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ClaimOutcome, RecordStore, StoreError};
use crate::entities::ShipmentStatus;
use crate::entities::notifications::{Notification, NotificationInsert};
use crate::entities::shipments::{Shipment, ShipmentInsert};
use crate::entities::status_history::{StatusHistoryEntry, StatusHistoryInsert};

#[derive(Default)]
struct Inner {
    shipments: HashMap<Uuid, Shipment>,
    history: Vec<StatusHistoryEntry>,
    notifications: Vec<Notification>,
    sequences: HashMap<i32, i64>,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    inner: Mutex<Inner>,
    /// Number of upcoming operations that should fail with
    /// `StoreError::Unavailable`. Lets tests exercise the retry path.
    fail_next: AtomicU32,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` store operations fail as unavailable.
    pub fn fail_next_operations(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    fn maybe_fail(&self) -> Result<(), StoreError> {
        let remaining = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match remaining {
            Ok(_) => Err(StoreError::Unavailable("injected failure".into())),
            Err(_) => Ok(()),
        }
    }

    fn stamp(shipment: &mut Shipment, status: ShipmentStatus, now: OffsetDateTime) {
        let slot = match status {
            ShipmentStatus::Unclaimed => return,
            ShipmentStatus::Accepted => &mut shipment.accepted_at,
            ShipmentStatus::InTransit => &mut shipment.transit_at,
            ShipmentStatus::Delivered => &mut shipment.delivered_at,
            ShipmentStatus::Cancelled => &mut shipment.cancelled_at,
        };
        if slot.is_none() {
            *slot = Some(now);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_shipment(&self, insert: ShipmentInsert) -> Result<Shipment, StoreError> {
        self.maybe_fail()?;
        let shipment = Shipment {
            id: Uuid::new_v4(),
            order_number: insert.order_number,
            shipper_id: insert.shipper_id,
            driver_id: None,
            pickup_street: insert.pickup.street,
            pickup_city: insert.pickup.city,
            pickup_region: insert.pickup.region,
            pickup_lat: insert.pickup.lat,
            pickup_lng: insert.pickup.lng,
            dropoff_street: insert.dropoff.street,
            dropoff_city: insert.dropoff.city,
            dropoff_region: insert.dropoff.region,
            dropoff_lat: insert.dropoff.lat,
            dropoff_lng: insert.dropoff.lng,
            weight_kg: insert.weight_kg,
            volume_m3: insert.volume_m3,
            vehicle_type: insert.vehicle_type,
            description: insert.description,
            price: insert.price,
            currency: insert.currency,
            priority: insert.priority,
            status: ShipmentStatus::Unclaimed,
            created_at: OffsetDateTime::now_utc(),
            accepted_at: None,
            transit_at: None,
            delivered_at: None,
            cancelled_at: None,
        };
        let mut inner = self.inner.lock().await;
        inner.shipments.insert(shipment.id, shipment.clone());
        Ok(shipment)
    }

    async fn shipment(&self, id: Uuid) -> Result<Option<Shipment>, StoreError> {
        self.maybe_fail()?;
        let inner = self.inner.lock().await;
        Ok(inner.shipments.get(&id).cloned())
    }

    async fn try_claim(
        &self,
        id: Uuid,
        driver_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<ClaimOutcome, StoreError> {
        self.maybe_fail()?;
        let mut inner = self.inner.lock().await;
        let Some(shipment) = inner.shipments.get_mut(&id) else {
            return Ok(ClaimOutcome::NotFound);
        };
        if shipment.status != ShipmentStatus::Unclaimed || shipment.driver_id.is_some() {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        shipment.driver_id = Some(driver_id);
        shipment.status = ShipmentStatus::Accepted;
        shipment.accepted_at = Some(now);
        Ok(ClaimOutcome::Claimed(shipment.clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ShipmentStatus,
        new_status: ShipmentStatus,
        now: OffsetDateTime,
    ) -> Result<Option<Shipment>, StoreError> {
        self.maybe_fail()?;
        let mut inner = self.inner.lock().await;
        let Some(shipment) = inner.shipments.get_mut(&id) else {
            return Ok(None);
        };
        if shipment.status != expected {
            return Ok(None);
        }
        shipment.status = new_status;
        Self::stamp(shipment, new_status, now);
        Ok(Some(shipment.clone()))
    }

    async fn append_history(
        &self,
        insert: StatusHistoryInsert,
        recorded_at: OffsetDateTime,
    ) -> Result<StatusHistoryEntry, StoreError> {
        self.maybe_fail()?;
        let entry = StatusHistoryEntry {
            id: Uuid::new_v4(),
            shipment_id: insert.shipment_id,
            status: insert.status,
            actor_id: insert.actor_id,
            recorded_at,
            note: insert.note,
            lat: insert.lat,
            lng: insert.lng,
        };
        let mut inner = self.inner.lock().await;
        inner.history.push(entry.clone());
        Ok(entry)
    }

    async fn history(&self, shipment_id: Uuid) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        self.maybe_fail()?;
        let inner = self.inner.lock().await;
        let mut entries: Vec<_> = inner
            .history
            .iter()
            .filter(|e| e.shipment_id == shipment_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.recorded_at);
        Ok(entries)
    }

    async fn insert_notification(
        &self,
        insert: NotificationInsert,
        created_at: OffsetDateTime,
    ) -> Result<Notification, StoreError> {
        self.maybe_fail()?;
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: insert.recipient_id,
            kind: insert.kind,
            title: insert.title,
            body: insert.body,
            shipment_id: insert.shipment_id,
            read: false,
            created_at,
        };
        let mut inner = self.inner.lock().await;
        inner.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn notifications_for(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, StoreError> {
        self.maybe_fail()?;
        let inner = self.inner.lock().await;
        let mut notifications: Vec<_> = inner
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, StoreError> {
        self.maybe_fail()?;
        let mut inner = self.inner.lock().await;
        match inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn next_order_sequence(&self, year: i32) -> Result<i64, StoreError> {
        self.maybe_fail()?;
        let mut inner = self.inner.lock().await;
        let value = inner.sequences.entry(year).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
