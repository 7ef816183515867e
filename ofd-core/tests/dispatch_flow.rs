//! End-to-end coordinator behavior over the in-memory store: lifecycle
//! progression, history ordering, fan-out completeness, room retraction,
//! authorization scenarios, and the store retry path.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use ofd_core::auth::SessionAuth;
use ofd_core::dispatch::{DispatchError, Dispatcher, Intent, IntentOutcome};
use ofd_core::entities::notifications::{Notification, NotificationInsert};
use ofd_core::entities::shipments::{Shipment, ShipmentInsert};
use ofd_core::entities::status_history::{StatusHistoryEntry, StatusHistoryInsert};
use ofd_core::entities::{NotificationKind, Role, ShipmentStatus};
use ofd_core::ledger;
use ofd_core::rooms::{RoomEvent, RoomTopologyManager, Topic, session_channel};
use ofd_core::store::{ClaimOutcome, MemoryRecordStore, RecordStore, StoreError};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use support::{Harness, harness, session, tashkent_to_samarkand};

async fn create_shipment(h: &Harness, shipper: &SessionAuth) -> Uuid {
    match h
        .dispatcher
        .handle(shipper, Intent::CreateShipment(tashkent_to_samarkand()))
        .await
        .unwrap()
    {
        IntentOutcome::Created(s) => {
            assert_eq!(s.status, ShipmentStatus::Unclaimed);
            assert!(s.driver_id.is_none());
            s.id
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

fn update(shipment_id: Uuid, status: ShipmentStatus) -> Intent {
    Intent::UpdateStatus {
        shipment_id,
        status,
        note: None,
        lat: None,
        lng: None,
    }
}

#[tokio::test]
async fn full_lifecycle_and_history_path() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);
    let id = create_shipment(&h, &shipper).await;

    h.dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();
    h.dispatcher
        .handle(
            &driver,
            Intent::UpdateStatus {
                shipment_id: id,
                status: ShipmentStatus::InTransit,
                note: Some("left the depot".into()),
                lat: Some(41.29),
                lng: Some(69.25),
            },
        )
        .await
        .unwrap();
    let outcome = h
        .dispatcher
        .handle(&driver, update(id, ShipmentStatus::Delivered))
        .await
        .unwrap();

    let shipment = match outcome {
        IntentOutcome::Updated(s) => s,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(shipment.status, ShipmentStatus::Delivered);
    assert!(shipment.accepted_at.is_some());
    assert!(shipment.transit_at.is_some());
    assert!(shipment.delivered_at.is_some());
    assert!(shipment.cancelled_at.is_none());

    // History reads back as a valid machine path in time order.
    let entries = h.store.history(id).await.unwrap();
    let statuses: Vec<_> = entries.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            ShipmentStatus::Unclaimed,
            ShipmentStatus::Accepted,
            ShipmentStatus::InTransit,
            ShipmentStatus::Delivered,
        ]
    );
    assert!(ledger::is_valid_path(&statuses));
    assert!(
        entries.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at),
        "history timestamps must be non-decreasing"
    );
    let transit = &entries[2];
    assert_eq!(transit.note.as_deref(), Some("left the depot"));
    assert_eq!(transit.lat, Some(41.29));
}

#[tokio::test]
async fn order_numbers_are_sequential_per_year() {
    let h = harness();
    let shipper = session(Role::Shipper);
    create_shipment(&h, &shipper).await;
    let second = match h
        .dispatcher
        .handle(&shipper, Intent::CreateShipment(tashkent_to_samarkand()))
        .await
        .unwrap()
    {
        IntentOutcome::Created(s) => s,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert!(second.order_number.ends_with("-0002"));
}

#[tokio::test]
async fn noop_update_changes_nothing() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);
    let id = create_shipment(&h, &shipper).await;
    h.dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();

    let before = h.store.history(id).await.unwrap().len();
    let result = h
        .dispatcher
        .handle(&driver, update(id, ShipmentStatus::Accepted))
        .await;
    assert_eq!(
        result.unwrap_err(),
        DispatchError::NoOp(ShipmentStatus::Accepted)
    );
    assert_eq!(h.store.history(id).await.unwrap().len(), before);
}

#[tokio::test]
async fn invalid_transition_leaves_status_untouched() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let id = create_shipment(&h, &shipper).await;

    // unclaimed -> delivered is not an edge.
    let result = h
        .dispatcher
        .handle(&shipper, update(id, ShipmentStatus::Delivered))
        .await;
    assert_eq!(
        result.unwrap_err(),
        DispatchError::InvalidTransition {
            from: ShipmentStatus::Unclaimed,
            to: ShipmentStatus::Delivered,
        }
    );
    let stored = h.store.shipment(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ShipmentStatus::Unclaimed);
}

#[tokio::test]
async fn unassigned_driver_is_forbidden_before_transition_checks() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);
    let stranger = session(Role::Driver);
    let id = create_shipment(&h, &shipper).await;
    h.dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();

    let result = h
        .dispatcher
        .handle(&stranger, update(id, ShipmentStatus::InTransit))
        .await;
    assert!(matches!(result, Err(DispatchError::Forbidden(_))));
}

#[tokio::test]
async fn terminal_shipment_rejects_everything() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);
    let id = create_shipment(&h, &shipper).await;
    h.dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();
    h.dispatcher
        .handle(&driver, update(id, ShipmentStatus::InTransit))
        .await
        .unwrap();
    h.dispatcher
        .handle(&driver, update(id, ShipmentStatus::Delivered))
        .await
        .unwrap();

    let result = h
        .dispatcher
        .handle(&shipper, update(id, ShipmentStatus::Cancelled))
        .await;
    assert_eq!(
        result.unwrap_err(),
        DispatchError::AlreadyTerminal(ShipmentStatus::Delivered)
    );
}

#[tokio::test]
async fn fanout_produces_exactly_the_rule_table_sets() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);
    let id = create_shipment(&h, &shipper).await;

    // created -> shipper only.
    let shipper_inbox = h.store.notifications_for(shipper.subject_id).await.unwrap();
    assert_eq!(shipper_inbox.len(), 1);
    assert_eq!(shipper_inbox[0].kind, NotificationKind::Created);
    assert!(h
        .store
        .notifications_for(driver.subject_id)
        .await
        .unwrap()
        .is_empty());

    // accepted -> shipper and the claiming driver.
    h.dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();
    let shipper_inbox = h.store.notifications_for(shipper.subject_id).await.unwrap();
    let driver_inbox = h.store.notifications_for(driver.subject_id).await.unwrap();
    assert_eq!(shipper_inbox.len(), 2);
    assert_eq!(driver_inbox.len(), 1);
    assert_eq!(driver_inbox[0].kind, NotificationKind::Accepted);

    // cancelled -> both parties.
    h.dispatcher
        .handle(&shipper, update(id, ShipmentStatus::Cancelled))
        .await
        .unwrap();
    let shipper_inbox = h.store.notifications_for(shipper.subject_id).await.unwrap();
    let driver_inbox = h.store.notifications_for(driver.subject_id).await.unwrap();
    assert_eq!(shipper_inbox.len(), 3);
    assert_eq!(driver_inbox.len(), 2);
    assert_eq!(shipper_inbox[0].kind, NotificationKind::Cancelled);
    assert_eq!(driver_inbox[0].kind, NotificationKind::Cancelled);
}

#[tokio::test]
async fn claim_retracts_the_listing_from_other_drivers() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let winner = session(Role::Driver);
    let watcher = session(Role::Driver);

    // The watching driver sits in the pool room.
    let (tx, mut rx) = session_channel();
    h.rooms.register_session(watcher.session_id, tx).await;
    h.rooms.subscribe(watcher.session_id, Topic::DriverPool).await;

    let id = create_shipment(&h, &shipper).await;

    // Creation lists the shipment in the pool.
    match rx.recv().await.unwrap().as_ref() {
        RoomEvent::PoolListed { shipment } => assert_eq!(shipment.id, id),
        other => panic!("unexpected event: {other:?}"),
    }

    h.dispatcher
        .handle(&winner, Intent::Claim { shipment_id: id })
        .await
        .unwrap();

    match rx.recv().await.unwrap().as_ref() {
        RoomEvent::PoolRemoved { shipment_id } => assert_eq!(*shipment_id, id),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn subscribed_parties_see_status_changes() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);
    let id = create_shipment(&h, &shipper).await;
    h.dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();

    let (tx, mut rx) = session_channel();
    h.rooms.register_session(driver.session_id, tx).await;
    h.dispatcher
        .handle(&driver, Intent::Subscribe { shipment_id: id })
        .await
        .unwrap();

    h.dispatcher
        .handle(&driver, update(id, ShipmentStatus::InTransit))
        .await
        .unwrap();

    match rx.recv().await.unwrap().as_ref() {
        RoomEvent::StatusChanged {
            old_status,
            new_status,
            ..
        } => {
            assert_eq!(*old_status, ofd_sdk::objects::ShipmentStatus::Accepted);
            assert_eq!(*new_status, ofd_sdk::objects::ShipmentStatus::InTransit);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn strangers_cannot_read_claimed_shipments() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);
    let stranger = session(Role::Driver);
    let id = create_shipment(&h, &shipper).await;

    // Any driver may look while it is unclaimed.
    assert!(h
        .dispatcher
        .handle(&stranger, Intent::GetShipment { shipment_id: id })
        .await
        .is_ok());

    h.dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();

    let result = h
        .dispatcher
        .handle(&stranger, Intent::GetHistory { shipment_id: id })
        .await;
    assert!(matches!(result, Err(DispatchError::Forbidden(_))));
}

#[tokio::test]
async fn transient_store_failures_are_retried() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let id = create_shipment(&h, &shipper).await;

    h.store.fail_next_operations(2);
    let outcome = h
        .dispatcher
        .handle(&shipper, Intent::GetShipment { shipment_id: id })
        .await
        .unwrap();
    assert!(matches!(outcome, IntentOutcome::Shipment(_)));
}

#[tokio::test]
async fn store_outage_surfaces_after_retry_exhaustion() {
    let h = harness();
    let shipper = session(Role::Shipper);
    let id = create_shipment(&h, &shipper).await;

    h.store.fail_next_operations(10);
    let result = h
        .dispatcher
        .handle(&shipper, Intent::GetShipment { shipment_id: id })
        .await;
    assert_eq!(result.unwrap_err(), DispatchError::StoreUnavailable);
}

#[tokio::test]
async fn negative_price_is_rejected_before_any_side_effect() {
    let h = harness();
    let shipper = session(Role::Shipper);

    let mut request = tashkent_to_samarkand();
    request.price = Decimal::new(-450, 0);
    let result = h
        .dispatcher
        .handle(&shipper, Intent::CreateShipment(request))
        .await;
    assert!(matches!(result, Err(DispatchError::InvalidRequest(_))));

    // Nothing was stored and nothing fanned out.
    assert!(h
        .store
        .notifications_for(shipper.subject_id)
        .await
        .unwrap()
        .is_empty());
}

/// A store whose conditional status commit always reports a lost race,
/// as if a concurrent writer keeps winning. Everything else delegates.
struct ContestedStore {
    inner: MemoryRecordStore,
}

#[async_trait]
impl RecordStore for ContestedStore {
    async fn create_shipment(&self, insert: ShipmentInsert) -> Result<Shipment, StoreError> {
        self.inner.create_shipment(insert).await
    }

    async fn shipment(&self, id: Uuid) -> Result<Option<Shipment>, StoreError> {
        self.inner.shipment(id).await
    }

    async fn try_claim(
        &self,
        id: Uuid,
        driver_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<ClaimOutcome, StoreError> {
        self.inner.try_claim(id, driver_id, now).await
    }

    async fn update_status(
        &self,
        _id: Uuid,
        _expected: ShipmentStatus,
        _new_status: ShipmentStatus,
        _now: OffsetDateTime,
    ) -> Result<Option<Shipment>, StoreError> {
        Ok(None)
    }

    async fn append_history(
        &self,
        insert: StatusHistoryInsert,
        recorded_at: OffsetDateTime,
    ) -> Result<StatusHistoryEntry, StoreError> {
        self.inner.append_history(insert, recorded_at).await
    }

    async fn history(&self, shipment_id: Uuid) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        self.inner.history(shipment_id).await
    }

    async fn insert_notification(
        &self,
        insert: NotificationInsert,
        created_at: OffsetDateTime,
    ) -> Result<Notification, StoreError> {
        self.inner.insert_notification(insert, created_at).await
    }

    async fn notifications_for(
        &self,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, StoreError> {
        self.inner.notifications_for(recipient_id).await
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, StoreError> {
        self.inner.mark_notification_read(id, recipient_id).await
    }

    async fn next_order_sequence(&self, year: i32) -> Result<i64, StoreError> {
        self.inner.next_order_sequence(year).await
    }
}

#[tokio::test]
async fn losing_every_status_commit_reports_store_contention() {
    let store = Arc::new(ContestedStore {
        inner: MemoryRecordStore::new(),
    });
    let rooms = Arc::new(RoomTopologyManager::new());
    let dispatcher = Dispatcher::new(store, rooms);
    let shipper = session(Role::Shipper);
    let driver = session(Role::Driver);

    let id = match dispatcher
        .handle(&shipper, Intent::CreateShipment(tashkent_to_samarkand()))
        .await
        .unwrap()
    {
        IntentOutcome::Created(s) => s.id,
        other => panic!("unexpected outcome: {other:?}"),
    };
    dispatcher
        .handle(&driver, Intent::Claim { shipment_id: id })
        .await
        .unwrap();

    // The edge is legal every time we look, yet the commit never applies:
    // that is contention, not an invalid transition.
    let result = dispatcher
        .handle(&driver, update(id, ShipmentStatus::InTransit))
        .await;
    assert_eq!(result.unwrap_err(), DispatchError::StoreUnavailable);
}

#[tokio::test]
async fn notifications_can_only_be_read_by_their_recipient() {
    let h = harness();
    let shipper = session(Role::Shipper);
    create_shipment(&h, &shipper).await;

    let inbox = h.store.notifications_for(shipper.subject_id).await.unwrap();
    let notification = &inbox[0];
    assert!(!notification.read);

    // Someone else marking it read is a no-op.
    assert!(!h
        .store
        .mark_notification_read(notification.id, Uuid::new_v4())
        .await
        .unwrap());

    assert!(h
        .store
        .mark_notification_read(notification.id, shipper.subject_id)
        .await
        .unwrap());
    let inbox = h.store.notifications_for(shipper.subject_id).await.unwrap();
    assert!(inbox[0].read);
}
