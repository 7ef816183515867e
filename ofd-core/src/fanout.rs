//! Notification fan-out.
//!
//! Translates one committed transition into the set of directed
//! notifications and room publications it owes. The rule table is a pure
//! function ([`plan`]) so tests can assert completeness; [`Fanout::execute`]
//! persists each notification and publishes the live events. Fan-out runs
//! only after the record store commit succeeded, and its own failures are
//! logged rather than surfaced — the transition is already durable.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::entities::NotificationKind;
use crate::entities::notifications::NotificationInsert;
use crate::entities::shipments::Shipment;
use crate::entities::ShipmentStatus;
use crate::rooms::{RoomEvent, RoomTopologyManager, Topic};
use crate::store::RecordStore;

/// A transition that has durably committed and now needs fanning out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommittedTransition {
    /// The shipment was just created (status `unclaimed`).
    Created,
    /// A driver won the claim.
    Accepted,
    /// Forward progress: `accepted → in_transit` or `in_transit → delivered`.
    Progressed {
        old: ShipmentStatus,
        new: ShipmentStatus,
    },
    /// The shipment was cancelled from `old`.
    Cancelled { old: ShipmentStatus },
}

/// Compute the exact notification set a committed transition produces.
pub fn plan(shipment: &Shipment, transition: CommittedTransition) -> Vec<NotificationInsert> {
    let order = shipment.order_number.as_str();
    let mut notifications = Vec::with_capacity(2);

    match transition {
        CommittedTransition::Created => {
            notifications.push(NotificationInsert {
                recipient_id: shipment.shipper_id,
                kind: NotificationKind::Created,
                title: format!("Shipment {order} created"),
                body: format!(
                    "Your shipment {order} ({} → {}) is listed and waiting for a driver.",
                    shipment.pickup_city, shipment.dropoff_city
                ),
                shipment_id: shipment.id,
            });
        }

        CommittedTransition::Accepted => {
            notifications.push(NotificationInsert {
                recipient_id: shipment.shipper_id,
                kind: NotificationKind::Accepted,
                title: format!("Shipment {order} accepted"),
                body: format!("A driver accepted your shipment {order}."),
                shipment_id: shipment.id,
            });
            if let Some(driver_id) = shipment.driver_id {
                notifications.push(NotificationInsert {
                    recipient_id: driver_id,
                    kind: NotificationKind::Accepted,
                    title: format!("You accepted {order}"),
                    body: format!(
                        "You are now assigned to shipment {order} ({} → {}).",
                        shipment.pickup_city, shipment.dropoff_city
                    ),
                    shipment_id: shipment.id,
                });
            }
        }

        CommittedTransition::Progressed { new, .. } => {
            let phase = match new {
                ShipmentStatus::InTransit => "in transit",
                ShipmentStatus::Delivered => "delivered",
                _ => "updated",
            };
            notifications.push(NotificationInsert {
                recipient_id: shipment.shipper_id,
                kind: NotificationKind::StatusChanged,
                title: format!("Shipment {order} {phase}"),
                body: format!("Your shipment {order} is now {phase}."),
                shipment_id: shipment.id,
            });
            if let Some(driver_id) = shipment.driver_id {
                notifications.push(NotificationInsert {
                    recipient_id: driver_id,
                    kind: NotificationKind::StatusChanged,
                    title: format!("Shipment {order} {phase}"),
                    body: format!("Shipment {order} you are driving is now {phase}."),
                    shipment_id: shipment.id,
                });
            }
        }

        CommittedTransition::Cancelled { .. } => {
            notifications.push(NotificationInsert {
                recipient_id: shipment.shipper_id,
                kind: NotificationKind::Cancelled,
                title: format!("Shipment {order} cancelled"),
                body: format!("Shipment {order} was cancelled."),
                shipment_id: shipment.id,
            });
            if let Some(driver_id) = shipment.driver_id {
                notifications.push(NotificationInsert {
                    recipient_id: driver_id,
                    kind: NotificationKind::Cancelled,
                    title: format!("Shipment {order} cancelled"),
                    body: format!("Shipment {order} you were assigned to was cancelled."),
                    shipment_id: shipment.id,
                });
            }
        }
    }

    notifications
}

/// Executes fan-out against the store and room registry.
pub struct Fanout {
    rooms: Arc<RoomTopologyManager>,
}

impl Fanout {
    pub fn new(rooms: Arc<RoomTopologyManager>) -> Self {
        Self { rooms }
    }

    /// Persist and publish everything a committed transition owes.
    pub async fn execute(
        &self,
        store: &dyn RecordStore,
        shipment: &Shipment,
        transition: CommittedTransition,
    ) {
        let now = OffsetDateTime::now_utc();

        for insert in plan(shipment, transition) {
            let recipient_id = insert.recipient_id;
            match store.insert_notification(insert, now).await {
                Ok(notification) => {
                    self.rooms
                        .publish(
                            &Topic::User(recipient_id),
                            RoomEvent::NotificationCreated {
                                notification: (&notification).into(),
                            },
                        )
                        .await;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        %recipient_id,
                        shipment_id = %shipment.id,
                        "failed to persist notification"
                    );
                }
            }
        }

        self.publish_rooms(shipment, transition).await;
    }

    async fn publish_rooms(&self, shipment: &Shipment, transition: CommittedTransition) {
        let response = ofd_sdk::objects::shipment::ShipmentResponse::from(shipment);
        let shipment_topic = Topic::Shipment(shipment.id);

        match transition {
            CommittedTransition::Created => {
                let listed = RoomEvent::PoolListed {
                    shipment: response.clone(),
                };
                self.rooms.publish(&Topic::DriverPool, listed.clone()).await;
                self.rooms
                    .publish(&Topic::Region(shipment.pickup_city.clone()), listed)
                    .await;
            }

            CommittedTransition::Accepted => {
                self.rooms
                    .publish(
                        &shipment_topic,
                        RoomEvent::ShipmentAccepted {
                            shipment: response.clone(),
                        },
                    )
                    .await;
                self.rooms
                    .publish(
                        &shipment_topic,
                        RoomEvent::StatusChanged {
                            shipment: response,
                            old_status: ofd_sdk::objects::ShipmentStatus::Unclaimed,
                            new_status: ofd_sdk::objects::ShipmentStatus::Accepted,
                        },
                    )
                    .await;
                // Retract the listing from every other driver's pool view.
                self.rooms
                    .publish(
                        &Topic::DriverPool,
                        RoomEvent::PoolRemoved {
                            shipment_id: shipment.id,
                        },
                    )
                    .await;
            }

            CommittedTransition::Progressed { old, new } => {
                self.rooms
                    .publish(
                        &shipment_topic,
                        RoomEvent::StatusChanged {
                            shipment: response,
                            old_status: old.into(),
                            new_status: new.into(),
                        },
                    )
                    .await;
            }

            CommittedTransition::Cancelled { old } => {
                self.rooms
                    .publish(
                        &shipment_topic,
                        RoomEvent::StatusChanged {
                            shipment: response,
                            old_status: old.into(),
                            new_status: ofd_sdk::objects::ShipmentStatus::Cancelled,
                        },
                    )
                    .await;
                if old == ShipmentStatus::Unclaimed {
                    // The listing never got claimed; pull it from the pool.
                    self.rooms
                        .publish(
                            &Topic::DriverPool,
                            RoomEvent::PoolRemoved {
                                shipment_id: shipment.id,
                            },
                        )
                        .await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Priority, VehicleType};
    use compact_str::CompactString;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn shipment(driver: Option<Uuid>) -> Shipment {
        Shipment {
            id: Uuid::new_v4(),
            order_number: CompactString::from("OFD-2026-0009"),
            shipper_id: Uuid::new_v4(),
            driver_id: driver,
            pickup_street: "Amir Temur 1".into(),
            pickup_city: "Tashkent".into(),
            pickup_region: "Tashkent".into(),
            pickup_lat: 41.31,
            pickup_lng: 69.24,
            dropoff_street: "Registan 1".into(),
            dropoff_city: "Samarkand".into(),
            dropoff_region: "Samarkand".into(),
            dropoff_lat: 39.65,
            dropoff_lng: 66.96,
            weight_kg: Decimal::new(500, 0),
            volume_m3: Decimal::new(4, 0),
            vehicle_type: VehicleType::Van,
            description: String::new(),
            price: Decimal::new(300, 0),
            currency: "USD".into(),
            priority: Priority::High,
            status: crate::entities::ShipmentStatus::Unclaimed,
            created_at: OffsetDateTime::now_utc(),
            accepted_at: None,
            transit_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn created_notifies_shipper_only() {
        let s = shipment(None);
        let drafts = plan(&s, CommittedTransition::Created);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].recipient_id, s.shipper_id);
        assert_eq!(drafts[0].kind, NotificationKind::Created);
    }

    #[test]
    fn accepted_notifies_shipper_and_driver() {
        let driver = Uuid::new_v4();
        let s = shipment(Some(driver));
        let drafts = plan(&s, CommittedTransition::Accepted);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].recipient_id, s.shipper_id);
        assert_eq!(drafts[1].recipient_id, driver);
        assert!(drafts.iter().all(|d| d.kind == NotificationKind::Accepted));
    }

    #[test]
    fn progressed_copy_is_role_specific() {
        let driver = Uuid::new_v4();
        let s = shipment(Some(driver));
        let drafts = plan(
            &s,
            CommittedTransition::Progressed {
                old: crate::entities::ShipmentStatus::Accepted,
                new: crate::entities::ShipmentStatus::InTransit,
            },
        );
        assert_eq!(drafts.len(), 2);
        assert!(drafts[0].body.starts_with("Your shipment"));
        assert!(drafts[1].body.contains("you are driving"));
    }

    #[test]
    fn cancelled_without_driver_notifies_shipper_only() {
        let s = shipment(None);
        let drafts = plan(
            &s,
            CommittedTransition::Cancelled {
                old: crate::entities::ShipmentStatus::Unclaimed,
            },
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].recipient_id, s.shipper_id);
        assert_eq!(drafts[0].kind, NotificationKind::Cancelled);
    }
}
