//! The authorization gate.
//!
//! Decides, from a session's `(subject id, role)` pair and a requested
//! action, whether the session may observe or mutate a shipment. The gate
//! is the only place that reads identity; everything downstream trusts its
//! verdict (the arbiter's conditional write re-enforces the unclaimed
//! precondition for claims redundantly).

use thiserror::Error;
use uuid::Uuid;

use crate::entities::Role;
use crate::entities::shipments::Shipment;
use crate::lifecycle::Actor;

/// The authenticated identity of a live connection.
///
/// Established once at connect time by the external identity collaborator
/// and immutable for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAuth {
    pub session_id: Uuid,
    pub subject_id: Uuid,
    pub role: Role,
}

/// An action a session can request against a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipmentAction {
    Create,
    Subscribe,
    Claim,
    UpdateStatus,
    Read,
}

/// Denial verdict with the reason a careful caller can log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("forbidden: {0}")]
pub struct Denied(pub &'static str);

/// Resolve the session's relationship to a shipment for the state machine.
pub fn actor_for(session: &SessionAuth, shipment: &Shipment) -> Actor {
    match session.role {
        Role::Admin => Actor::Admin,
        Role::Shipper => {
            if shipment.shipper_id == session.subject_id {
                Actor::Shipper
            } else {
                // A shipper unrelated to the shipment; carries no privilege.
                Actor::OtherDriver
            }
        }
        Role::Driver => {
            if shipment.driver_id == Some(session.subject_id) {
                Actor::AssignedDriver
            } else {
                Actor::OtherDriver
            }
        }
    }
}

/// Allow or deny `action` for `session`.
///
/// `shipment` is `None` only for `Create`, which targets no existing record.
pub fn authorize(
    session: &SessionAuth,
    action: ShipmentAction,
    shipment: Option<&Shipment>,
) -> Result<(), Denied> {
    match action {
        ShipmentAction::Create => match session.role {
            Role::Shipper => Ok(()),
            _ => Err(Denied("only shippers create shipments")),
        },

        ShipmentAction::Claim => match session.role {
            Role::Driver => Ok(()),
            _ => Err(Denied("only drivers claim shipments")),
        },

        ShipmentAction::Subscribe | ShipmentAction::Read => {
            let Some(shipment) = shipment else {
                return Err(Denied("no shipment to observe"));
            };
            let allowed = match session.role {
                Role::Admin => true,
                Role::Shipper => shipment.shipper_id == session.subject_id,
                Role::Driver => {
                    shipment.driver_id == Some(session.subject_id)
                        || shipment.status == crate::entities::ShipmentStatus::Unclaimed
                }
            };
            if allowed {
                Ok(())
            } else {
                Err(Denied("not a party to this shipment"))
            }
        }

        ShipmentAction::UpdateStatus => {
            let Some(shipment) = shipment else {
                return Err(Denied("no shipment to update"));
            };
            let allowed = match session.role {
                Role::Admin => true,
                Role::Shipper => shipment.shipper_id == session.subject_id,
                // An unassigned driver is denied here regardless of whether
                // the requested transition would otherwise be valid.
                Role::Driver => shipment.driver_id == Some(session.subject_id),
            };
            if allowed {
                Ok(())
            } else {
                Err(Denied("not the shipper or assigned driver"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Priority, ShipmentStatus, VehicleType};
    use compact_str::CompactString;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    fn shipment(shipper: Uuid, driver: Option<Uuid>, status: ShipmentStatus) -> Shipment {
        Shipment {
            id: Uuid::new_v4(),
            order_number: CompactString::from("OFD-2026-0001"),
            shipper_id: shipper,
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
            weight_kg: Decimal::new(1200, 0),
            volume_m3: Decimal::new(8, 0),
            vehicle_type: VehicleType::Tent,
            description: String::new(),
            price: Decimal::new(450, 0),
            currency: "USD".into(),
            priority: Priority::Medium,
            status,
            created_at: OffsetDateTime::now_utc(),
            accepted_at: None,
            transit_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    fn session(role: Role) -> SessionAuth {
        SessionAuth {
            session_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn only_shippers_create() {
        assert!(authorize(&session(Role::Shipper), ShipmentAction::Create, None).is_ok());
        assert!(authorize(&session(Role::Driver), ShipmentAction::Create, None).is_err());
        assert!(authorize(&session(Role::Admin), ShipmentAction::Create, None).is_err());
    }

    #[test]
    fn any_driver_may_observe_unclaimed_shipments() {
        let s = shipment(Uuid::new_v4(), None, ShipmentStatus::Unclaimed);
        let driver = session(Role::Driver);
        assert!(authorize(&driver, ShipmentAction::Subscribe, Some(&s)).is_ok());
        assert!(authorize(&driver, ShipmentAction::Read, Some(&s)).is_ok());
    }

    #[test]
    fn claimed_shipments_are_visible_only_to_parties() {
        let assigned = Uuid::new_v4();
        let s = shipment(Uuid::new_v4(), Some(assigned), ShipmentStatus::Accepted);

        let stranger = session(Role::Driver);
        assert!(authorize(&stranger, ShipmentAction::Subscribe, Some(&s)).is_err());

        let driver = SessionAuth {
            subject_id: assigned,
            ..session(Role::Driver)
        };
        assert!(authorize(&driver, ShipmentAction::Subscribe, Some(&s)).is_ok());

        let owner = SessionAuth {
            subject_id: s.shipper_id,
            ..session(Role::Shipper)
        };
        assert!(authorize(&owner, ShipmentAction::Subscribe, Some(&s)).is_ok());

        assert!(authorize(&session(Role::Admin), ShipmentAction::Subscribe, Some(&s)).is_ok());
    }

    #[test]
    fn unassigned_driver_cannot_update_status() {
        let s = shipment(Uuid::new_v4(), Some(Uuid::new_v4()), ShipmentStatus::Accepted);
        let stranger = session(Role::Driver);
        assert_eq!(
            authorize(&stranger, ShipmentAction::UpdateStatus, Some(&s)),
            Err(Denied("not the shipper or assigned driver"))
        );
    }

    #[test]
    fn actor_resolution() {
        let shipper_id = Uuid::new_v4();
        let driver_id = Uuid::new_v4();
        let s = shipment(shipper_id, Some(driver_id), ShipmentStatus::Accepted);

        let owner = SessionAuth {
            subject_id: shipper_id,
            ..session(Role::Shipper)
        };
        assert_eq!(actor_for(&owner, &s), Actor::Shipper);

        let assigned = SessionAuth {
            subject_id: driver_id,
            ..session(Role::Driver)
        };
        assert_eq!(actor_for(&assigned, &s), Actor::AssignedDriver);

        assert_eq!(actor_for(&session(Role::Driver), &s), Actor::OtherDriver);
        assert_eq!(actor_for(&session(Role::Admin), &s), Actor::Admin);
    }
}
