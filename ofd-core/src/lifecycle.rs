//! The shipment state machine.
//!
//! A pure transition function over `(current, requested, actor)`. Everything
//! else in the coordinator — arbitration, persistence, fan-out — happens
//! around this table, never inside it.

use thiserror::Error;

use crate::entities::ShipmentStatus;

/// The caller's relationship to the shipment being transitioned, as
/// resolved by the authorization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The shipment's owner.
    Shipper,
    /// The driver currently assigned to the shipment.
    AssignedDriver,
    /// A driver with no assignment on this shipment.
    OtherDriver,
    /// An administrator.
    Admin,
}

/// Why a requested transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The edge is not in the allowed-transition table, or the actor may
    /// not take it.
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },
    /// The shipment is already delivered or cancelled.
    #[error("shipment is already in terminal status {0:?}")]
    AlreadyTerminal(ShipmentStatus),
    /// The requested status equals the current one. Idempotence is
    /// explicit, not silent.
    #[error("shipment is already in status {0:?}")]
    NoOp(ShipmentStatus),
}

/// Validate a requested transition and yield the new status.
pub fn transition(
    current: ShipmentStatus,
    requested: ShipmentStatus,
    actor: Actor,
) -> Result<ShipmentStatus, TransitionError> {
    use ShipmentStatus::*;

    if current.is_terminal() {
        return Err(TransitionError::AlreadyTerminal(current));
    }
    if requested == current {
        return Err(TransitionError::NoOp(current));
    }

    let allowed = match (current, requested) {
        (Unclaimed, Accepted) => matches!(actor, Actor::AssignedDriver | Actor::OtherDriver),
        (Accepted, InTransit) | (InTransit, Delivered) => {
            matches!(actor, Actor::AssignedDriver | Actor::Shipper)
        }
        (Unclaimed | Accepted | InTransit, Cancelled) => {
            matches!(actor, Actor::Shipper | Actor::AssignedDriver | Actor::Admin)
        }
        _ => false,
    };

    if allowed {
        Ok(requested)
    } else {
        Err(TransitionError::InvalidTransition {
            from: current,
            to: requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ShipmentStatus::*;

    const ALL: [ShipmentStatus; 5] = [Unclaimed, Accepted, InTransit, Delivered, Cancelled];

    #[test]
    fn forward_path_for_assigned_driver() {
        assert_eq!(
            transition(Unclaimed, Accepted, Actor::OtherDriver),
            Ok(Accepted)
        );
        assert_eq!(
            transition(Accepted, InTransit, Actor::AssignedDriver),
            Ok(InTransit)
        );
        assert_eq!(
            transition(InTransit, Delivered, Actor::AssignedDriver),
            Ok(Delivered)
        );
    }

    #[test]
    fn shipper_may_drive_progress_but_not_claim() {
        assert_eq!(
            transition(Accepted, InTransit, Actor::Shipper),
            Ok(InTransit)
        );
        assert_eq!(
            transition(InTransit, Delivered, Actor::Shipper),
            Ok(Delivered)
        );
        assert_eq!(
            transition(Unclaimed, Accepted, Actor::Shipper),
            Err(TransitionError::InvalidTransition {
                from: Unclaimed,
                to: Accepted
            })
        );
    }

    #[test]
    fn cancellation_from_every_non_terminal_state() {
        for current in [Unclaimed, Accepted, InTransit] {
            for actor in [Actor::Shipper, Actor::AssignedDriver, Actor::Admin] {
                assert_eq!(transition(current, Cancelled, actor), Ok(Cancelled));
            }
            assert_eq!(
                transition(current, Cancelled, Actor::OtherDriver),
                Err(TransitionError::InvalidTransition {
                    from: current,
                    to: Cancelled
                })
            );
        }
    }

    #[test]
    fn unassigned_driver_cannot_progress() {
        assert!(matches!(
            transition(Accepted, InTransit, Actor::OtherDriver),
            Err(TransitionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            transition(InTransit, Delivered, Actor::OtherDriver),
            Err(TransitionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for terminal in [Delivered, Cancelled] {
            for requested in ALL {
                assert_eq!(
                    transition(terminal, requested, Actor::Admin),
                    Err(TransitionError::AlreadyTerminal(terminal))
                );
            }
        }
    }

    #[test]
    fn requesting_current_status_is_an_explicit_noop() {
        for current in [Unclaimed, Accepted, InTransit] {
            assert_eq!(
                transition(current, current, Actor::Shipper),
                Err(TransitionError::NoOp(current))
            );
        }
    }

    #[test]
    fn every_edge_outside_the_table_is_invalid() {
        // Exhaustive sweep: anything the named rules don't allow must come
        // back InvalidTransition (terminal and no-op cases are covered by
        // their own errors above).
        for current in [Unclaimed, Accepted, InTransit] {
            for requested in ALL {
                if requested == current {
                    continue;
                }
                let allowed_somewhere = [
                    Actor::Shipper,
                    Actor::AssignedDriver,
                    Actor::OtherDriver,
                    Actor::Admin,
                ]
                .iter()
                .any(|a| transition(current, requested, *a).is_ok());
                let in_table = matches!(
                    (current, requested),
                    (Unclaimed, Accepted)
                        | (Accepted, InTransit)
                        | (InTransit, Delivered)
                        | (Unclaimed | Accepted | InTransit, Cancelled)
                );
                assert_eq!(allowed_somewhere, in_table, "{current:?} -> {requested:?}");
            }
        }
    }
}
