//! The acceptance arbiter.
//!
//! Resolves the race where multiple drivers simultaneously try to claim the
//! same unclaimed shipment. The whole decision is one conditional write
//! against the record store ("set driver and status iff still unclaimed"),
//! checked by rows affected — a read-then-write sequence here would let two
//! drivers both observe "unclaimed" and both commit. No in-process lock is
//! held across the call, so arbitration stays correct when multiple
//! coordinator instances share one store.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::shipments::Shipment;
use crate::store::{ClaimOutcome, RecordStore, StoreError};

/// Result of a claim attempt, before error mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimResult {
    /// This driver won; the returned shipment is already `accepted`.
    Won(Shipment),
    /// Another driver's conditional write landed first.
    Lost,
    /// The shipment id does not resolve.
    NotFound,
}

/// Attempt to atomically claim `shipment_id` for `driver_id`.
///
/// On `Lost` and `NotFound` no side effect has happened at all — history
/// append and fan-out belong to the winner alone.
pub async fn claim(
    store: &dyn RecordStore,
    shipment_id: Uuid,
    driver_id: Uuid,
) -> Result<ClaimResult, StoreError> {
    let now = OffsetDateTime::now_utc();
    match store.try_claim(shipment_id, driver_id, now).await? {
        ClaimOutcome::Claimed(shipment) => {
            tracing::info!(
                %shipment_id,
                %driver_id,
                order_number = %shipment.order_number,
                "shipment claimed"
            );
            Ok(ClaimResult::Won(shipment))
        }
        ClaimOutcome::AlreadyClaimed => {
            tracing::debug!(%shipment_id, %driver_id, "claim lost the race");
            Ok(ClaimResult::Lost)
        }
        ClaimOutcome::NotFound => Ok(ClaimResult::NotFound),
    }
}
