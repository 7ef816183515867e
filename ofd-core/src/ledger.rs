//! The audit/history ledger.
//!
//! Appends one immutable record for every accepted transition (creation
//! included) and reads them back ordered by time. Entries are never
//! mutated; the shipment row only ever references them.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::ShipmentStatus;
use crate::entities::status_history::{StatusHistoryEntry, StatusHistoryInsert};
use crate::store::{RecordStore, StoreError};

pub struct Ledger {
    store: Arc<dyn RecordStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Append an entry for a transition that has already committed.
    pub async fn append(
        &self,
        insert: StatusHistoryInsert,
    ) -> Result<StatusHistoryEntry, StoreError> {
        self.store
            .append_history(insert, OffsetDateTime::now_utc())
            .await
    }

    /// Full history of a shipment, oldest entry first.
    pub async fn read(&self, shipment_id: Uuid) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        self.store.history(shipment_id).await
    }
}

/// Whether a sequence of statuses forms a valid walk through the state
/// machine starting at creation.
pub fn is_valid_path(statuses: &[ShipmentStatus]) -> bool {
    let Some((first, rest)) = statuses.split_first() else {
        return false;
    };
    if *first != ShipmentStatus::Unclaimed {
        return false;
    }
    let mut current = *first;
    for status in rest {
        let ok = matches!(
            (current, *status),
            (ShipmentStatus::Unclaimed, ShipmentStatus::Accepted)
                | (ShipmentStatus::Accepted, ShipmentStatus::InTransit)
                | (ShipmentStatus::InTransit, ShipmentStatus::Delivered)
                | (
                    ShipmentStatus::Unclaimed
                        | ShipmentStatus::Accepted
                        | ShipmentStatus::InTransit,
                    ShipmentStatus::Cancelled
                )
        );
        if !ok {
            return false;
        }
        current = *status;
    }
    true
}
