use ofd_sdk::objects::shipment::HistoryEntryResponse;
use time::OffsetDateTime;
use uuid::Uuid;

use super::ShipmentStatus;

/// One immutable entry of a shipment's audit trail.
///
/// Owned by the ledger: appended after every committed transition,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub shipment_id: Uuid,
    pub status: ShipmentStatus,
    pub actor_id: Uuid,
    pub recorded_at: OffsetDateTime,
    pub note: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl From<&StatusHistoryEntry> for HistoryEntryResponse {
    fn from(e: &StatusHistoryEntry) -> Self {
        HistoryEntryResponse {
            status: e.status.into(),
            actor_id: e.actor_id,
            recorded_at: e.recorded_at.unix_timestamp(),
            note: e.note.clone(),
            lat: e.lat,
            lng: e.lng,
        }
    }
}

/// Fields for appending a history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusHistoryInsert {
    pub shipment_id: Uuid,
    pub status: ShipmentStatus,
    pub actor_id: Uuid,
    pub note: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl StatusHistoryEntry {
    pub async fn insert_new(
        pool: &sqlx::PgPool,
        insert: StatusHistoryInsert,
        recorded_at: OffsetDateTime,
    ) -> Result<StatusHistoryEntry, sqlx::Error> {
        sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            INSERT INTO status_history (id, shipment_id, status, actor_id, recorded_at, note, lat, lng)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(insert.shipment_id)
        .bind(insert.status)
        .bind(insert.actor_id)
        .bind(recorded_at)
        .bind(insert.note)
        .bind(insert.lat)
        .bind(insert.lng)
        .fetch_one(pool)
        .await
    }

    /// All entries for a shipment, oldest first.
    pub async fn list_for_shipment(
        pool: &sqlx::PgPool,
        shipment_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, StatusHistoryEntry>(
            "SELECT * FROM status_history WHERE shipment_id = $1 ORDER BY recorded_at, id",
        )
        .bind(shipment_id)
        .fetch_all(pool)
        .await
    }
}
