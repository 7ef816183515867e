use compact_str::CompactString;
use ofd_sdk::objects::shipment::{RoutePoint, ShipmentResponse};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Priority, ShipmentStatus, VehicleType};

/// Prefix of human-readable order numbers (`OFD-2026-0042`).
pub const ORDER_NUMBER_PREFIX: &str = "OFD";

/// Format an order number from a year and a per-year sequence value.
pub fn format_order_number(year: i32, sequence: i64) -> CompactString {
    CompactString::from(format!("{ORDER_NUMBER_PREFIX}-{year}-{sequence:04}"))
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Shipment {
    pub id: Uuid,
    pub order_number: CompactString,
    pub shipper_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup_street: CompactString,
    pub pickup_city: CompactString,
    pub pickup_region: CompactString,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_street: CompactString,
    pub dropoff_city: CompactString,
    pub dropoff_region: CompactString,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub weight_kg: Decimal,
    pub volume_m3: Decimal,
    pub vehicle_type: VehicleType,
    pub description: String,
    pub price: Decimal,
    pub currency: CompactString,
    pub priority: Priority,
    pub status: ShipmentStatus,
    pub created_at: OffsetDateTime,
    pub accepted_at: Option<OffsetDateTime>,
    pub transit_at: Option<OffsetDateTime>,
    pub delivered_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
}

impl Shipment {
    pub fn pickup(&self) -> RoutePoint {
        RoutePoint {
            street: self.pickup_street.clone(),
            city: self.pickup_city.clone(),
            region: self.pickup_region.clone(),
            lat: self.pickup_lat,
            lng: self.pickup_lng,
        }
    }

    pub fn dropoff(&self) -> RoutePoint {
        RoutePoint {
            street: self.dropoff_street.clone(),
            city: self.dropoff_city.clone(),
            region: self.dropoff_region.clone(),
            lat: self.dropoff_lat,
            lng: self.dropoff_lng,
        }
    }
}

impl From<&Shipment> for ShipmentResponse {
    fn from(s: &Shipment) -> Self {
        ShipmentResponse {
            id: s.id,
            order_number: s.order_number.clone(),
            shipper_id: s.shipper_id,
            driver_id: s.driver_id,
            pickup: s.pickup(),
            dropoff: s.dropoff(),
            weight_kg: s.weight_kg,
            volume_m3: s.volume_m3,
            vehicle_type: s.vehicle_type.into(),
            description: s.description.clone(),
            price: s.price,
            currency: s.currency.clone(),
            priority: s.priority.into(),
            status: s.status.into(),
            created_at: s.created_at.unix_timestamp(),
            accepted_at: s.accepted_at.map(|t| t.unix_timestamp()),
            transit_at: s.transit_at.map(|t| t.unix_timestamp()),
            delivered_at: s.delivered_at.map(|t| t.unix_timestamp()),
            cancelled_at: s.cancelled_at.map(|t| t.unix_timestamp()),
        }
    }
}

/// Fields needed to insert a new shipment. Status is always `unclaimed`
/// and `driver_id` is always null at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentInsert {
    pub order_number: CompactString,
    pub shipper_id: Uuid,
    pub pickup: RoutePoint,
    pub dropoff: RoutePoint,
    pub weight_kg: Decimal,
    pub volume_m3: Decimal,
    pub vehicle_type: VehicleType,
    pub description: String,
    pub price: Decimal,
    pub currency: CompactString,
    pub priority: Priority,
}

impl Shipment {
    pub async fn insert_new(
        pool: &sqlx::PgPool,
        insert: ShipmentInsert,
    ) -> Result<Shipment, sqlx::Error> {
        sqlx::query_as::<_, Shipment>(
            r#"
            INSERT INTO shipments (
                id, order_number, shipper_id,
                pickup_street, pickup_city, pickup_region, pickup_lat, pickup_lng,
                dropoff_street, dropoff_city, dropoff_region, dropoff_lat, dropoff_lng,
                weight_kg, volume_m3, vehicle_type, description,
                price, currency, priority, status
            )
            VALUES (
                $1, $2, $3,
                $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13,
                $14, $15, $16, $17,
                $18, $19, $20, 'unclaimed'
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(insert.order_number.as_str())
        .bind(insert.shipper_id)
        .bind(insert.pickup.street.as_str())
        .bind(insert.pickup.city.as_str())
        .bind(insert.pickup.region.as_str())
        .bind(insert.pickup.lat)
        .bind(insert.pickup.lng)
        .bind(insert.dropoff.street.as_str())
        .bind(insert.dropoff.city.as_str())
        .bind(insert.dropoff.region.as_str())
        .bind(insert.dropoff.lat)
        .bind(insert.dropoff.lng)
        .bind(insert.weight_kg)
        .bind(insert.volume_m3)
        .bind(insert.vehicle_type)
        .bind(insert.description)
        .bind(insert.price)
        .bind(insert.currency.as_str())
        .bind(insert.priority)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(
        pool: &sqlx::PgPool,
        id: Uuid,
    ) -> Result<Option<Shipment>, sqlx::Error> {
        sqlx::query_as::<_, Shipment>("SELECT * FROM shipments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim an unclaimed shipment for `driver_id`.
    ///
    /// The `WHERE status = 'unclaimed' AND driver_id IS NULL` predicate is
    /// the arbitration point: under N concurrent claims the database applies
    /// the row update exactly once, so at most one caller gets a row back.
    pub async fn try_claim(
        pool: &sqlx::PgPool,
        id: Uuid,
        driver_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<Shipment>, sqlx::Error> {
        sqlx::query_as::<_, Shipment>(
            r#"
            UPDATE shipments
            SET driver_id = $2, status = 'accepted', accepted_at = $3
            WHERE id = $1 AND status = 'unclaimed' AND driver_id IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(driver_id)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    /// Conditionally move a shipment from `expected` to `new_status`,
    /// stamping the transition timestamp exactly once.
    ///
    /// Returns `None` if the shipment's status no longer equals `expected`
    /// (a concurrent transition won), leaving the row untouched.
    pub async fn update_status(
        pool: &sqlx::PgPool,
        id: Uuid,
        expected: ShipmentStatus,
        new_status: ShipmentStatus,
        now: OffsetDateTime,
    ) -> Result<Option<Shipment>, sqlx::Error> {
        let stamp_column = match new_status {
            ShipmentStatus::Accepted => "accepted_at",
            ShipmentStatus::InTransit => "transit_at",
            ShipmentStatus::Delivered => "delivered_at",
            ShipmentStatus::Cancelled => "cancelled_at",
            ShipmentStatus::Unclaimed => "created_at",
        };
        let sql = format!(
            r#"
            UPDATE shipments
            SET status = $2, {stamp_column} = COALESCE({stamp_column}, $3)
            WHERE id = $1 AND status = $4
            RETURNING *
            "#
        );
        sqlx::query_as::<_, Shipment>(&sql)
            .bind(id)
            .bind(new_status)
            .bind(now)
            .bind(expected)
            .fetch_optional(pool)
            .await
    }

    /// Draw the next value of the per-year order-number sequence.
    ///
    /// A single upsert on the sequence row; safe under concurrent creates,
    /// unlike counting existing shipments for the year.
    pub async fn next_order_sequence(pool: &sqlx::PgPool, year: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO order_sequences (period, value)
            VALUES ($1, 1)
            ON CONFLICT (period) DO UPDATE SET value = order_sequences.value + 1
            RETURNING value
            "#,
        )
        .bind(year)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_is_zero_padded() {
        assert_eq!(format_order_number(2026, 42), "OFD-2026-0042");
        assert_eq!(format_order_number(2026, 7), "OFD-2026-0007");
        // Sequences past four digits widen rather than wrap.
        assert_eq!(format_order_number(2026, 12345), "OFD-2026-12345");
    }
}
