use ofd_sdk::objects::notification::NotificationResponse;
use time::OffsetDateTime;
use uuid::Uuid;

use super::NotificationKind;

/// A directed notification. Created only by the fan-out step after a
/// committed transition; mutated only by the recipient marking it read.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub shipment_id: Uuid,
    pub read: bool,
    pub created_at: OffsetDateTime,
}

impl From<&Notification> for NotificationResponse {
    fn from(n: &Notification) -> Self {
        NotificationResponse {
            id: n.id,
            recipient_id: n.recipient_id,
            kind: n.kind.into(),
            title: n.title.clone(),
            body: n.body.clone(),
            shipment_id: n.shipment_id,
            read: n.read,
            created_at: n.created_at.unix_timestamp(),
        }
    }
}

/// Fields for inserting a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationInsert {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub shipment_id: Uuid,
}

impl Notification {
    pub async fn insert_new(
        pool: &sqlx::PgPool,
        insert: NotificationInsert,
        created_at: OffsetDateTime,
    ) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, recipient_id, kind, title, body, shipment_id, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(insert.recipient_id)
        .bind(insert.kind)
        .bind(insert.title)
        .bind(insert.body)
        .bind(insert.shipment_id)
        .bind(created_at)
        .fetch_one(pool)
        .await
    }

    /// The recipient's notifications, newest first.
    pub async fn list_for_recipient(
        pool: &sqlx::PgPool,
        recipient_id: Uuid,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(recipient_id)
        .fetch_all(pool)
        .await
    }

    /// Mark a notification read. The recipient predicate makes this a no-op
    /// for anyone else's notification; returns whether a row was updated.
    pub async fn mark_read(
        pool: &sqlx::PgPool,
        id: Uuid,
        recipient_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
