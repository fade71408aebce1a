use async_trait::async_trait;
use sqlx::sqlite::SqliteExecutor;
use sqlx::Row;

use travo_core::notify::NotificationId;
use travo_core::{ActorId, Notification, NotificationKind, NotificationSink, OrderId, SinkError};

use super::{decode_datetime, RepositoryError};
use crate::DbPool;

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let recipient_id: String =
        row.try_get("recipient_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_id: Option<String> =
        row.try_get("order_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_raw: String =
        row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message: String =
        row.try_get("message").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_read: bool =
        row.try_get("is_read").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let kind = NotificationKind::parse_code(&kind_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown notification kind `{kind_raw}`")))?;

    Ok(Notification {
        id: NotificationId(id),
        recipient: ActorId(recipient_id),
        order_id: order_id.map(OrderId),
        kind,
        title,
        message,
        is_read,
        created_at: decode_datetime(&created_at)?,
    })
}

pub async fn insert<'e, E>(executor: E, notification: &Notification) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO notification (id, recipient_id, order_id, kind, title, message, is_read, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&notification.id.0)
    .bind(&notification.recipient.0)
    .bind(notification.order_id.as_ref().map(|id| id.0.clone()))
    .bind(notification.kind.as_code())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.is_read)
    .bind(notification.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

pub struct SqlNotificationStore {
    pool: DbPool,
}

impl SqlNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_recipient(
        &self,
        recipient: &ActorId,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, recipient_id, order_id, kind, title, message, is_read, created_at
             FROM notification WHERE recipient_id = ? ORDER BY created_at DESC",
        )
        .bind(&recipient.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_notification).collect()
    }

    pub async fn unread_count(&self, recipient: &ActorId) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notification WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(&recipient.0)
        .fetch_one(&self.pool)
        .await?;

        row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    pub async fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE notification SET is_read = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, recipient: &ActorId) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE notification SET is_read = 1 WHERE recipient_id = ? AND is_read = 0")
                .bind(&recipient.0)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

/// Persisting sink: each delivery becomes a notification row the recipient
/// can list and mark read later. Failures surface as `SinkError`; callers
/// treat delivery as best-effort.
#[derive(Clone)]
pub struct SqlNotificationSink {
    pool: DbPool,
}

impl SqlNotificationSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for SqlNotificationSink {
    async fn deliver(&self, notification: Notification) -> Result<(), SinkError> {
        insert(&self.pool, &notification).await.map_err(|error| SinkError(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use travo_core::{ActorId, Notification, NotificationKind, NotificationSink, OrderId};

    use super::{SqlNotificationSink, SqlNotificationStore};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn notification(recipient: &str) -> Notification {
        Notification::new(
            ActorId::new(recipient),
            Some(OrderId::new("TO-1")),
            NotificationKind::ApprovalRequested,
            "Travel order awaiting your approval",
            "A travel order to Capital City is ready for your review.",
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn sink_persists_and_store_lists() {
        let pool = setup().await;
        let sink = SqlNotificationSink::new(pool.clone());
        let store = SqlNotificationStore::new(pool);

        sink.deliver(notification("u-harbor")).await.expect("deliver");
        sink.deliver(notification("u-harbor")).await.expect("deliver");
        sink.deliver(notification("u-clerk")).await.expect("deliver");

        let inbox = store.list_for_recipient(&ActorId::new("u-harbor")).await.expect("list");
        assert_eq!(inbox.len(), 2);
        assert_eq!(store.unread_count(&ActorId::new("u-harbor")).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn read_tracking_clears_the_unread_count() {
        let pool = setup().await;
        let sink = SqlNotificationSink::new(pool.clone());
        let store = SqlNotificationStore::new(pool);

        sink.deliver(notification("u-harbor")).await.expect("deliver");
        let inbox = store.list_for_recipient(&ActorId::new("u-harbor")).await.expect("list");
        assert!(store.mark_read(&inbox[0].id).await.expect("mark"));
        assert_eq!(store.unread_count(&ActorId::new("u-harbor")).await.expect("count"), 0);

        sink.deliver(notification("u-harbor")).await.expect("deliver");
        sink.deliver(notification("u-harbor")).await.expect("deliver");
        assert_eq!(store.mark_all_read(&ActorId::new("u-harbor")).await.expect("mark all"), 2);
    }
}
