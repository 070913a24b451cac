//! # Notification Repository
//!
//! In-app notifications for deliveries and new bills.
//!
//! Notifications are written inside the business transaction that caused
//! them, but they are best effort: a failed insert is logged and the
//! transaction carries on.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use super::new_id;
use crate::error::DbResult;
use freight_core::{Notification, NotificationKind};

/// Default number of notifications returned by [`NotificationRepository::recent`].
pub const DEFAULT_RECENT_LIMIT: u32 = 20;

/// Repository for notifications.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Most recent notifications, newest first.
    pub async fn recent(&self, limit: Option<u32>) -> DbResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, super::MAX_PAGE_SIZE);
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, kind, title, message, entity_type, entity_id, is_read, created_at
            FROM notifications
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    pub async fn unread_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE is_read = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Marks one notification read. Returns false if it does not exist.
    pub async fn mark_read(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Marks everything read. Returns how many changed.
    pub async fn mark_all_read(&self) -> DbResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE is_read = 0")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// What to notify about.
pub(crate) struct NewNotification<'a> {
    pub kind: NotificationKind,
    pub title: &'a str,
    pub message: String,
    pub entity_type: &'a str,
    pub entity_id: &'a str,
}

/// Inserts a notification, logging instead of failing.
pub(crate) async fn notify(conn: &mut SqliteConnection, note: NewNotification<'_>) {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (id, kind, title, message, entity_type, entity_id, is_read, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
        "#,
    )
    .bind(new_id())
    .bind(note.kind)
    .bind(note.title)
    .bind(&note.message)
    .bind(note.entity_type)
    .bind(note.entity_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => debug!(kind = ?note.kind, entity_id = %note.entity_id, "Notification created"),
        Err(e) => warn!(
            kind = ?note.kind,
            entity_id = %note.entity_id,
            error = %e,
            "Failed to create notification"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::setup;

    async fn insert(db: &crate::Database, message: &str) {
        let mut conn = db.pool().acquire().await.unwrap();
        notify(
            &mut conn,
            NewNotification {
                kind: NotificationKind::Delivery,
                title: "Consignment Delivered",
                message: message.to_string(),
                entity_type: "consignment",
                entity_id: "c-1",
            },
        )
        .await;
    }

    #[tokio::test]
    async fn test_recent_and_read_flags() {
        let db = setup().await;
        insert(&db, "GR GR0001 has been delivered").await;
        insert(&db, "GR GR0002 has been delivered").await;

        let repo = db.notifications();
        let recent = repo.recent(None).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "GR GR0002 has been delivered");
        assert_eq!(repo.unread_count().await.unwrap(), 2);

        assert!(repo.mark_read(&recent[0].id).await.unwrap());
        assert!(!repo.mark_read("missing").await.unwrap());
        assert_eq!(repo.unread_count().await.unwrap(), 1);

        assert_eq!(repo.mark_all_read().await.unwrap(), 1);
        assert_eq!(repo.unread_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_is_swallowed() {
        let db = setup().await;
        sqlx::query("DROP TABLE notifications")
            .execute(db.pool())
            .await
            .unwrap();

        // Must not panic or return an error.
        insert(&db, "lost").await;
    }
}
