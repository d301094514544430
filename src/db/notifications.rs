use super::{column, query_failed, Database};
use crate::error::Result;
use crate::models::{AdminNotification, AdminRole, NewNotification, NotificationFilter};
use crate::store::NotificationStore;
use async_trait::async_trait;
use tokio_postgres::Row;
use tracing::debug;
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str =
    "id, title, message, target_role, notification_type, related_order_id, is_read, created_at";

fn notification_from_row(row: &Row) -> Result<AdminNotification> {
    let role: String = column(row, "target_role")?;

    Ok(AdminNotification {
        id: column(row, "id")?,
        title: column(row, "title")?,
        message: column(row, "message")?,
        target_role: role.parse()?,
        notification_type: column(row, "notification_type")?,
        related_order_id: column(row, "related_order_id")?,
        is_read: column(row, "is_read")?,
        created_at: column(row, "created_at")?,
    })
}

#[async_trait]
impl NotificationStore for Database {
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<AdminNotification>> {
        let client = self.client().await?;

        let sql = format!(
            "SELECT {} FROM admin_notifications
             WHERE ($1::text IS NULL OR target_role = $1)
               AND (NOT $2 OR is_read = FALSE)
             ORDER BY created_at DESC
             LIMIT $3",
            NOTIFICATION_COLUMNS
        );

        let role = filter.role.map(|r| r.as_str());
        let rows = client
            .query(&sql, &[&role, &filter.unread_only, &filter.limit])
            .await
            .map_err(query_failed("fetch notifications"))?;

        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count(&self, role: Option<AdminRole>) -> Result<i64> {
        let client = self.client().await?;

        let role = role.map(|r| r.as_str());
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM admin_notifications
                 WHERE is_read = FALSE AND ($1::text IS NULL OR target_role = $1)",
                &[&role],
            )
            .await
            .map_err(query_failed("count unread notifications"))?;

        row.try_get(0)
            .map_err(query_failed("count unread notifications"))
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<AdminNotification> {
        let client = self.client().await?;

        let sql = format!(
            "INSERT INTO admin_notifications
                 (id, title, message, target_role, notification_type, related_order_id, is_read)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE)
             RETURNING {}",
            NOTIFICATION_COLUMNS
        );

        let id = Uuid::new_v4();
        let row = client
            .query_one(
                &sql,
                &[
                    &id,
                    &notification.title,
                    &notification.message,
                    &notification.target_role.as_str(),
                    &notification.notification_type(),
                    &notification.related_order_id,
                ],
            )
            .await
            .map_err(query_failed("create notification"))?;

        debug!(
            "Created {} notification {}",
            notification.target_role, id
        );
        notification_from_row(&row)
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<AdminNotification>> {
        let client = self.client().await?;

        let sql = format!(
            "UPDATE admin_notifications SET is_read = TRUE WHERE id = $1 RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let row = client
            .query_opt(&sql, &[&id])
            .await
            .map_err(query_failed("mark notification read"))?;

        row.as_ref().map(notification_from_row).transpose()
    }

    async fn mark_all_read(&self, role: Option<AdminRole>) -> Result<u64> {
        let client = self.client().await?;

        let role = role.map(|r| r.as_str());
        client
            .execute(
                "UPDATE admin_notifications SET is_read = TRUE
                 WHERE is_read = FALSE AND ($1::text IS NULL OR target_role = $1)",
                &[&role],
            )
            .await
            .map_err(query_failed("mark notifications read"))
    }

    async fn delete_notification(&self, id: Uuid) -> Result<bool> {
        let client = self.client().await?;

        let deleted = client
            .execute("DELETE FROM admin_notifications WHERE id = $1", &[&id])
            .await
            .map_err(query_failed("delete notification"))?;

        Ok(deleted > 0)
    }
}
