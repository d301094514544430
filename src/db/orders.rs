use super::{column, query_failed, Database};
use crate::error::Result;
use crate::models::{NewOrder, Order, OrderStatus};
use crate::store::OrderStore;
use async_trait::async_trait;
use tokio_postgres::Row;
use tracing::debug;
use uuid::Uuid;

const ORDER_COLUMNS: &str =
    "id, user_id, hanger_type, quantity, total_amount, status, notes, created_at, updated_at";

fn order_from_row(row: &Row) -> Result<Order> {
    let status: String = column(row, "status")?;

    Ok(Order {
        id: column(row, "id")?,
        user_id: column(row, "user_id")?,
        hanger_type: column(row, "hanger_type")?,
        quantity: column(row, "quantity")?,
        total_amount: column(row, "total_amount")?,
        status: status.parse()?,
        notes: column(row, "notes")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

#[async_trait]
impl OrderStore for Database {
    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let client = self.client().await?;

        let sql = format!(
            "SELECT {} FROM orders
             WHERE ($1::uuid IS NULL OR user_id = $1)
             ORDER BY created_at DESC",
            ORDER_COLUMNS
        );

        let rows = client
            .query(&sql, &[&user_id])
            .await
            .map_err(query_failed("fetch orders"))?;

        rows.iter().map(order_from_row).collect()
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let client = self.client().await?;

        let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
        let row = client
            .query_opt(&sql, &[&id])
            .await
            .map_err(query_failed("fetch order"))?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let client = self.client().await?;

        let sql = format!(
            "INSERT INTO orders (id, user_id, hanger_type, quantity, total_amount, status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            ORDER_COLUMNS
        );

        let id = Uuid::new_v4();
        let row = client
            .query_one(
                &sql,
                &[
                    &id,
                    &order.user_id,
                    &order.hanger_type,
                    &order.quantity,
                    &order.total_amount,
                    &OrderStatus::Pending.as_str(),
                    &order.notes,
                ],
            )
            .await
            .map_err(query_failed("create order"))?;

        debug!("Created order {} for user {}", id, order.user_id);
        order_from_row(&row)
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
        let client = self.client().await?;

        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        );

        let row = client
            .query_opt(&sql, &[&id, &status.as_str()])
            .await
            .map_err(query_failed("update order status"))?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        let client = self.client().await?;

        let deleted = client
            .execute("DELETE FROM orders WHERE id = $1", &[&id])
            .await
            .map_err(query_failed("delete order"))?;

        Ok(deleted > 0)
    }
}
