use super::{column, query_failed, Database};
use crate::error::Result;
use crate::models::{Customer, NewCustomer};
use crate::store::CustomerStore;
use async_trait::async_trait;
use tokio_postgres::Row;
use tracing::debug;
use uuid::Uuid;

const CUSTOMER_COLUMNS: &str =
    "id, email, first_name, last_name, phone, company_name, address, created_at";

fn customer_from_row(row: &Row) -> Result<Customer> {
    Ok(Customer {
        id: column(row, "id")?,
        email: column(row, "email")?,
        first_name: column(row, "first_name")?,
        last_name: column(row, "last_name")?,
        phone: column(row, "phone")?,
        company_name: column(row, "company_name")?,
        address: column(row, "address")?,
        created_at: column(row, "created_at")?,
    })
}

#[async_trait]
impl CustomerStore for Database {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let client = self.client().await?;

        let sql = format!(
            "INSERT INTO customers (id, email, first_name, last_name, phone, company_name, address)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            CUSTOMER_COLUMNS
        );

        let row = client
            .query_one(
                &sql,
                &[
                    &customer.id,
                    &customer.email,
                    &customer.first_name,
                    &customer.last_name,
                    &customer.phone,
                    &customer.company_name,
                    &customer.address,
                ],
            )
            .await
            .map_err(query_failed("create customer profile"))?;

        debug!("Inserted customer profile {}", customer.id);
        customer_from_row(&row)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>> {
        let client = self.client().await?;

        let sql = format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS);
        let row = client
            .query_opt(&sql, &[&id])
            .await
            .map_err(query_failed("fetch customer"))?;

        row.as_ref().map(customer_from_row).transpose()
    }
}
