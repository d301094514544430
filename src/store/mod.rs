//! Storage seams used by the HTTP handlers.
//!
//! The production implementation of every trait is [`crate::db::Database`];
//! handler tests run against the in-memory store.

#[cfg(test)]
pub mod memory;

use crate::error::Result;
use crate::models::{
    AdminNotification, AdminRole, Customer, NewCustomer, NewNotification, NewOrder, NewQuota,
    NotificationFilter, Order, OrderStatus, Quota, QuotaPatch, Team,
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer>;
    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Newest first, optionally restricted to one customer
    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn create_order(&self, order: NewOrder) -> Result<Order>;
    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>>;
    async fn delete_order(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn list_quotas(&self) -> Result<Vec<Quota>>;
    async fn get_quota(&self, id: Uuid) -> Result<Option<Quota>>;
    /// Creates the quota and points every listed team back at it
    async fn create_quota(&self, quota: NewQuota) -> Result<Quota>;
    /// Applies the patch; teams dropped from `team_ids` are unlinked
    async fn update_quota(&self, id: Uuid, patch: QuotaPatch) -> Result<Option<Quota>>;
    async fn delete_quota(&self, id: Uuid) -> Result<bool>;
    async fn list_teams(&self) -> Result<Vec<Team>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn list_notifications(&self, filter: &NotificationFilter)
        -> Result<Vec<AdminNotification>>;
    async fn unread_count(&self, role: Option<AdminRole>) -> Result<i64>;
    async fn create_notification(&self, notification: NewNotification)
        -> Result<AdminNotification>;
    async fn mark_read(&self, id: Uuid) -> Result<Option<AdminNotification>>;
    async fn mark_all_read(&self, role: Option<AdminRole>) -> Result<u64>;
    async fn delete_notification(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> bool;
}
