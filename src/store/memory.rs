//! In-memory stores for handler tests.
//!
//! Mirrors the Postgres stores' observable behavior under one mutex. The SQL
//! relink path itself is covered by the ignored tests in `db::quotas`.

use super::{CustomerStore, HealthProbe, NotificationStore, OrderStore, QuotaStore};
use crate::error::{ApiError, Result};
use crate::models::{
    progress_percentage, unknown_teams, AdminNotification, AdminRole, Customer, NewCustomer, NewNotification,
    NewOrder, NewQuota, NotificationFilter, Order, OrderStatus, Quota, QuotaPatch, Team,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    orders: Vec<Order>,
    quotas: Vec<Quota>,
    teams: Vec<Team>,
    notifications: Vec<AdminNotification>,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    healthy: AtomicBool,
    fail_notifications: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            healthy: AtomicBool::new(true),
            fail_notifications: AtomicBool::new(false),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make every notification insert fail
    pub fn fail_notifications(&self) {
        self.fail_notifications.store(true, Ordering::SeqCst);
    }

    pub fn add_team(&self, name: &str) -> Team {
        let team = Team {
            id: Uuid::new_v4(),
            team_name: name.to_string(),
            members: vec![format!("{} lead", name)],
            assigned_quota_id: None,
            created_at: Utc::now(),
        };
        self.lock().teams.push(team.clone());
        team
    }

    pub fn team(&self, id: Uuid) -> Option<Team> {
        self.lock().teams.iter().find(|t| t.id == id).cloned()
    }

    pub fn notifications(&self) -> Vec<AdminNotification> {
        self.lock().notifications.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }
}

impl Tables {
    fn with_teams(&self, mut quota: Quota) -> Quota {
        quota.teams = self
            .teams
            .iter()
            .filter(|t| quota.team_ids.contains(&t.id))
            .cloned()
            .collect();
        quota
    }

    fn check_teams(&self, team_ids: &[Uuid]) -> Result<()> {
        let missing: Vec<Uuid> = team_ids
            .iter()
            .filter(|id| !self.teams.iter().any(|t| t.id == **id))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(unknown_teams(&missing))
        }
    }

    fn relink_teams(&mut self, quota_id: Uuid, team_ids: &[Uuid]) {
        for team in &mut self.teams {
            if team_ids.contains(&team.id) {
                team.assigned_quota_id = Some(quota_id);
            } else if team.assigned_quota_id == Some(quota_id) {
                team.assigned_quota_id = None;
            }
        }
        for quota in &mut self.quotas {
            if quota.id != quota_id {
                quota.team_ids.retain(|id| !team_ids.contains(id));
            }
        }
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn create_customer(&self, customer: NewCustomer) -> Result<Customer> {
        let mut tables = self.lock();
        if tables.customers.iter().any(|c| c.id == customer.id) {
            return Err(ApiError::Database {
                operation: "create customer",
                cause: "duplicate key value violates unique constraint".to_string(),
            });
        }

        let row = Customer {
            id: customer.id,
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
            phone: customer.phone,
            company_name: customer.company_name,
            address: customer.address,
            created_at: Utc::now(),
        };
        tables.customers.push(row.clone());
        Ok(row)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>> {
        Ok(self.lock().customers.iter().find(|c| c.id == id).cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let tables = self.lock();
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| user_id.map_or(true, |id| o.user_id == id))
            .cloned()
            .collect();
        orders.reverse();
        Ok(orders)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let row = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            hanger_type: order.hanger_type,
            quantity: order.quantity,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            notes: order.notes,
            created_at: now,
            updated_at: now,
        };
        self.lock().orders.push(row.clone());
        Ok(row)
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
        let mut tables = self.lock();
        Ok(tables.orders.iter_mut().find(|o| o.id == id).map(|o| {
            o.status = status;
            o.updated_at = Utc::now();
            o.clone()
        }))
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.lock();
        let before = tables.orders.len();
        tables.orders.retain(|o| o.id != id);
        Ok(tables.orders.len() < before)
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn list_quotas(&self) -> Result<Vec<Quota>> {
        let tables = self.lock();
        Ok(tables
            .quotas
            .iter()
            .rev()
            .map(|q| tables.with_teams(q.clone()))
            .collect())
    }

    async fn get_quota(&self, id: Uuid) -> Result<Option<Quota>> {
        let tables = self.lock();
        Ok(tables
            .quotas
            .iter()
            .find(|q| q.id == id)
            .map(|q| tables.with_teams(q.clone())))
    }

    async fn create_quota(&self, quota: NewQuota) -> Result<Quota> {
        let mut tables = self.lock();
        tables.check_teams(&quota.team_ids)?;
        let now = Utc::now();
        let row = Quota {
            id: Uuid::new_v4(),
            progress_percentage: progress_percentage(
                i64::from(quota.finished_quantity),
                i64::from(quota.target_quantity),
            ),
            quota_name: quota.quota_name,
            target_quantity: quota.target_quantity,
            finished_quantity: quota.finished_quantity,
            start_date: quota.start_date,
            end_date: quota.end_date,
            status: quota.status,
            team_ids: quota.team_ids,
            assigned_orders: quota.assigned_orders,
            teams: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let team_ids = row.team_ids.clone();
        tables.quotas.push(row.clone());
        tables.relink_teams(row.id, &team_ids);
        Ok(tables.with_teams(row))
    }

    async fn update_quota(&self, id: Uuid, patch: QuotaPatch) -> Result<Option<Quota>> {
        let mut tables = self.lock();
        let Some(index) = tables.quotas.iter().position(|q| q.id == id) else {
            return Ok(None);
        };

        let relink = patch.team_ids.is_some();
        let mut quota = tables.quotas[index].clone();
        patch.apply(&mut quota)?;
        if relink {
            tables.check_teams(&quota.team_ids)?;
        }
        quota.updated_at = Utc::now();

        let team_ids = quota.team_ids.clone();
        tables.quotas[index] = quota.clone();
        if relink {
            tables.relink_teams(id, &team_ids);
        }
        Ok(Some(tables.with_teams(quota)))
    }

    async fn delete_quota(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.lock();
        let before = tables.quotas.len();
        tables.quotas.retain(|q| q.id != id);
        if tables.quotas.len() == before {
            return Ok(false);
        }
        tables.relink_teams(id, &[]);
        Ok(true)
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let mut teams = self.lock().teams.clone();
        teams.sort_by(|a, b| a.team_name.cmp(&b.team_name));
        Ok(teams)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn list_notifications(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<AdminNotification>> {
        let tables = self.lock();
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| filter.role.map_or(true, |r| n.target_role == r))
            .filter(|n| !filter.unread_only || !n.is_read)
            .take(usize::try_from(filter.limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn unread_count(&self, role: Option<AdminRole>) -> Result<i64> {
        let tables = self.lock();
        let count = tables
            .notifications
            .iter()
            .filter(|n| !n.is_read && role.map_or(true, |r| n.target_role == r))
            .count();
        Ok(count as i64)
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> Result<AdminNotification> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(ApiError::Database {
                operation: "create notification",
                cause: "permission denied for table admin_notifications".to_string(),
            });
        }

        let row = AdminNotification {
            id: Uuid::new_v4(),
            notification_type: notification.notification_type().to_string(),
            title: notification.title,
            message: notification.message,
            target_role: notification.target_role,
            related_order_id: notification.related_order_id,
            is_read: false,
            created_at: Utc::now(),
        };
        self.lock().notifications.push(row.clone());
        Ok(row)
    }

    async fn mark_read(&self, id: Uuid) -> Result<Option<AdminNotification>> {
        let mut tables = self.lock();
        Ok(tables.notifications.iter_mut().find(|n| n.id == id).map(|n| {
            n.is_read = true;
            n.clone()
        }))
    }

    async fn mark_all_read(&self, role: Option<AdminRole>) -> Result<u64> {
        let mut tables = self.lock();
        let mut updated = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| !n.is_read && role.map_or(true, |r| n.target_role == r))
        {
            n.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.lock();
        let before = tables.notifications.len();
        tables.notifications.retain(|n| n.id != id);
        Ok(tables.notifications.len() < before)
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn ping(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}
