//! Domain records shared by the HTTP handlers and the stores.
//!
//! Rows mirror the managed database tables one to one. Enumerations are
//! stored as lowercase snake_case text.

use crate::error::ApiError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// === Enumerations ===

/// Role an admin notification is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SalesAdmin,
    OperationalManager,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SalesAdmin => "sales_admin",
            AdminRole::OperationalManager => "operational_manager",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales_admin" => Ok(AdminRole::SalesAdmin),
            "operational_manager" => Ok(AdminRole::OperationalManager),
            other => Err(ApiError::invalid(format!("Unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    InProduction,
    Completed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::InProduction => "in_production",
            OrderStatus::Completed => "completed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "in_production" => Ok(OrderStatus::InProduction),
            "completed" => Ok(OrderStatus::Completed),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ApiError::invalid(format!("Unknown order status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl QuotaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaStatus::Pending => "pending",
            QuotaStatus::InProgress => "in_progress",
            QuotaStatus::Completed => "completed",
        }
    }

    /// Status implied by a progress update
    pub fn from_progress(finished: i32, target: i32) -> Self {
        if target > 0 && finished >= target {
            QuotaStatus::Completed
        } else if finished > 0 {
            QuotaStatus::InProgress
        } else {
            QuotaStatus::Pending
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuotaStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuotaStatus::Pending),
            "in_progress" => Ok(QuotaStatus::InProgress),
            "completed" => Ok(QuotaStatus::Completed),
            other => Err(ApiError::invalid(format!("Unknown quota status: {}", other))),
        }
    }
}

// === Customers ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
}

// === Orders ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hanger_type: String,
    pub quantity: i32,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub hanger_type: String,
    pub quantity: i32,
    pub total_amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.hanger_type.trim().is_empty() {
            return Err(ApiError::invalid("hanger_type is required"));
        }
        if self.quantity <= 0 {
            return Err(ApiError::invalid("quantity must be greater than 0"));
        }
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(ApiError::invalid("total_amount must not be negative"));
        }
        Ok(())
    }
}

// === Teams & quotas ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub team_name: String,
    pub members: Vec<String>,
    pub assigned_quota_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quota {
    pub id: Uuid,
    pub quota_name: String,
    pub target_quantity: i32,
    pub finished_quantity: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: QuotaStatus,
    pub team_ids: Vec<Uuid>,
    pub assigned_orders: Vec<Uuid>,
    pub teams: Vec<Team>,
    pub progress_percentage: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuota {
    pub quota_name: String,
    pub target_quantity: i32,
    #[serde(default)]
    pub finished_quantity: i32,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: QuotaStatus,
    #[serde(default)]
    pub team_ids: Vec<Uuid>,
    #[serde(default)]
    pub assigned_orders: Vec<Uuid>,
}

impl NewQuota {
    /// Drop repeated team and order ids, keeping first occurrences
    pub fn dedup_ids(&mut self) {
        dedup_ids(&mut self.team_ids);
        dedup_ids(&mut self.assigned_orders);
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_quota_fields(
            &self.quota_name,
            self.target_quantity,
            self.finished_quantity,
            self.start_date,
            self.end_date,
        )
    }
}

/// Partial quota update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotaPatch {
    pub quota_name: Option<String>,
    pub target_quantity: Option<i32>,
    pub finished_quantity: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<QuotaStatus>,
    pub team_ids: Option<Vec<Uuid>>,
    pub assigned_orders: Option<Vec<Uuid>>,
    /// Set status from the merged finished/target counts
    #[serde(skip)]
    pub(crate) derive_status: bool,
}

impl QuotaPatch {
    /// Progress report: new finished count, status follows the stored target
    pub fn progress(finished_quantity: i32) -> Self {
        Self {
            finished_quantity: Some(finished_quantity),
            derive_status: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quota_name.is_none()
            && self.target_quantity.is_none()
            && self.finished_quantity.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.status.is_none()
            && self.team_ids.is_none()
            && self.assigned_orders.is_none()
    }

    /// Merge onto a stored quota and validate the result
    pub fn apply(self, quota: &mut Quota) -> Result<(), ApiError> {
        if let Some(name) = self.quota_name {
            quota.quota_name = name;
        }
        if let Some(target) = self.target_quantity {
            quota.target_quantity = target;
        }
        if let Some(finished) = self.finished_quantity {
            quota.finished_quantity = finished;
        }
        if self.start_date.is_some() {
            quota.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            quota.end_date = self.end_date;
        }
        if let Some(status) = self.status {
            quota.status = status;
        }
        if let Some(mut team_ids) = self.team_ids {
            dedup_ids(&mut team_ids);
            quota.team_ids = team_ids;
        }
        if let Some(mut orders) = self.assigned_orders {
            dedup_ids(&mut orders);
            quota.assigned_orders = orders;
        }
        if self.derive_status {
            quota.status = QuotaStatus::from_progress(quota.finished_quantity, quota.target_quantity);
        }

        validate_quota_fields(
            &quota.quota_name,
            quota.target_quantity,
            quota.finished_quantity,
            quota.start_date,
            quota.end_date,
        )?;

        quota.progress_percentage =
            progress_percentage(i64::from(quota.finished_quantity), i64::from(quota.target_quantity));
        Ok(())
    }
}

/// 400 naming team ids that have no row
pub fn unknown_teams(missing: &[Uuid]) -> ApiError {
    let ids: Vec<String> = missing.iter().map(Uuid::to_string).collect();
    ApiError::invalid(format!("Unknown team ids: {}", ids.join(", ")))
}

fn dedup_ids(ids: &mut Vec<Uuid>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
}

fn validate_quota_fields(
    name: &str,
    target: i32,
    finished: i32,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::invalid("quota_name is required"));
    }
    if target <= 0 {
        return Err(ApiError::invalid("target_quantity must be greater than 0"));
    }
    if finished < 0 {
        return Err(ApiError::invalid("finished_quantity must not be negative"));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ApiError::invalid("end_date must not be before start_date"));
        }
    }
    Ok(())
}

/// `finished / target * 100`, one decimal place, 0 for an empty target.
/// Over-production is reported above 100.
pub fn progress_percentage(finished: i64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    let pct = finished as f64 / target as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSummary {
    pub total_quotas: usize,
    pub total_target: i64,
    pub total_finished: i64,
    pub overall_percentage: f64,
    pub by_status: StatusCounts,
}

impl QuotaSummary {
    pub fn from_quotas(quotas: &[Quota]) -> Self {
        let mut by_status = StatusCounts::default();
        let mut total_target = 0i64;
        let mut total_finished = 0i64;

        for quota in quotas {
            total_target += i64::from(quota.target_quantity);
            total_finished += i64::from(quota.finished_quantity);
            match quota.status {
                QuotaStatus::Pending => by_status.pending += 1,
                QuotaStatus::InProgress => by_status.in_progress += 1,
                QuotaStatus::Completed => by_status.completed += 1,
            }
        }

        Self {
            total_quotas: quotas.len(),
            total_target,
            total_finished,
            overall_percentage: progress_percentage(total_finished, total_target),
            by_status,
        }
    }
}

// === Admin notifications ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminNotification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub target_role: AdminRole,
    pub notification_type: String,
    pub related_order_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub target_role: AdminRole,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub related_order_id: Option<Uuid>,
}

impl NewNotification {
    pub const DEFAULT_TYPE: &'static str = "general";

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::invalid("title is required"));
        }
        if self.message.trim().is_empty() {
            return Err(ApiError::invalid("message is required"));
        }
        Ok(())
    }

    pub fn notification_type(&self) -> &str {
        self.notification_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(Self::DEFAULT_TYPE)
    }
}

#[derive(Debug, Clone)]
pub struct NotificationFilter {
    pub role: Option<AdminRole>,
    pub unread_only: bool,
    pub limit: i64,
}
