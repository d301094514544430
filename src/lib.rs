//! Hanger Orders API
//!
//! Backend for a custom hanger manufacturer: customer signup, orders,
//! production quotas with team assignment, and admin notifications, with an
//! optional response cache in front of the read endpoints.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
