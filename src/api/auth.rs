use super::AppState;
use crate::auth::{AuthUser, SignupCredentials};
use crate::error::{ApiError, Result};
use crate::models::{Customer, NewCustomer};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{error, info};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
}

#[derive(Serialize)]
struct SignupResponse {
    success: bool,
    message: String,
    user: AuthUser,
    customer: Customer,
}

fn signup_rejected(error: &str, details: impl Into<String>) -> ApiError {
    ApiError::SignupFailed {
        error: error.to_string(),
        details: details.into(),
    }
}

fn looks_like_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SignupRequest {
    fn into_credentials(self) -> Result<(SignupCredentials, NewCustomerFields)> {
        let email = non_blank(self.email);
        // Passwords are taken verbatim
        let password = self.password.filter(|p| !p.is_empty());
        let first_name = non_blank(self.first_name);
        let last_name = non_blank(self.last_name);

        let (Some(email), Some(password), Some(first_name), Some(last_name)) =
            (email, password, first_name, last_name)
        else {
            return Err(signup_rejected(
                "Missing required fields",
                "email, password, first_name and last_name are required",
            ));
        };

        if !looks_like_email(&email) {
            return Err(signup_rejected(
                "Invalid email",
                format!("'{}' is not a valid email address", email),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(signup_rejected(
                "Invalid password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }

        let profile = NewCustomerFields {
            phone: non_blank(self.phone),
            company_name: non_blank(self.company_name),
            address: non_blank(self.address),
        };

        Ok((
            SignupCredentials {
                email,
                password,
                first_name,
                last_name,
            },
            profile,
        ))
    }
}

struct NewCustomerFields {
    phone: Option<String>,
    company_name: Option<String>,
    address: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = payload.map_err(|e| signup_rejected("Invalid request body", e.body_text()))?;
    let (credentials, profile) = request.into_credentials()?;

    let user = state.auth.sign_up(&credentials).await?;

    let customer = state
        .customers
        .create_customer(NewCustomer {
            id: user.id,
            email: credentials.email,
            first_name: credentials.first_name,
            last_name: credentials.last_name,
            phone: profile.phone,
            company_name: profile.company_name,
            address: profile.address,
        })
        .await
        .map_err(|e| {
            error!("Auth user {} created but profile insert failed: {}", user.id, e);
            ApiError::ProfileFailed {
                error: "Failed to create customer profile".to_string(),
                details: e.to_string(),
            }
        })?;

    info!("Customer {} signed up", customer.id);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "Account created successfully".to_string(),
            user,
            customer,
        }),
    ))
}

pub async fn get_customer(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Customer>> {
    let Path(id) = id?;

    state
        .customers
        .get_customer(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Customer", id))
}
