//! Supabase Auth client used by customer signup.

use crate::error::{ApiError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const SIGNUP_FAILED: &str = "Signup failed";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// User returned by the auth provider after signup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct SignupCredentials {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, credentials: &SignupCredentials) -> Result<AuthUser>;
}

#[derive(Serialize)]
struct SignupBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignupMetadata<'a>,
}

#[derive(Serialize)]
struct SignupMetadata<'a> {
    first_name: &'a str,
    last_name: &'a str,
}

pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuthClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn signup_url(&self) -> String {
        format!("{}/auth/v1/signup", self.base_url)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    async fn sign_up(&self, credentials: &SignupCredentials) -> Result<AuthUser> {
        let body = SignupBody {
            email: &credentials.email,
            password: &credentials.password,
            data: SignupMetadata {
                first_name: &credentials.first_name,
                last_name: &credentials.last_name,
            },
        };

        let response = self
            .http
            .post(self.signup_url())
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| signup_failed(format!("Auth service unreachable: {}", e)))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| signup_failed(format!("Invalid auth response: {}", e)))?;

        if !status.is_success() {
            let details = remote_error_message(&payload)
                .unwrap_or_else(|| format!("Auth service returned {}", status));
            warn!("Supabase signup rejected ({}): {}", status, details);
            return Err(signup_failed(details));
        }

        let user = parse_user(&payload)
            .ok_or_else(|| signup_failed("Auth response did not contain a user"))?;
        debug!("Supabase created auth user {}", user.id);
        Ok(user)
    }
}

fn signup_failed(details: impl Into<String>) -> ApiError {
    ApiError::SignupFailed {
        error: SIGNUP_FAILED.to_string(),
        details: details.into(),
    }
}

/// The user sits under `user` when a session is returned, at the top level
/// when email confirmation is pending
fn parse_user(payload: &Value) -> Option<AuthUser> {
    let user = payload.get("user").filter(|u| u.is_object()).unwrap_or(payload);

    let id = user.get("id")?.as_str()?.parse().ok()?;
    let email = user
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(AuthUser { id, email })
}

fn remote_error_message(payload: &Value) -> Option<String> {
    ["msg", "error_description", "message"]
        .iter()
        .find_map(|field| payload.get(*field).and_then(Value::as_str))
        .map(ToString::to_string)
}
