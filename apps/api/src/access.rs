//! Caller identity and the single capability check for recruiter endpoints.
//!
//! Authentication happens upstream: the gateway verifies the session and forwards
//! the caller's user id in `x-recruiter-id`. Handlers extract it with
//! `RecruiterId` and ask the injected `AccessPolicy` once; the matching engine
//! itself trusts the id it is handed.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

pub const RECRUITER_ID_HEADER: &str = "x-recruiter-id";

/// Authenticated caller id forwarded by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecruiterId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for RecruiterId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(RECRUITER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        Uuid::parse_str(raw.trim())
            .map(RecruiterId)
            .map_err(|_| AppError::Unauthorized)
    }
}

/// Capability check injected into `AppState` as `Arc<dyn AccessPolicy>`.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Ok when the user may use recruiter features (search, analyze, unlock).
    async fn require_recruiter(&self, user_id: Uuid) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Candidate,
    Recruiter,
    SuperAdmin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CANDIDATE" | "USER" => Some(Role::Candidate),
            "RECRUITER" => Some(Role::Recruiter),
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            _ => None,
        }
    }
}

/// Recruiters need the enterprise entitlement; super admins always pass.
pub fn evaluate_access(role: Option<Role>, has_enterprise_access: bool) -> Result<(), AppError> {
    match role {
        Some(Role::SuperAdmin) => Ok(()),
        Some(Role::Recruiter) if has_enterprise_access => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

/// Reads role and entitlement from the auth service's `users` table.
pub struct PgAccessPolicy {
    pool: PgPool,
}

impl PgAccessPolicy {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessPolicy for PgAccessPolicy {
    async fn require_recruiter(&self, user_id: Uuid) -> Result<(), AppError> {
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT role, has_enterprise_access FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((role, has_enterprise_access)) = row else {
            debug!("Unknown caller {user_id}");
            return Err(AppError::Unauthorized);
        };

        evaluate_access(Role::parse(&role), has_enterprise_access)
    }
}
