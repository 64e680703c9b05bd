//! Credit ledger seam. Billing owns credits; the matching engine only asks for
//! "debit one unit for recruiter X" inside its own unlock transaction.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

pub const UNLOCK_DEBIT_REASON: &str = "cv_unlock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DebitOutcome {
    Debited { remaining: i32 },
    InsufficientFunds,
}

/// Carried in `AppState` as `Arc<dyn CreditLedger>`.
///
/// `debit_one` runs on the caller's connection so the debit commits or rolls
/// back together with whatever the caller wrote in the same transaction.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn debit_one(
        &self,
        conn: &mut PgConnection,
        recruiter_id: Uuid,
        reference_id: Uuid,
    ) -> Result<DebitOutcome, AppError>;

    async fn balance(&self, pool: &PgPool, recruiter_id: Uuid) -> Result<i32, AppError>;
}

/// Balance row plus append-only entry table, both in the shared database.
pub struct PgCreditLedger;

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn debit_one(
        &self,
        conn: &mut PgConnection,
        recruiter_id: Uuid,
        reference_id: Uuid,
    ) -> Result<DebitOutcome, AppError> {
        // Conditional decrement: never goes below zero, row lock serializes debits.
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE recruiter_credits
            SET balance = balance - 1, updated_at = now()
            WHERE recruiter_id = $1 AND balance >= 1
            RETURNING balance
            "#,
        )
        .bind(recruiter_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(remaining) = remaining else {
            debug!("Debit refused for recruiter {recruiter_id}: insufficient credits");
            return Ok(DebitOutcome::InsufficientFunds);
        };

        sqlx::query(
            r#"
            INSERT INTO credit_ledger (id, recruiter_id, delta, reason, reference_id)
            VALUES ($1, $2, -1, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recruiter_id)
        .bind(UNLOCK_DEBIT_REASON)
        .bind(reference_id)
        .execute(&mut *conn)
        .await?;

        Ok(DebitOutcome::Debited { remaining })
    }

    async fn balance(&self, pool: &PgPool, recruiter_id: Uuid) -> Result<i32, AppError> {
        let balance: Option<i32> =
            sqlx::query_scalar("SELECT balance FROM recruiter_credits WHERE recruiter_id = $1")
                .bind(recruiter_id)
                .fetch_optional(pool)
                .await?;
        Ok(balance.unwrap_or(0))
    }
}
