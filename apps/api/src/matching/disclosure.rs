//! Disclosure Gate: what a recruiter may see of a candidate.
//!
//! Two independent controls:
//! - unlock state (recruiter-paid, per recruiter/candidate pair) gates identity and contact;
//! - the candidate's own privacy flags hide employer and salary regardless of unlock.
//!
//! A `cv_unlocks` row is the only authority for full disclosure. Rows are never deleted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::ledger::{CreditLedger, DebitOutcome};
use crate::models::candidate::{CandidateProfile, CvUnlockRow};

pub const HIDDEN_EMPLOYER: &str = "Hidden";

/// Shape of pseudonymous labels: `"<label_prefix> <first hash_len hex chars>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    pub label_prefix: String,
    pub hash_len: usize,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            label_prefix: "Candidate".to_string(),
            hash_len: 6,
        }
    }
}

/// Stable pseudonym for a candidate: a SHA-256 prefix over name and id.
/// The id keeps two candidates with the same name apart.
pub fn anonymized_label(real_name: &str, candidate_id: Uuid, config: &AnonymizationConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(real_name.trim().as_bytes());
    hasher.update(b":");
    hasher.update(candidate_id.to_string().as_bytes());
    let digest = hex::encode_upper(hasher.finalize());
    let len = config.hash_len.clamp(4, digest.len());
    format!("{} {}", config.label_prefix.trim(), &digest[..len])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Candidate as shown to one recruiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateView {
    pub id: Uuid,
    pub display_name: String,
    pub is_unlocked: bool,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub years_experience: f64,
    pub skills: Vec<String>,
    pub highest_degree: Option<String>,
    pub field_of_study: Option<String>,
    pub current_employer: Option<String>,
    pub desired_salary: Option<SalaryRange>,
}

/// Applies unlock state and the candidate's privacy flags.
///
/// | field        | locked          | unlocked                            |
/// |--------------|-----------------|-------------------------------------|
/// | display name | pseudonym       | real name                           |
/// | email/phone  | none            | real                                |
/// | headline     | none            | none if employer flagged, else real |
/// | employer     | "Hidden" / none | "Hidden" if flagged, else real      |
/// | salary       | none            | none if flagged, else real range    |
pub fn disclose(
    candidate: &CandidateProfile,
    unlocked: bool,
    config: &AnonymizationConfig,
) -> CandidateView {
    let current_employer = if candidate.hide_current_employer {
        Some(HIDDEN_EMPLOYER.to_string())
    } else if unlocked {
        candidate.current_employer.clone()
    } else {
        None
    };

    // Free-text headlines routinely name the employer.
    let headline = (unlocked && !candidate.hide_current_employer)
        .then(|| candidate.headline.clone())
        .flatten();

    let salary_present =
        candidate.desired_salary_min.is_some() || candidate.desired_salary_max.is_some();
    let desired_salary = (unlocked && !candidate.hide_salary_history && salary_present).then(|| {
        SalaryRange {
            min: candidate.desired_salary_min,
            max: candidate.desired_salary_max,
        }
    });

    let (display_name, email, phone) = if unlocked {
        (
            candidate.full_name.clone(),
            candidate.email.clone(),
            candidate.phone.clone(),
        )
    } else {
        (
            anonymized_label(&candidate.full_name, candidate.id, config),
            None,
            None,
        )
    };

    CandidateView {
        id: candidate.id,
        display_name,
        is_unlocked: unlocked,
        email,
        phone,
        headline,
        location: candidate.location.clone(),
        years_experience: candidate.years_experience,
        skills: candidate.skills.clone(),
        highest_degree: candidate.highest_degree.clone(),
        field_of_study: candidate.field_of_study.clone(),
        current_employer,
        desired_salary,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Unlock ledger
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnlockOutcome {
    Unlocked { credits_remaining: i32 },
    AlreadyUnlocked,
}

pub async fn is_unlocked(
    pool: &PgPool,
    recruiter_id: Uuid,
    candidate_id: Uuid,
) -> Result<bool, AppError> {
    let found: Option<Uuid> = sqlx::query_scalar(
        "SELECT candidate_id FROM cv_unlocks WHERE recruiter_id = $1 AND candidate_id = $2",
    )
    .bind(recruiter_id)
    .bind(candidate_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Subset of `candidate_ids` the recruiter has unlocked. One query per page.
pub async fn unlocked_candidate_ids(
    pool: &PgPool,
    recruiter_id: Uuid,
    candidate_ids: &[Uuid],
) -> Result<HashSet<Uuid>, AppError> {
    if candidate_ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows: Vec<Uuid> = sqlx::query_scalar(
        "SELECT candidate_id FROM cv_unlocks WHERE recruiter_id = $1 AND candidate_id = ANY($2)",
    )
    .bind(recruiter_id)
    .bind(candidate_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Every unlock the recruiter holds, newest first.
pub async fn list_unlocks(pool: &PgPool, recruiter_id: Uuid) -> Result<Vec<CvUnlockRow>, AppError> {
    Ok(sqlx::query_as::<_, CvUnlockRow>(
        "SELECT * FROM cv_unlocks WHERE recruiter_id = $1 ORDER BY created_at DESC, candidate_id ASC",
    )
    .bind(recruiter_id)
    .fetch_all(pool)
    .await?)
}

/// Grants full disclosure of a candidate to a recruiter for one credit.
///
/// An existing unlock answers `AlreadyUnlocked` even if the candidate has since
/// gone invisible; only new unlocks require a visible candidate.
///
/// The unlock row and the debit share one transaction. The insert precedes the
/// debit and relies on the (recruiter_id, candidate_id) primary key: a concurrent
/// duplicate waits on our row, then becomes a no-op, so a pair is charged at most once.
pub async fn unlock_candidate(
    pool: &PgPool,
    ledger: &dyn CreditLedger,
    recruiter_id: Uuid,
    candidate_id: Uuid,
) -> Result<UnlockOutcome, AppError> {
    let mut tx = pool.begin().await?;

    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT candidate_id FROM cv_unlocks WHERE recruiter_id = $1 AND candidate_id = $2",
    )
    .bind(recruiter_id)
    .bind(candidate_id)
    .fetch_optional(&mut *tx)
    .await?;
    if existing.is_some() {
        tx.rollback().await?;
        info!("Recruiter {recruiter_id} already unlocked candidate {candidate_id}; no charge");
        return Ok(UnlockOutcome::AlreadyUnlocked);
    }

    let visible: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM candidate_profiles WHERE id = $1 AND is_visible = TRUE",
    )
    .bind(candidate_id)
    .fetch_optional(&mut *tx)
    .await?;
    if visible.is_none() {
        return Err(AppError::NotFound(format!("Candidate {candidate_id} not found")));
    }

    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO cv_unlocks (recruiter_id, candidate_id)
        VALUES ($1, $2)
        ON CONFLICT (recruiter_id, candidate_id) DO NOTHING
        RETURNING candidate_id
        "#,
    )
    .bind(recruiter_id)
    .bind(candidate_id)
    .fetch_optional(&mut *tx)
    .await?;

    if inserted.is_none() {
        tx.rollback().await?;
        info!("Recruiter {recruiter_id} already unlocked candidate {candidate_id}; no charge");
        return Ok(UnlockOutcome::AlreadyUnlocked);
    }

    match ledger.debit_one(&mut *tx, recruiter_id, candidate_id).await? {
        DebitOutcome::Debited { remaining } => {
            tx.commit().await?;
            info!(
                "Recruiter {recruiter_id} unlocked candidate {candidate_id} ({remaining} credits left)"
            );
            Ok(UnlockOutcome::Unlocked {
                credits_remaining: remaining,
            })
        }
        DebitOutcome::InsufficientFunds => {
            tx.rollback().await?;
            info!("Unlock of {candidate_id} by {recruiter_id} refused: insufficient credits");
            Err(AppError::InsufficientCredits)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::ledger::PgCreditLedger;
    use crate::matching::requirements::tests::make_candidate;

    fn candidate() -> CandidateProfile {
        make_candidate(Some("MASTER"), Some("Computer Science"), 4.0, &["React"])
    }

    #[test]
    fn test_label_is_deterministic_and_prefixed() {
        let c = candidate();
        let config = AnonymizationConfig::default();
        let first = anonymized_label(&c.full_name, c.id, &config);
        let second = anonymized_label(&c.full_name, c.id, &config);
        assert_eq!(first, second);
        assert!(first.starts_with("Candidate "));
        assert_eq!(first.len(), "Candidate ".len() + 6);
    }

    #[test]
    fn test_same_name_different_id_differs() {
        let config = AnonymizationConfig::default();
        let a = anonymized_label("Jane Doe", Uuid::from_u128(1), &config);
        let b = anonymized_label("Jane Doe", Uuid::from_u128(2), &config);
        assert_ne!(a, b);
    }

    #[test]
    fn test_label_config_is_respected() {
        let config = AnonymizationConfig {
            label_prefix: "Talent".to_string(),
            hash_len: 10,
        };
        let label = anonymized_label("Jane Doe", Uuid::from_u128(7), &config);
        assert!(label.starts_with("Talent "));
        assert_eq!(label.len(), "Talent ".len() + 10);
    }

    #[test]
    fn test_locked_view_hides_identity_employer_and_salary() {
        let c = candidate();
        let view = disclose(&c, false, &AnonymizationConfig::default());
        assert_ne!(view.display_name, c.full_name);
        assert!(!view.is_unlocked);
        assert!(view.email.is_none());
        assert!(view.phone.is_none());
        assert!(view.current_employer.is_none());
        assert!(view.desired_salary.is_none());
        assert!(view.headline.is_none());
    }

    #[test]
    fn test_unlocked_view_shows_identity() {
        let c = candidate();
        let view = disclose(&c, true, &AnonymizationConfig::default());
        assert_eq!(view.display_name, c.full_name);
        assert_eq!(view.email, c.email);
        assert_eq!(view.headline, c.headline);
        assert_eq!(view.current_employer, c.current_employer);
        assert_eq!(
            view.desired_salary,
            Some(SalaryRange {
                min: Some(90_000),
                max: Some(120_000)
            })
        );
    }

    #[test]
    fn test_privacy_flags_hold_after_unlock() {
        let mut c = candidate();
        c.hide_current_employer = true;
        c.hide_salary_history = true;
        let view = disclose(&c, true, &AnonymizationConfig::default());
        assert_eq!(view.display_name, c.full_name);
        assert_eq!(view.current_employer.as_deref(), Some(HIDDEN_EMPLOYER));
        assert!(view.desired_salary.is_none());
    }

    #[test]
    fn test_headline_withheld_when_employer_hidden() {
        let mut c = candidate();
        c.headline = Some("Staff engineer at Initech".to_string());
        c.hide_current_employer = true;
        for unlocked in [false, true] {
            let view = disclose(&c, unlocked, &AnonymizationConfig::default());
            assert!(view.headline.is_none());
        }
    }

    #[test]
    fn test_hidden_employer_shown_as_hidden_when_locked() {
        let mut c = candidate();
        c.hide_current_employer = true;
        let view = disclose(&c, false, &AnonymizationConfig::default());
        assert_eq!(view.current_employer.as_deref(), Some(HIDDEN_EMPLOYER));
    }

    async fn seeded_pool(balance: i32) -> (PgPool, Uuid, Uuid) {
        let pool = PgPool::connect(&std::env::var("DATABASE_URL").unwrap())
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let recruiter_id = Uuid::new_v4();
        let candidate_id = Uuid::new_v4();
        sqlx::query("INSERT INTO candidate_profiles (id, full_name) VALUES ($1, 'Grace Hopper')")
            .bind(candidate_id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO recruiter_credits (recruiter_id, balance) VALUES ($1, $2)")
            .bind(recruiter_id)
            .bind(balance)
            .execute(&pool)
            .await
            .unwrap();
        (pool, recruiter_id, candidate_id)
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable PostgreSQL database"]
    async fn test_unlock_twice_charges_once() {
        let (pool, recruiter_id, candidate_id) = seeded_pool(5).await;

        let first = unlock_candidate(&pool, &PgCreditLedger, recruiter_id, candidate_id)
            .await
            .unwrap();
        let second = unlock_candidate(&pool, &PgCreditLedger, recruiter_id, candidate_id)
            .await
            .unwrap();

        assert_eq!(first, UnlockOutcome::Unlocked { credits_remaining: 4 });
        assert_eq!(second, UnlockOutcome::AlreadyUnlocked);
        assert_eq!(PgCreditLedger.balance(&pool, recruiter_id).await.unwrap(), 4);

        let unlocks: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cv_unlocks WHERE recruiter_id = $1 AND candidate_id = $2",
        )
        .bind(recruiter_id)
        .bind(candidate_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(unlocks, 1);

        let entries: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM credit_ledger WHERE recruiter_id = $1")
                .bind(recruiter_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(entries, 1);
        assert!(is_unlocked(&pool, recruiter_id, candidate_id).await.unwrap());

        let listed = list_unlocks(&pool, recruiter_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].candidate_id, candidate_id);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable PostgreSQL database"]
    async fn test_insufficient_credits_leaves_no_unlock() {
        let (pool, recruiter_id, candidate_id) = seeded_pool(0).await;

        let result = unlock_candidate(&pool, &PgCreditLedger, recruiter_id, candidate_id).await;
        assert!(matches!(result, Err(AppError::InsufficientCredits)));
        assert!(!is_unlocked(&pool, recruiter_id, candidate_id).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable PostgreSQL database"]
    async fn test_unlock_after_candidate_hidden_is_already_unlocked() {
        let (pool, recruiter_id, candidate_id) = seeded_pool(3).await;

        unlock_candidate(&pool, &PgCreditLedger, recruiter_id, candidate_id)
            .await
            .unwrap();
        sqlx::query("UPDATE candidate_profiles SET is_visible = FALSE WHERE id = $1")
            .bind(candidate_id)
            .execute(&pool)
            .await
            .unwrap();

        let again = unlock_candidate(&pool, &PgCreditLedger, recruiter_id, candidate_id)
            .await
            .unwrap();
        assert_eq!(again, UnlockOutcome::AlreadyUnlocked);
        assert_eq!(PgCreditLedger.balance(&pool, recruiter_id).await.unwrap(), 2);

        // A recruiter without an unlock still cannot reach the hidden candidate.
        let other = unlock_candidate(&pool, &PgCreditLedger, Uuid::new_v4(), candidate_id).await;
        assert!(matches!(other, Err(AppError::NotFound(_))));
    }
}
