//! Job postings. A job is visible only to the recruiter who created it.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::requirements::JobLocation;
use crate::models::job::JobPostingRow;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    #[serde(default)]
    pub remote_allowed: bool,
}

impl CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl JobPostingRow {
    pub fn job_location(&self) -> JobLocation {
        JobLocation {
            location: self.location.clone(),
            remote_allowed: self.remote_allowed,
        }
    }
}

pub async fn create_job(
    pool: &PgPool,
    recruiter_id: Uuid,
    req: &CreateJobRequest,
) -> Result<JobPostingRow, AppError> {
    req.validate()?;

    let location = req
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let job: JobPostingRow = sqlx::query_as(
        r#"
        INSERT INTO job_postings (id, recruiter_id, title, description, location, remote_allowed)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recruiter_id)
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(location)
    .bind(req.remote_allowed)
    .fetch_one(pool)
    .await?;

    info!("Recruiter {recruiter_id} created job {}", job.id);
    Ok(job)
}

/// Loads a job the recruiter owns. Someone else's job is reported as missing.
pub async fn load_owned_job(
    pool: &PgPool,
    recruiter_id: Uuid,
    job_id: Uuid,
) -> Result<JobPostingRow, AppError> {
    sqlx::query_as::<_, JobPostingRow>(
        "SELECT * FROM job_postings WHERE id = $1 AND recruiter_id = $2",
    )
    .bind(job_id)
    .bind(recruiter_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}
