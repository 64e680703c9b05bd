//! Recommendation Store: persists an analysis and its ranked recommendations.
//!
//! A job's recommendation set is replace-all. Creating the analysis, deleting
//! every prior recommendation for the job, inserting the new ranked set and
//! moving the job's `active_analysis_id` pointer happen in one transaction, with
//! the job row locked so concurrent analyses of the same job serialize.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::analyzer::RawJobAnalysis;
use crate::errors::AppError;
use crate::matching::requirements::AnalysisRequirements;
use crate::matching::scoring::MatchResult;
use crate::models::job::JobAnalysisRow;
use crate::models::recommendation::RecommendationRow;

/// Upper bound on persisted recommendations per analysis.
pub const MAX_RECOMMENDATIONS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate_id: Uuid,
    pub result: MatchResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendation {
    pub rank: i32,
    pub candidate_id: Uuid,
    pub result: MatchResult,
}

/// The analysis to persist: the analyzer's descriptive fields plus the
/// normalized requirements actually used for matching.
#[derive(Debug, Clone)]
pub struct NewAnalysis<'a> {
    pub raw: &'a RawJobAnalysis,
    pub requirements: &'a AnalysisRequirements,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersistedAnalysis {
    pub analysis_id: Uuid,
    pub recommendation_count: usize,
}

/// Orders by score descending, breaking ties by candidate id ascending, keeps the
/// top `MAX_RECOMMENDATIONS` and assigns dense 1-based ranks by position.
pub fn rank_candidates(mut scored: Vec<ScoredCandidate>) -> Vec<RankedRecommendation> {
    scored.sort_by(|a, b| {
        b.result
            .score
            .cmp(&a.result.score)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    scored.truncate(MAX_RECOMMENDATIONS);
    scored
        .into_iter()
        .enumerate()
        .map(|(i, s)| RankedRecommendation {
            rank: i as i32 + 1,
            candidate_id: s.candidate_id,
            result: s.result,
        })
        .collect()
}

/// Creates the analysis row and atomically replaces the job's recommendations.
/// On any error the transaction is dropped and the previous set stays active.
pub async fn persist_analysis(
    pool: &PgPool,
    job_id: Uuid,
    analysis: NewAnalysis<'_>,
    scored: Vec<ScoredCandidate>,
) -> Result<PersistedAnalysis, AppError> {
    let ranked = rank_candidates(scored);
    let requirements = analysis.requirements;
    let weights = serde_json::to_value(requirements.weights.normalized())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize weights: {e}")))?;

    let mut tx = pool.begin().await?;

    // 1. Lock the job row; concurrent analyses of the same job queue here.
    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM job_postings WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }

    // 2. New analysis row
    let analysis_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO job_analyses
            (id, job_id, must_have_skills, nice_to_have_skills, role_keywords,
             min_experience_years, max_experience_years, required_degree, preferred_degree,
             required_fields_of_study, preferred_fields_of_study, weights, summary, red_flags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(analysis_id)
    .bind(job_id)
    .bind(&requirements.must_have_skills)
    .bind(&requirements.nice_to_have_skills)
    .bind(&analysis.raw.role_keywords)
    .bind(requirements.filter.experience.min)
    .bind(requirements.filter.experience.max)
    .bind(requirements.filter.required_degree.map(|d| d.as_str()))
    .bind(requirements.preferred_degree.map(|d| d.as_str()))
    .bind(&requirements.filter.required_fields)
    .bind(&requirements.preferred_fields)
    .bind(&weights)
    .bind(analysis.raw.summary.as_deref())
    .bind(&analysis.raw.red_flags)
    .execute(&mut *tx)
    .await?;

    // 3. Every prior recommendation for the job, whichever analysis produced it
    let deleted = sqlx::query("DELETE FROM recommendations WHERE job_id = $1")
        .bind(job_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    // 4. Bulk insert of the new ranked set
    if !ranked.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recommendations \
             (id, job_id, analysis_id, candidate_id, rank, match_score, reasons, gaps, is_priority) ",
        );
        builder.push_values(ranked.iter(), |mut row, rec| {
            row.push_bind(Uuid::new_v4())
                .push_bind(job_id)
                .push_bind(analysis_id)
                .push_bind(rec.candidate_id)
                .push_bind(rec.rank)
                .push_bind(rec.result.score as i32)
                .push_bind(rec.result.reasons.clone())
                .push_bind(rec.result.gaps.clone())
                .push_bind(rec.result.is_priority);
        });
        builder.build().execute(&mut *tx).await?;
    }

    // 5. Point the job at the new analysis
    sqlx::query(
        "UPDATE job_postings SET active_analysis_id = $1, updated_at = now() WHERE id = $2",
    )
    .bind(analysis_id)
    .bind(job_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Persisted analysis {analysis_id} for job {job_id}: {} recommendations (replaced {deleted})",
        ranked.len()
    );

    Ok(PersistedAnalysis {
        analysis_id,
        recommendation_count: ranked.len(),
    })
}

/// Recommendations of the job's active analysis, in rank order.
pub async fn list_recommendations(
    pool: &PgPool,
    job_id: Uuid,
) -> Result<Vec<RecommendationRow>, AppError> {
    Ok(sqlx::query_as::<_, RecommendationRow>(
        r#"
        SELECT r.*
        FROM recommendations r
        JOIN job_postings j ON j.id = r.job_id AND j.active_analysis_id = r.analysis_id
        WHERE r.job_id = $1
        ORDER BY r.rank ASC
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?)
}

/// The job's active analysis, if it has been analyzed.
pub async fn get_active_analysis(
    pool: &PgPool,
    job_id: Uuid,
) -> Result<Option<JobAnalysisRow>, AppError> {
    Ok(sqlx::query_as::<_, JobAnalysisRow>(
        r#"
        SELECT a.*
        FROM job_analyses a
        JOIN job_postings j ON j.active_analysis_id = a.id
        WHERE j.id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
