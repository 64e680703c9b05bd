//! Analyze-and-recommend pipeline for one job.
//!
//! analyzer → normalize → prefilter → education gate → score → persist

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyzer::{AnalyzeJobRequest, JobAnalyzer};
use crate::errors::AppError;
use crate::matching::jobs::load_owned_job;
use crate::matching::prefilter::prefilter_candidates;
use crate::matching::recommendations::{
    persist_analysis, NewAnalysis, PersistedAnalysis, ScoredCandidate,
};
use crate::matching::requirements::{normalize_analysis, passes_education_requirements, AnalysisRequirements};
use crate::matching::scoring::{score_candidate, ScoringConfig};
use crate::models::candidate::CandidateProfile;

/// Drops hidden candidates and those failing the education gate, scores the rest.
pub fn score_eligible(
    candidates: &[CandidateProfile],
    requirements: &AnalysisRequirements,
    config: &ScoringConfig,
) -> Vec<ScoredCandidate> {
    candidates
        .iter()
        .filter(|c| c.is_visible)
        .filter(|c| passes_education_requirements(c, &requirements.filter))
        .map(|c| ScoredCandidate {
            candidate_id: c.id,
            result: score_candidate(c, requirements, config),
        })
        .collect()
}

/// Runs a fresh analysis of the recruiter's job and replaces its recommendations.
pub async fn analyze_job(
    pool: &PgPool,
    analyzer: &dyn JobAnalyzer,
    config: &ScoringConfig,
    recruiter_id: Uuid,
    job_id: Uuid,
) -> Result<PersistedAnalysis, AppError> {
    let job = load_owned_job(pool, recruiter_id, job_id).await?;

    let request = AnalyzeJobRequest {
        jd_text: &job.description,
        title: &job.title,
        location: job.location.as_deref(),
        remote_allowed: job.remote_allowed,
    };
    let raw = analyzer.analyze(&request).await.map_err(|e| {
        warn!("Analyzer failed for job {job_id}: {e}");
        AppError::Analyzer(e.to_string())
    })?;

    let requirements = normalize_analysis(&raw, job.job_location());
    let candidates = prefilter_candidates(pool, &requirements.filter, &requirements.job_location).await?;
    let scored = score_eligible(&candidates, &requirements, config);
    info!(
        "Job {job_id}: {} prefiltered, {} passed education gate",
        candidates.len(),
        scored.len()
    );

    persist_analysis(
        pool,
        job_id,
        NewAnalysis {
            raw: &raw,
            requirements: &requirements,
        },
        scored,
    )
    .await
}
