//! HTTP handlers for jobs, recommendations, candidate browse and unlocks.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::access::RecruiterId;
use crate::errors::AppError;
use crate::matching::disclosure::{
    disclose, is_unlocked, list_unlocks, unlock_candidate, unlocked_candidate_ids, CandidateView,
    UnlockOutcome,
};
use crate::matching::jobs::{create_job, load_owned_job, CreateJobRequest};
use crate::matching::pipeline::analyze_job;
use crate::matching::recommendations::{get_active_analysis, list_recommendations, PersistedAnalysis};
use crate::matching::search::{
    get_visible_candidate, get_visible_candidates, rank_by_fit, search_candidates,
    CandidateSearchFilter, CandidateSearchHit, CandidateSearchParams,
};
use crate::models::candidate::CvUnlockRow;
use crate::models::job::{JobAnalysisRow, JobPostingRow};
use crate::state::AppState;

#[derive(Serialize)]
pub struct JobDetailResponse {
    pub job: JobPostingRow,
    pub active_analysis: Option<JobAnalysisRow>,
}

#[derive(Serialize)]
pub struct RecommendationView {
    pub rank: i32,
    pub match_score: i32,
    pub reasons: Vec<String>,
    pub gaps: Vec<String>,
    pub is_priority: bool,
    pub candidate: CandidateView,
}

#[derive(Serialize)]
pub struct RecommendationListResponse {
    pub job_id: Uuid,
    pub analysis_id: Option<Uuid>,
    pub recommendations: Vec<RecommendationView>,
}

#[derive(Serialize)]
pub struct CandidateSearchResponse {
    pub page: i64,
    pub limit: i64,
    pub candidates: Vec<CandidateSearchHit>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UnlockResponse {
    pub unlocked: bool,
    pub already_unlocked: bool,
    pub credits_remaining: i32,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobPostingRow>), AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    let job = create_job(&state.db, recruiter_id, &req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetailResponse>, AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    let job = load_owned_job(&state.db, recruiter_id, job_id).await?;
    let active_analysis = get_active_analysis(&state.db, job_id).await?;
    Ok(Json(JobDetailResponse {
        job,
        active_analysis,
    }))
}

/// POST /api/v1/jobs/:id/analyze
pub async fn handle_analyze_job(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<PersistedAnalysis>, AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    let persisted = analyze_job(
        &state.db,
        state.analyzer.as_ref(),
        &state.config.scoring,
        recruiter_id,
        job_id,
    )
    .await?;
    Ok(Json(persisted))
}

/// GET /api/v1/jobs/:id/recommendations
pub async fn handle_list_recommendations(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
    Path(job_id): Path<Uuid>,
) -> Result<Json<RecommendationListResponse>, AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    let job = load_owned_job(&state.db, recruiter_id, job_id).await?;

    let rows = list_recommendations(&state.db, job_id).await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.candidate_id).collect();
    let mut candidates = get_visible_candidates(&state.db, &ids).await?;
    let unlocked = unlocked_candidate_ids(&state.db, recruiter_id, &ids).await?;

    // Candidates who went invisible after the analysis drop out; ranks are kept as stored.
    let recommendations: Vec<RecommendationView> = rows
        .into_iter()
        .filter_map(|row| {
            let candidate = candidates.remove(&row.candidate_id)?;
            Some(RecommendationView {
                rank: row.rank,
                match_score: row.match_score,
                reasons: row.reasons,
                gaps: row.gaps,
                is_priority: row.is_priority,
                candidate: disclose(
                    &candidate,
                    unlocked.contains(&candidate.id),
                    &state.config.anonymization,
                ),
            })
        })
        .collect();

    Ok(Json(RecommendationListResponse {
        job_id,
        analysis_id: job.active_analysis_id,
        recommendations,
    }))
}

/// GET /api/v1/candidates
pub async fn handle_search_candidates(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
    Query(params): Query<CandidateSearchParams>,
) -> Result<Json<CandidateSearchResponse>, AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    let filter = CandidateSearchFilter::from_params(&params)?;

    let page = search_candidates(&state.db, &filter).await?;
    let ids: Vec<Uuid> = page.iter().map(|c| c.id).collect();
    let unlocked = unlocked_candidate_ids(&state.db, recruiter_id, &ids).await?;
    debug!("Candidate search page {} returned {} rows", filter.page, page.len());

    let candidates = rank_by_fit(page, &filter.query_tokens, &state.config.fit_band)
        .into_iter()
        .map(|(candidate, fit_score)| CandidateSearchHit {
            candidate: disclose(
                &candidate,
                unlocked.contains(&candidate.id),
                &state.config.anonymization,
            ),
            fit_score,
        })
        .collect();

    Ok(Json(CandidateSearchResponse {
        page: filter.page,
        limit: filter.limit,
        candidates,
    }))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateView>, AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    let candidate = get_visible_candidate(&state.db, candidate_id).await?;
    let unlocked = is_unlocked(&state.db, recruiter_id, candidate_id).await?;
    Ok(Json(disclose(
        &candidate,
        unlocked,
        &state.config.anonymization,
    )))
}

/// POST /api/v1/candidates/:id/unlock
pub async fn handle_unlock_candidate(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<UnlockResponse>, AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    let outcome = unlock_candidate(
        &state.db,
        state.ledger.as_ref(),
        recruiter_id,
        candidate_id,
    )
    .await?;

    let response = match outcome {
        UnlockOutcome::Unlocked { credits_remaining } => UnlockResponse {
            unlocked: true,
            already_unlocked: false,
            credits_remaining,
        },
        UnlockOutcome::AlreadyUnlocked => UnlockResponse {
            unlocked: true,
            already_unlocked: true,
            credits_remaining: state.ledger.balance(&state.db, recruiter_id).await?,
        },
    };
    Ok(Json(response))
}

/// GET /api/v1/unlocks
pub async fn handle_list_unlocks(
    State(state): State<AppState>,
    RecruiterId(recruiter_id): RecruiterId,
) -> Result<Json<Vec<CvUnlockRow>>, AppError> {
    state.access.require_recruiter(recruiter_id).await?;
    Ok(Json(list_unlocks(&state.db, recruiter_id).await?))
}
