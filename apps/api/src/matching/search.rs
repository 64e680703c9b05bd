//! Live candidate browse: validated query parameters → typed filter → SQL → fit score.
//!
//! Unlike analyzer output, these parameters come straight from the caller, so a
//! malformed value is a `Validation` error instead of a silently dropped filter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::disclosure::CandidateView;
use crate::matching::fit_score::{compute_fit_score, tokenize_query, FitScoreBand};
use crate::matching::prefilter::escape_like;
use crate::matching::requirements::{
    allowed_degree_levels, degree_spellings, DegreeLevel, ExperienceBounds, CLEANED_DEGREE_SQL,
};
use crate::models::candidate::CandidateProfile;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Raw query string. Everything arrives as text so bad numbers can be reported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateSearchParams {
    pub query: Option<String>,
    pub skills: Option<String>,
    pub location: Option<String>,
    pub min_experience: Option<String>,
    pub max_experience: Option<String>,
    pub degree: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Validated browse filter. `None`/empty means "no filter on this dimension".
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSearchFilter {
    pub query_tokens: Vec<String>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub experience: ExperienceBounds,
    pub min_degree: Option<DegreeLevel>,
    pub page: i64,
    pub limit: i64,
}

fn non_blank(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_years(name: &str, raw: &Option<String>) -> Result<Option<f64>, AppError> {
    let Some(value) = non_blank(raw) else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(years) if years.is_finite() && years >= 0.0 => Ok(Some(years)),
        _ => Err(AppError::Validation(format!(
            "{name} must be a non-negative number, got '{value}'"
        ))),
    }
}

fn parse_positive(name: &str, raw: &Option<String>, default: i64, max: i64) -> Result<i64, AppError> {
    let Some(value) = non_blank(raw) else {
        return Ok(default);
    };
    match value.parse::<i64>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(AppError::Validation(format!(
            "{name} must be an integer between 1 and {max}, got '{value}'"
        ))),
    }
}

impl CandidateSearchFilter {
    pub fn from_params(params: &CandidateSearchParams) -> Result<Self, AppError> {
        let min = parse_years("min_experience", &params.min_experience)?;
        let max = parse_years("max_experience", &params.max_experience)?;
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(AppError::Validation(
                    "min_experience cannot exceed max_experience".to_string(),
                ));
            }
        }

        let min_degree = match non_blank(&params.degree) {
            Some(raw) => Some(DegreeLevel::parse(raw).ok_or_else(|| {
                AppError::Validation(format!(
                    "degree must be one of DIPLOMA, BACHELOR, MASTER, PHD, got '{raw}'"
                ))
            })?),
            None => None,
        };

        let mut skills: Vec<String> = non_blank(&params.skills)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        skills.sort();
        skills.dedup();

        Ok(Self {
            query_tokens: non_blank(&params.query).map(tokenize_query).unwrap_or_default(),
            skills,
            location: non_blank(&params.location).map(String::from),
            experience: ExperienceBounds { min, max },
            min_degree,
            page: parse_positive("page", &params.page, 1, i64::from(u32::MAX))?,
            limit: parse_positive("limit", &params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

fn push_search_clauses<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a CandidateSearchFilter) {
    if let Some(location) = &filter.location {
        let pattern = format!("%{}%", escape_like(location));
        builder
            .push(" AND (location ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(preferred_locations) AS p(loc) WHERE p.loc ILIKE ")
            .push_bind(pattern)
            .push("))");
    }

    if !filter.skills.is_empty() {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(skills) AS s(skill) WHERE LOWER(s.skill) = ANY(")
            .push_bind(filter.skills.clone())
            .push("))");
    }

    if let Some(min) = filter.experience.min {
        builder.push(" AND years_experience >= ").push_bind(min);
    }
    if let Some(max) = filter.experience.max {
        builder.push(" AND years_experience <= ").push_bind(max);
    }

    if let Some(level) = filter.min_degree {
        builder
            .push(format!(" AND {CLEANED_DEGREE_SQL} = ANY("))
            .push_bind(degree_spellings(&allowed_degree_levels(level)))
            .push(")");
    }

    if !filter.query_tokens.is_empty() {
        let patterns: Vec<String> = filter
            .query_tokens
            .iter()
            .map(|t| format!("%{}%", escape_like(t)))
            .collect();
        builder
            .push(" AND (EXISTS (SELECT 1 FROM unnest(skills) AS q(skill) WHERE LOWER(q.skill) LIKE ANY(")
            .push_bind(patterns.clone())
            .push(")) OR LOWER(COALESCE(headline, '')) LIKE ANY(")
            .push_bind(patterns)
            .push("))");
    }
}

/// One page of visible candidates matching the filter, most recently updated first.
pub async fn search_candidates(
    pool: &PgPool,
    filter: &CandidateSearchFilter,
) -> Result<Vec<CandidateProfile>, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM candidate_profiles WHERE is_visible = TRUE");
    push_search_clauses(&mut builder, filter);
    builder
        .push(" ORDER BY updated_at DESC, id ASC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset());

    Ok(builder
        .build_query_as::<CandidateProfile>()
        .fetch_all(pool)
        .await?)
}

/// Pairs each candidate with its fit score, best first. Sorting is stable, so
/// equal scores keep the store order.
pub fn rank_by_fit(
    candidates: Vec<CandidateProfile>,
    query_tokens: &[String],
    band: &FitScoreBand,
) -> Vec<(CandidateProfile, u32)> {
    let mut scored: Vec<(CandidateProfile, u32)> = candidates
        .into_iter()
        .map(|c| {
            let fit = compute_fit_score(&c.skills, query_tokens, band);
            (c, fit)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}

/// A single visible candidate.
pub async fn get_visible_candidate(
    pool: &PgPool,
    candidate_id: Uuid,
) -> Result<CandidateProfile, AppError> {
    sqlx::query_as::<_, CandidateProfile>(
        "SELECT * FROM candidate_profiles WHERE id = $1 AND is_visible = TRUE",
    )
    .bind(candidate_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

/// Visible candidates among `ids`, keyed by id. Hidden or deleted ids are absent.
pub async fn get_visible_candidates(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, CandidateProfile>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<CandidateProfile> = sqlx::query_as(
        "SELECT * FROM candidate_profiles WHERE id = ANY($1) AND is_visible = TRUE",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|c| (c.id, c)).collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateSearchHit {
    #[serde(flatten)]
    pub candidate: CandidateView,
    pub fit_score: u32,
}
