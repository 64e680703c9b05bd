//! Candidate Prefilter: coarse store-level narrowing before scoring.
//!
//! An AND of optional clauses built from the typed `RequirementFilter`. Its only
//! job is to bound scoring cost; `passes_education_requirements` remains the
//! authoritative gate and runs over whatever this returns.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::matching::requirements::{
    degree_spellings, field_aliases_for, JobLocation, RequirementFilter, CLEANED_DEGREE_SQL,
    CLEANED_FIELD_SQL,
};
use crate::models::candidate::CandidateProfile;

/// Upper bound on candidates handed to the scorer per analysis.
pub const PREFILTER_CAP: i64 = 200;

/// Escapes `%`, `_` and `\` for use inside a LIKE pattern.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends `AND …` clauses for every dimension the filter sets.
/// Assumes the builder already holds a `WHERE` clause.
pub(crate) fn push_requirement_clauses<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    filter: &'a RequirementFilter,
    job: &'a JobLocation,
) {
    if let Some(location) = job.filter_location() {
        builder
            .push(" AND (LOWER(TRIM(location)) = LOWER(")
            .push_bind(location)
            .push(") OR EXISTS (SELECT 1 FROM unnest(preferred_locations) AS p(loc) WHERE LOWER(TRIM(p.loc)) = LOWER(")
            .push_bind(location)
            .push(")))");
    }

    if let Some(min) = filter.experience.min {
        builder.push(" AND years_experience >= ").push_bind(min);
    }
    if let Some(max) = filter.experience.max {
        builder.push(" AND years_experience <= ").push_bind(max);
    }

    // Degree and field clauses must admit everything `passes_education_requirements`
    // accepts: alias spellings, stale or missing normalized columns.
    if let Some(allowed) = filter.allowed_degrees() {
        builder
            .push(format!(" AND {CLEANED_DEGREE_SQL} = ANY("))
            .push_bind(degree_spellings(&allowed))
            .push(")");
    }

    if !filter.required_fields.is_empty() {
        let patterns: Vec<String> = filter
            .required_fields
            .iter()
            .map(|f| format!("%{}%", escape_like(f)))
            .collect();
        builder
            .push(" AND (LOWER(COALESCE(field_of_study_normalized, '')) LIKE ANY(")
            .push_bind(patterns.clone())
            .push(format!(") OR {CLEANED_FIELD_SQL} LIKE ANY("))
            .push_bind(patterns)
            .push(format!(") OR {CLEANED_FIELD_SQL} = ANY("))
            .push_bind(field_aliases_for(&filter.required_fields))
            .push("))");
    }
}

/// Visible candidates passing the coarse filters, at most `PREFILTER_CAP`, in id order.
pub async fn prefilter_candidates(
    pool: &PgPool,
    filter: &RequirementFilter,
    job: &JobLocation,
) -> Result<Vec<CandidateProfile>, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM candidate_profiles WHERE is_visible = TRUE");
    push_requirement_clauses(&mut builder, filter, job);
    builder.push(" ORDER BY id ASC LIMIT ").push_bind(PREFILTER_CAP);

    Ok(builder
        .build_query_as::<CandidateProfile>()
        .fetch_all(pool)
        .await?)
}
