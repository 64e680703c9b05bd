use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A candidate profile as stored. Read-only from the matching engine's side;
/// writers must fill `field_of_study_normalized` with
/// `matching::requirements::normalize_field_of_study`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub preferred_locations: Vec<String>,
    pub years_experience: f64,
    pub skills: Vec<String>,
    /// Raw enum text ("BACHELOR", "MASTER", ...). Parsed leniently.
    pub highest_degree: Option<String>,
    pub field_of_study: Option<String>,
    pub field_of_study_normalized: Option<String>,
    pub current_employer: Option<String>,
    pub desired_salary_min: Option<i64>,
    pub desired_salary_max: Option<i64>,
    pub is_visible: bool,
    pub hide_current_employer: bool,
    pub hide_salary_history: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CvUnlockRow {
    pub recruiter_id: Uuid,
    pub candidate_id: Uuid,
    pub created_at: DateTime<Utc>,
}
