use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub recruiter_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub remote_allowed: bool,
    pub active_analysis_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobAnalysisRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub must_have_skills: Vec<String>,
    pub nice_to_have_skills: Vec<String>,
    pub role_keywords: Vec<String>,
    pub min_experience_years: Option<f64>,
    pub max_experience_years: Option<f64>,
    pub required_degree: Option<String>,
    pub preferred_degree: Option<String>,
    pub required_fields_of_study: Vec<String>,
    pub preferred_fields_of_study: Vec<String>,
    pub weights: Value,
    pub summary: Option<String>,
    pub red_flags: Vec<String>,
    pub created_at: DateTime<Utc>,
}
