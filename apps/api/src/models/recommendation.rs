use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecommendationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub analysis_id: Uuid,
    pub candidate_id: Uuid,
    pub rank: i32,
    pub match_score: i32,
    pub reasons: Vec<String>,
    pub gaps: Vec<String>,
    pub is_priority: bool,
    pub created_at: DateTime<Utc>,
}
