//! Deep match scoring: scores one candidate against an analyzed job.
//!
//! Pure and deterministic: the same (candidate, requirements, config) always
//! yields the same score, reasons and gaps. No I/O happens here.
//!
//! Algorithm:
//! 1. Five components, each in 0.0 – 1.0:
//!    - must-have coverage   = matched / required (1.0 when nothing is required)
//!    - nice-to-have coverage (1.0 when none listed)
//!    - experience proximity  (1.0 inside the band, linear decay below, mild decay above)
//!    - location compatibility (1.0 remote / same / preferred location, else 0.3)
//!    - education alignment    (mean of degree fit and field fit)
//! 2. score = round(100 × Σ weight × component), clamped to 0 – 100
//! 3. is_priority = must-have coverage ≥ cutoff AND experience inside the band

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::matching::requirements::{
    candidate_degree, field_matches_any, AnalysisRequirements, ExperienceBounds,
};
use crate::models::candidate::CandidateProfile;

const LOCATION_MISMATCH_FIT: f64 = 0.3;
const FIELD_PREFERRED_ONLY_FIT: f64 = 0.7;
const FIELD_MISMATCH_FIT: f64 = 0.3;
const OVER_EXPERIENCE_DECAY_PER_YEAR: f64 = 0.1;
const OVER_EXPERIENCE_FLOOR: f64 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Weights and config
// ────────────────────────────────────────────────────────────────────────────

/// Relative weight of each scoring component. Always normalized to sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
    #[serde(alias = "must_have")]
    pub must_have: f64,
    #[serde(alias = "nice_to_have")]
    pub nice_to_have: f64,
    pub experience: f64,
    pub location: f64,
    pub education: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            must_have: 0.45,
            nice_to_have: 0.15,
            experience: 0.20,
            location: 0.10,
            education: 0.10,
        }
    }
}

impl ScoringWeights {
    /// Reads analyzer-supplied weights. Missing keys take their default;
    /// anything unusable falls back to the defaults as a whole.
    pub fn from_value(value: &Value) -> Self {
        if value.is_null() {
            return Self::default();
        }
        match serde_json::from_value::<ScoringWeights>(value.clone()) {
            Ok(weights) => weights.normalized(),
            Err(e) => {
                warn!("Ignoring malformed scoring weights from analyzer: {e}");
                Self::default()
            }
        }
    }

    fn parts(&self) -> [f64; 5] {
        [
            self.must_have,
            self.nice_to_have,
            self.experience,
            self.location,
            self.education,
        ]
    }

    /// Rescales to sum 1.0. Negative, non-finite or all-zero weights → defaults.
    pub fn normalized(self) -> Self {
        let parts = self.parts();
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            warn!("Scoring weights contain negative or non-finite values; using defaults");
            return Self::default();
        }
        let sum: f64 = parts.iter().sum();
        if sum <= f64::EPSILON {
            return Self::default();
        }
        Self {
            must_have: self.must_have / sum,
            nice_to_have: self.nice_to_have / sum,
            experience: self.experience / sum,
            location: self.location / sum,
            education: self.education / sum,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum must-have coverage (0.0 – 1.0) for the priority flag.
    pub priority_must_have_cutoff: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            priority_must_have_cutoff: 0.8,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u32, // 0 – 100
    pub reasons: Vec<String>,
    pub gaps: Vec<String>,
    pub is_priority: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Skill matching
// ────────────────────────────────────────────────────────────────────────────

struct SkillKey {
    compact: String,
    head: String,
    single_token: bool,
}

fn is_skill_char(c: char) -> bool {
    c.is_alphanumeric() || c == '+' || c == '#'
}

fn skill_key(raw: &str) -> SkillKey {
    let lower = raw.trim().to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !is_skill_char(c))
        .filter(|t| !t.is_empty())
        .collect();
    SkillKey {
        compact: tokens.concat(),
        head: tokens.first().map(|t| t.to_string()).unwrap_or_default(),
        single_token: tokens.len() <= 1,
    }
}

/// Case- and punctuation-insensitive skill comparison.
/// "Node" matches "Node.js"; "Java" does not match "JavaScript".
pub fn skills_match(a: &str, b: &str) -> bool {
    let (a, b) = (skill_key(a), skill_key(b));
    if a.compact.is_empty() || b.compact.is_empty() {
        return false;
    }
    a.compact == b.compact || ((a.single_token || b.single_token) && a.head == b.head)
}

/// Splits `wanted` into (present, missing) against the candidate's skills, preserving order.
fn partition_skills<'a>(candidate_skills: &[String], wanted: &'a [String]) -> (Vec<&'a str>, Vec<&'a str>) {
    wanted
        .iter()
        .map(String::as_str)
        .partition(|w| candidate_skills.iter().any(|s| skills_match(s, w)))
}

fn coverage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        matched as f64 / total as f64
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Component scores
// ────────────────────────────────────────────────────────────────────────────

fn format_years(years: f64) -> String {
    if years.fract().abs() < f64::EPSILON {
        format!("{}", years as i64)
    } else {
        format!("{years:.1}")
    }
}

fn format_band(bounds: &ExperienceBounds) -> String {
    match (bounds.min, bounds.max) {
        (Some(lo), Some(hi)) => format!("{}-{} years", format_years(lo), format_years(hi)),
        (Some(lo), None) => format!("{}+ years", format_years(lo)),
        (None, Some(hi)) => format!("up to {} years", format_years(hi)),
        (None, None) => "any experience".to_string(),
    }
}

fn experience_fit(years: f64, bounds: &ExperienceBounds) -> f64 {
    if bounds.contains(years) {
        return 1.0;
    }
    if let Some(min) = bounds.min.filter(|min| years < *min) {
        return (1.0 - (min - years) / min.max(1.0)).clamp(0.0, 1.0);
    }
    if let Some(max) = bounds.max.filter(|max| years > *max) {
        return (1.0 - OVER_EXPERIENCE_DECAY_PER_YEAR * (years - max)).max(OVER_EXPERIENCE_FLOOR);
    }
    1.0
}

enum LocationFit {
    Remote,
    Unrestricted,
    Same(String),
    Preferred(String),
    Mismatch { candidate: Option<String>, job: String },
}

fn location_fit(candidate: &CandidateProfile, requirements: &AnalysisRequirements) -> LocationFit {
    if requirements.job_location.remote_allowed {
        return LocationFit::Remote;
    }
    let Some(job) = requirements.job_location.filter_location() else {
        return LocationFit::Unrestricted;
    };
    if let Some(own) = candidate
        .location
        .as_deref()
        .filter(|l| l.trim().eq_ignore_ascii_case(job))
    {
        return LocationFit::Same(own.trim().to_string());
    }
    if let Some(pref) = candidate
        .preferred_locations
        .iter()
        .find(|l| l.trim().eq_ignore_ascii_case(job))
    {
        return LocationFit::Preferred(pref.trim().to_string());
    }
    LocationFit::Mismatch {
        candidate: candidate.location.clone(),
        job: job.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Deep score
// ────────────────────────────────────────────────────────────────────────────

/// Scores a candidate against analyzed job requirements.
pub fn score_candidate(
    candidate: &CandidateProfile,
    requirements: &AnalysisRequirements,
    config: &ScoringConfig,
) -> MatchResult {
    let weights = requirements.weights.normalized();
    let mut reasons = Vec::new();
    let mut gaps = Vec::new();

    // Must-have skills
    let (must_hit, must_miss) = partition_skills(&candidate.skills, &requirements.must_have_skills);
    let must_total = requirements.must_have_skills.len();
    let must_cov = coverage(must_hit.len(), must_total);
    if must_total > 0 && !must_hit.is_empty() {
        reasons.push(format!(
            "Matches {}/{} must-have skills",
            must_hit.len(),
            must_total
        ));
    }
    if !must_miss.is_empty() {
        gaps.push(format!("Missing must-have skills: {}", must_miss.join(", ")));
    }

    // Nice-to-have skills
    let (nice_hit, _) = partition_skills(&candidate.skills, &requirements.nice_to_have_skills);
    let nice_total = requirements.nice_to_have_skills.len();
    let nice_cov = coverage(nice_hit.len(), nice_total);
    if !nice_hit.is_empty() {
        reasons.push(format!(
            "Also brings {}/{} nice-to-have skills: {}",
            nice_hit.len(),
            nice_total,
            nice_hit.join(", ")
        ));
    }

    // Experience
    let bounds = &requirements.filter.experience;
    let years = candidate.years_experience;
    let in_band = bounds.contains(years);
    let exp_fit = experience_fit(years, bounds);
    if !bounds.is_unbounded() {
        if in_band {
            reasons.push(format!(
                "{} years of experience within the requested {}",
                format_years(years),
                format_band(bounds)
            ));
        } else if let Some(min) = bounds.min.filter(|min| years < *min) {
            gaps.push(format!(
                "Experience shortfall: {} years vs {} required",
                format_years(years),
                format_years(min)
            ));
        } else {
            gaps.push(format!(
                "Above the requested experience band: {} years vs {}",
                format_years(years),
                format_band(bounds)
            ));
        }
    }

    // Location
    let loc_fit = match location_fit(candidate, requirements) {
        LocationFit::Remote => {
            reasons.push("Remote-compatible role".to_string());
            1.0
        }
        LocationFit::Unrestricted => 1.0,
        LocationFit::Same(loc) => {
            reasons.push(format!("Based in {loc}"));
            1.0
        }
        LocationFit::Preferred(loc) => {
            reasons.push(format!("Open to working in {loc}"));
            1.0
        }
        LocationFit::Mismatch { candidate, job } => {
            gaps.push(match candidate {
                Some(own) => format!("Located in {own}, role is in {job}"),
                None => format!("No location on file, role is in {job}"),
            });
            LOCATION_MISMATCH_FIT
        }
    };

    // Education: degree
    let level = candidate_degree(candidate);
    let degree_fit = match (requirements.filter.required_degree, level) {
        (None, _) => 1.0,
        (Some(required), Some(held)) if held >= required => {
            reasons.push(format!("{held} degree meets the {required} requirement"));
            1.0
        }
        (Some(required), Some(held)) => {
            gaps.push(format!("Degree mismatch: {held} held, {required} required"));
            0.0
        }
        (Some(required), None) => {
            gaps.push(format!("Degree mismatch: no degree on file, {required} required"));
            0.0
        }
    };
    if let (Some(preferred), Some(held)) = (requirements.preferred_degree, level) {
        if held >= preferred && requirements.filter.required_degree.map_or(true, |r| preferred > r) {
            reasons.push(format!("Holds the preferred {preferred} degree"));
        }
    }

    // Education: field of study
    let required_fields = &requirements.filter.required_fields;
    let preferred_fields = &requirements.preferred_fields;
    let field_label = candidate
        .field_of_study
        .clone()
        .unwrap_or_else(|| "unspecified".to_string());
    let field_fit = if !required_fields.is_empty() {
        if field_matches_any(candidate, required_fields) {
            reasons.push(format!("Field of study matches: {field_label}"));
            1.0
        } else {
            gaps.push(format!(
                "Field of study {field_label} does not match {}",
                required_fields.join(" / ")
            ));
            if field_matches_any(candidate, preferred_fields) {
                FIELD_PREFERRED_ONLY_FIT
            } else {
                FIELD_MISMATCH_FIT
            }
        }
    } else if !preferred_fields.is_empty() {
        if field_matches_any(candidate, preferred_fields) {
            reasons.push(format!("Field of study matches preferred: {field_label}"));
            1.0
        } else {
            FIELD_PREFERRED_ONLY_FIT
        }
    } else {
        1.0
    };
    let edu_fit = (degree_fit + field_fit) / 2.0;

    let raw = weights.must_have * must_cov
        + weights.nice_to_have * nice_cov
        + weights.experience * exp_fit
        + weights.location * loc_fit
        + weights.education * edu_fit;
    let score = (raw * 100.0).round().clamp(0.0, 100.0) as u32;

    MatchResult {
        score,
        reasons,
        gaps,
        is_priority: must_cov >= config.priority_must_have_cutoff && in_band,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
