//! Requirement Normalizer: turns a raw analyzer result into typed, query-ready filters.
//!
//! Every dimension is optional. An absent or unparseable dimension from the
//! analyzer becomes `None` (no filter on that dimension), never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::analyzer::RawJobAnalysis;
use crate::matching::scoring::ScoringWeights;
use crate::models::candidate::CandidateProfile;

// ────────────────────────────────────────────────────────────────────────────
// Degree levels
// ────────────────────────────────────────────────────────────────────────────

/// Highest completed degree. Declaration order is the total order used for gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DegreeLevel {
    Diploma,
    Bachelor,
    Master,
    Phd,
}

impl DegreeLevel {
    pub const ALL: [DegreeLevel; 4] = [
        DegreeLevel::Diploma,
        DegreeLevel::Bachelor,
        DegreeLevel::Master,
        DegreeLevel::Phd,
    ];

    /// Canonical storage form, as written to `highest_degree` / `required_degree`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DegreeLevel::Diploma => "DIPLOMA",
            DegreeLevel::Bachelor => "BACHELOR",
            DegreeLevel::Master => "MASTER",
            DegreeLevel::Phd => "PHD",
        }
    }

    /// Lenient parse. Returns `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<DegreeLevel> {
        let cleaned = clean_degree_text(raw);
        DEGREE_SPELLINGS
            .iter()
            .find(|(spelling, _)| *spelling == cleaned)
            .map(|(_, level)| *level)
    }
}

/// Every accepted spelling, in cleaned form (ASCII alphanumerics, lower-cased).
/// `DegreeLevel::parse` and the store-level degree filters both read this table.
const DEGREE_SPELLINGS: &[(&str, DegreeLevel)] = &[
    ("diploma", DegreeLevel::Diploma),
    ("associate", DegreeLevel::Diploma),
    ("associates", DegreeLevel::Diploma),
    ("highschool", DegreeLevel::Diploma),
    ("certificate", DegreeLevel::Diploma),
    ("bachelor", DegreeLevel::Bachelor),
    ("bachelors", DegreeLevel::Bachelor),
    ("ba", DegreeLevel::Bachelor),
    ("bs", DegreeLevel::Bachelor),
    ("bsc", DegreeLevel::Bachelor),
    ("beng", DegreeLevel::Bachelor),
    ("btech", DegreeLevel::Bachelor),
    ("undergraduate", DegreeLevel::Bachelor),
    ("master", DegreeLevel::Master),
    ("masters", DegreeLevel::Master),
    ("ma", DegreeLevel::Master),
    ("ms", DegreeLevel::Master),
    ("msc", DegreeLevel::Master),
    ("meng", DegreeLevel::Master),
    ("mtech", DegreeLevel::Master),
    ("mba", DegreeLevel::Master),
    ("phd", DegreeLevel::Phd),
    ("doctorate", DegreeLevel::Phd),
    ("doctoral", DegreeLevel::Phd),
    ("dphil", DegreeLevel::Phd),
];

/// SQL twin of `clean_degree_text` over the `highest_degree` column.
pub(crate) const CLEANED_DEGREE_SQL: &str =
    "regexp_replace(LOWER(COALESCE(highest_degree, '')), '[^a-z0-9]', '', 'g')";

fn clean_degree_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Cleaned spellings of every level in `levels`, for matching against `CLEANED_DEGREE_SQL`.
pub fn degree_spellings(levels: &[DegreeLevel]) -> Vec<String> {
    DEGREE_SPELLINGS
        .iter()
        .filter(|(_, level)| levels.contains(level))
        .map(|(spelling, _)| spelling.to_string())
        .collect()
}

impl std::fmt::Display for DegreeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Levels that satisfy a requirement of `required`: the level itself and everything above it.
pub fn allowed_degree_levels(required: DegreeLevel) -> Vec<DegreeLevel> {
    DegreeLevel::ALL
        .into_iter()
        .filter(|level| *level >= required)
        .collect()
}

/// Degree of a stored candidate, if it parses.
pub fn candidate_degree(candidate: &CandidateProfile) -> Option<DegreeLevel> {
    candidate.highest_degree.as_deref().and_then(DegreeLevel::parse)
}

// ────────────────────────────────────────────────────────────────────────────
// Field of study
// ────────────────────────────────────────────────────────────────────────────

/// Whole-string synonyms applied after cleanup. Left side must already be cleaned.
const FIELD_SYNONYMS: &[(&str, &str)] = &[
    ("cs", "computer science"),
    ("comp sci", "computer science"),
    ("compsci", "computer science"),
    ("computing science", "computer science"),
    ("computer sciences", "computer science"),
    ("ee", "electrical engineering"),
    ("ece", "electrical and computer engineering"),
    ("it", "information technology"),
    ("info tech", "information technology"),
    ("math", "mathematics"),
    ("maths", "mathematics"),
    ("stats", "statistics"),
    ("mech eng", "mechanical engineering"),
    ("mechanical eng", "mechanical engineering"),
    ("business admin", "business administration"),
    ("mba", "business administration"),
];

/// Canonical form of a free-text field of study, used on both the write side
/// (candidate profiles) and the filter side. Both sides must go through here.
pub fn normalize_field_of_study(raw: &str) -> String {
    let replaced = raw.replace('&', " and ");
    let cleaned = replaced
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    FIELD_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == collapsed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(collapsed)
}

fn normalize_fields(raw: &[String]) -> Vec<String> {
    let mut fields: Vec<String> = raw
        .iter()
        .map(|f| normalize_field_of_study(f))
        .filter(|f| !f.is_empty())
        .collect();
    fields.sort();
    fields.dedup();
    fields
}

/// Candidate field strings to match against: the stored normalized column plus a
/// fresh normalization of the primary field, so a stale column cannot hide a match.
fn candidate_fields(candidate: &CandidateProfile) -> Vec<String> {
    let mut fields = Vec::with_capacity(2);
    if let Some(stored) = candidate.field_of_study_normalized.as_deref() {
        let stored = stored.trim().to_lowercase();
        if !stored.is_empty() {
            fields.push(stored);
        }
    }
    if let Some(primary) = candidate.field_of_study.as_deref() {
        let fresh = normalize_field_of_study(primary);
        if !fresh.is_empty() && !fields.contains(&fresh) {
            fields.push(fresh);
        }
    }
    fields
}

/// SQL twin of the cleanup half of `normalize_field_of_study` over `field_of_study`
/// (synonyms excluded; see `field_aliases_for`).
pub(crate) const CLEANED_FIELD_SQL: &str = "TRIM(regexp_replace(LOWER(REPLACE(COALESCE(field_of_study, ''), '&', ' and ')), '[^[:alnum:]]+', ' ', 'g'))";

/// Cleaned raw spellings whose synonym target contains one of `wanted`.
/// A raw field equal to one of these normalizes to a matching field.
pub fn field_aliases_for(wanted: &[String]) -> Vec<String> {
    FIELD_SYNONYMS
        .iter()
        .filter(|(_, canonical)| wanted.iter().any(|w| canonical.contains(w.as_str())))
        .map(|(alias, _)| alias.to_string())
        .collect()
}

/// True when any of `wanted` is a substring of the candidate's normalized field.
pub fn field_matches_any(candidate: &CandidateProfile, wanted: &[String]) -> bool {
    let fields = candidate_fields(candidate);
    wanted
        .iter()
        .any(|w| fields.iter().any(|f| f.contains(w.as_str())))
}

// ────────────────────────────────────────────────────────────────────────────
// Experience bounds
// ────────────────────────────────────────────────────────────────────────────

/// Inclusive experience band. `None` on a side means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ExperienceBounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => {
                warn!("Experience bounds inverted (min {lo} > max {hi}); dropping max");
                Self { min, max: None }
            }
            _ => Self { min, max },
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, years: f64) -> bool {
        self.min.map_or(true, |lo| years >= lo) && self.max.map_or(true, |hi| years <= hi)
    }
}

/// Accepts a JSON number or numeric string. Negative, non-finite or
/// non-numeric values are treated as absent.
pub fn lenient_years(value: &Value) -> Option<f64> {
    let years = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('+').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (years.is_finite() && years >= 0.0).then_some(years)
}

// ────────────────────────────────────────────────────────────────────────────
// Normalized filter
// ────────────────────────────────────────────────────────────────────────────

/// Query-ready hiring filter. Each `Option`/empty field means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementFilter {
    pub required_degree: Option<DegreeLevel>,
    pub required_fields: Vec<String>,
    pub experience: ExperienceBounds,
}

impl RequirementFilter {
    /// Allowed degree levels, or `None` when no degree filter applies.
    pub fn allowed_degrees(&self) -> Option<Vec<DegreeLevel>> {
        self.required_degree.map(allowed_degree_levels)
    }
}

/// Where the job is and whether it can be done remotely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobLocation {
    pub location: Option<String>,
    pub remote_allowed: bool,
}

impl JobLocation {
    /// Location to filter on, or `None` when location must not filter.
    pub fn filter_location(&self) -> Option<&str> {
        if self.remote_allowed {
            return None;
        }
        self.location.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Everything the deep scorer needs about a job, normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequirements {
    pub filter: RequirementFilter,
    pub must_have_skills: Vec<String>,
    pub nice_to_have_skills: Vec<String>,
    pub preferred_degree: Option<DegreeLevel>,
    pub preferred_fields: Vec<String>,
    pub weights: ScoringWeights,
    pub job_location: JobLocation,
}

fn parse_degree_field(raw: Option<&str>, label: &str) -> Option<DegreeLevel> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = DegreeLevel::parse(raw);
    if parsed.is_none() {
        warn!("Unrecognized {label} degree level '{raw}' from analyzer; ignoring");
    }
    parsed
}

/// Builds the coarse/authoritative filter from a raw analyzer result.
pub fn normalize_requirements(raw: &RawJobAnalysis) -> RequirementFilter {
    RequirementFilter {
        required_degree: parse_degree_field(raw.required_degree_level.as_deref(), "required"),
        required_fields: normalize_fields(&raw.required_fields_of_study),
        experience: ExperienceBounds::new(
            lenient_years(&raw.min_experience_years),
            lenient_years(&raw.max_experience_years),
        ),
    }
}

/// Builds the full scorer input for a raw analysis and its job's location.
pub fn normalize_analysis(raw: &RawJobAnalysis, job_location: JobLocation) -> AnalysisRequirements {
    AnalysisRequirements {
        filter: normalize_requirements(raw),
        must_have_skills: dedup_skills(&raw.must_have_skills),
        nice_to_have_skills: dedup_skills(&raw.nice_to_have_skills),
        preferred_degree: parse_degree_field(raw.preferred_degree_level.as_deref(), "preferred"),
        preferred_fields: normalize_fields(&raw.preferred_fields_of_study),
        weights: ScoringWeights::from_value(&raw.weights),
        job_location,
    }
}

/// Trims and removes case-insensitive duplicates, keeping first-seen order.
fn dedup_skills(raw: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(String::from)
        .collect()
}

/// Authoritative education gate run before scoring. The store-level prefilter may
/// be approximate; this is exact. Candidates failing here are dropped, not scored.
pub fn passes_education_requirements(
    candidate: &CandidateProfile,
    filter: &RequirementFilter,
) -> bool {
    if let Some(required) = filter.required_degree {
        match candidate_degree(candidate) {
            Some(level) if level >= required => {}
            _ => return false,
        }
    }

    if !filter.required_fields.is_empty() && !field_matches_any(candidate, &filter.required_fields)
    {
        return false;
    }

    true
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    pub(crate) fn make_candidate(
        degree: Option<&str>,
        field: Option<&str>,
        years: f64,
        skills: &[&str],
    ) -> CandidateProfile {
        CandidateProfile {
            id: Uuid::new_v4(),
            full_name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: Some("+44 20 0000 0000".to_string()),
            headline: Some("Full-stack engineer".to_string()),
            location: Some("London".to_string()),
            preferred_locations: vec!["Berlin".to_string()],
            years_experience: years,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            highest_degree: degree.map(String::from),
            field_of_study: field.map(String::from),
            field_of_study_normalized: field.map(normalize_field_of_study),
            current_employer: Some("Analytical Engines Ltd".to_string()),
            desired_salary_min: Some(90_000),
            desired_salary_max: Some(120_000),
            is_visible: true,
            hide_current_employer: false,
            hide_salary_history: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn filter(degree: Option<DegreeLevel>, fields: &[&str]) -> RequirementFilter {
        RequirementFilter {
            required_degree: degree,
            required_fields: fields.iter().map(|f| normalize_field_of_study(f)).collect(),
            experience: ExperienceBounds::default(),
        }
    }

    #[test]
    fn test_allowed_levels_include_required_and_above() {
        assert_eq!(
            allowed_degree_levels(DegreeLevel::Bachelor),
            vec![DegreeLevel::Bachelor, DegreeLevel::Master, DegreeLevel::Phd]
        );
        assert_eq!(allowed_degree_levels(DegreeLevel::Phd), vec![DegreeLevel::Phd]);
    }

    #[test]
    fn test_allowed_levels_shrink_as_requirement_rises() {
        for level in DegreeLevel::ALL {
            let allowed = allowed_degree_levels(level);
            assert!(allowed.contains(&level));
            for higher in DegreeLevel::ALL.into_iter().filter(|l| *l > level) {
                let stricter = allowed_degree_levels(higher);
                assert!(stricter.len() < allowed.len());
                assert!(stricter.iter().all(|l| allowed.contains(l)));
            }
        }
    }

    #[test]
    fn test_degree_parse_aliases() {
        assert_eq!(DegreeLevel::parse("BACHELOR"), Some(DegreeLevel::Bachelor));
        assert_eq!(DegreeLevel::parse("B.Sc."), Some(DegreeLevel::Bachelor));
        assert_eq!(DegreeLevel::parse("Master's"), Some(DegreeLevel::Master));
        assert_eq!(DegreeLevel::parse("Ph.D"), Some(DegreeLevel::Phd));
        assert_eq!(DegreeLevel::parse("wizard"), None);
    }

    #[test]
    fn test_degree_spellings_cover_every_parsed_level() {
        let allowed = allowed_degree_levels(DegreeLevel::Bachelor);
        let spellings = degree_spellings(&allowed);
        for spelling in ["bachelor", "bsc", "msc", "masters", "phd", "doctorate"] {
            assert!(spellings.contains(&spelling.to_string()), "missing {spelling}");
        }
        assert!(!spellings.contains(&"diploma".to_string()));
        for spelling in &spellings {
            let level = DegreeLevel::parse(spelling).unwrap();
            assert!(allowed.contains(&level));
        }
    }

    #[test]
    fn test_field_aliases_for_wanted_field() {
        let aliases = field_aliases_for(&["computer science".to_string()]);
        assert!(aliases.contains(&"comp sci".to_string()));
        assert!(aliases.contains(&"cs".to_string()));
        assert!(!aliases.contains(&"maths".to_string()));
        for alias in &aliases {
            assert!(normalize_field_of_study(alias).contains("computer science"));
        }
    }

    #[test]
    fn test_normalize_field_collapses_synonyms() {
        assert_eq!(normalize_field_of_study("CS"), "computer science");
        assert_eq!(normalize_field_of_study("Comp. Sci."), "computer science");
        assert_eq!(
            normalize_field_of_study("  Computer   Science "),
            "computer science"
        );
        assert_eq!(
            normalize_field_of_study("Electrical & Computer Engineering"),
            "electrical and computer engineering"
        );
    }

    #[test]
    fn test_lenient_years_accepts_numbers_and_numeric_strings() {
        assert_eq!(lenient_years(&json!(3)), Some(3.0));
        assert_eq!(lenient_years(&json!("5+")), Some(5.0));
        assert_eq!(lenient_years(&json!("several")), None);
        assert_eq!(lenient_years(&json!(-1)), None);
        assert_eq!(lenient_years(&Value::Null), None);
    }

    #[test]
    fn test_inverted_bounds_drop_max() {
        let bounds = ExperienceBounds::new(Some(6.0), Some(3.0));
        assert_eq!(bounds.min, Some(6.0));
        assert_eq!(bounds.max, None);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let bounds = ExperienceBounds::new(Some(3.0), Some(6.0));
        assert!(bounds.contains(3.0));
        assert!(bounds.contains(6.0));
        assert!(!bounds.contains(2.9));
        assert!(!bounds.contains(6.5));
        assert!(ExperienceBounds::default().contains(40.0));
    }

    #[test]
    fn test_invalid_degree_fails_open() {
        let raw = RawJobAnalysis {
            required_degree_level: Some("GRANDMASTER".to_string()),
            min_experience_years: json!("n/a"),
            ..Default::default()
        };
        let filter = normalize_requirements(&raw);
        assert_eq!(filter.required_degree, None);
        assert!(filter.experience.is_unbounded());
    }

    #[test]
    fn test_normalize_requirements_full() {
        let raw = RawJobAnalysis {
            required_degree_level: Some("bachelor".to_string()),
            required_fields_of_study: vec!["Computer Science".to_string(), "CS".to_string()],
            min_experience_years: json!(3),
            max_experience_years: json!(6),
            ..Default::default()
        };
        let filter = normalize_requirements(&raw);
        assert_eq!(filter.required_degree, Some(DegreeLevel::Bachelor));
        assert_eq!(filter.required_fields, vec!["computer science".to_string()]);
        assert_eq!(filter.experience, ExperienceBounds::new(Some(3.0), Some(6.0)));
    }

    #[test]
    fn test_education_gate_accepts_higher_degree() {
        let candidate = make_candidate(Some("MASTER"), Some("Computer Science"), 4.0, &[]);
        assert!(passes_education_requirements(
            &candidate,
            &filter(Some(DegreeLevel::Bachelor), &["Computer Science"])
        ));
    }

    #[test]
    fn test_education_gate_rejects_lower_degree() {
        let candidate = make_candidate(Some("DIPLOMA"), Some("Computer Science"), 4.0, &[]);
        assert!(!passes_education_requirements(
            &candidate,
            &filter(Some(DegreeLevel::Bachelor), &[])
        ));
    }

    #[test]
    fn test_education_gate_rejects_missing_degree_when_required() {
        let candidate = make_candidate(None, Some("Computer Science"), 4.0, &[]);
        assert!(!passes_education_requirements(
            &candidate,
            &filter(Some(DegreeLevel::Diploma), &[])
        ));
    }

    #[test]
    fn test_education_gate_uses_fresh_normalization_when_column_stale() {
        let mut candidate = make_candidate(Some("BACHELOR"), Some("Comp Sci"), 4.0, &[]);
        candidate.field_of_study_normalized = Some("COMP SCI".to_string());
        assert!(passes_education_requirements(
            &candidate,
            &filter(None, &["Computer Science"])
        ));
    }

    #[test]
    fn test_education_gate_field_substring_match() {
        let candidate = make_candidate(
            Some("BACHELOR"),
            Some("Computer Science and Engineering"),
            4.0,
            &[],
        );
        assert!(passes_education_requirements(
            &candidate,
            &filter(None, &["computer science"])
        ));
        assert!(!passes_education_requirements(
            &candidate,
            &filter(None, &["biology"])
        ));
    }

    #[test]
    fn test_no_requirements_passes_everyone() {
        let candidate = make_candidate(None, None, 0.0, &[]);
        assert!(passes_education_requirements(
            &candidate,
            &RequirementFilter::default()
        ));
    }

    #[test]
    fn test_remote_job_has_no_location_filter() {
        let remote = JobLocation {
            location: Some("Berlin".to_string()),
            remote_allowed: true,
        };
        assert_eq!(remote.filter_location(), None);
        let onsite = JobLocation {
            location: Some(" Berlin ".to_string()),
            remote_allowed: false,
        };
        assert_eq!(onsite.filter_location(), Some("Berlin"));
    }
}
