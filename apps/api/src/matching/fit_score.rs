//! Lightweight fit score for live candidate browse/search.
//!
//! Not the deep match score: there is no analysis behind it, only the free-text
//! query. It exists to show a plausible fit number next to browse results and is
//! never persisted as a recommendation.

use serde::{Deserialize, Serialize};

/// Mapping of the token hit ratio into a displayed score:
/// `floor + ratio * span`, or `default_score` when the query has no tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitScoreBand {
    pub floor: f64,
    pub span: f64,
    pub default_score: u32,
}

impl Default for FitScoreBand {
    fn default() -> Self {
        Self {
            floor: 60.0,
            span: 38.0,
            default_score: 70,
        }
    }
}

/// Splits a free-text query into lower-cased tokens on whitespace and commas.
/// Empty and repeated tokens are dropped; first-seen order is kept.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in query
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
    {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Fraction of query tokens appearing as a substring of any candidate skill,
/// mapped into the configured band and rounded.
pub fn compute_fit_score(skills: &[String], query_tokens: &[String], band: &FitScoreBand) -> u32 {
    if query_tokens.is_empty() {
        return band.default_score;
    }

    let lowered: Vec<String> = skills.iter().map(|s| s.to_lowercase()).collect();
    let hits = query_tokens
        .iter()
        .filter(|token| {
            let token = token.to_lowercase();
            lowered.iter().any(|skill| skill.contains(token.as_str()))
        })
        .count();

    let ratio = hits as f64 / query_tokens.len() as f64;
    (band.floor + ratio * band.span).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_query_tokens_returns_default() {
        let score = compute_fit_score(&skills(&["Python", "Django"]), &[], &FitScoreBand::default());
        assert_eq!(score, 70);
    }

    #[test]
    fn test_all_tokens_hit_is_top_of_band() {
        let tokens = tokenize_query("python django");
        let score = compute_fit_score(&skills(&["Python", "Django"]), &tokens, &FitScoreBand::default());
        assert_eq!(score, 98);
    }

    #[test]
    fn test_no_tokens_hit_is_floor() {
        let tokens = tokenize_query("rust");
        let score = compute_fit_score(&skills(&["Python", "Django"]), &tokens, &FitScoreBand::default());
        assert_eq!(score, 60);
    }

    #[test]
    fn test_partial_hit_rounds() {
        // 1/3 hit → 60 + 12.67 → 73
        let tokens = tokenize_query("react, go rust");
        let score = compute_fit_score(&skills(&["React Native"]), &tokens, &FitScoreBand::default());
        assert_eq!(score, 73);
    }

    #[test]
    fn test_substring_match_is_case_insensitive() {
        let tokens = vec!["POSTGRES".to_string()];
        let score = compute_fit_score(&skills(&["PostgreSQL"]), &tokens, &FitScoreBand::default());
        assert_eq!(score, 98);
    }

    #[test]
    fn test_band_is_configurable() {
        let band = FitScoreBand {
            floor: 50.0,
            span: 50.0,
            default_score: 55,
        };
        assert_eq!(compute_fit_score(&[], &[], &band), 55);
        assert_eq!(compute_fit_score(&skills(&["Go"]), &["go".to_string()], &band), 100);
    }

    #[test]
    fn test_tokenize_query_dedups_and_lowercases() {
        assert_eq!(
            tokenize_query("  React,react  NODE ,, "),
            vec!["react".to_string(), "node".to_string()]
        );
        assert!(tokenize_query("   ").is_empty());
    }
}
