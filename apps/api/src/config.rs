use std::str::FromStr;

use anyhow::{Context, Result};

use crate::matching::disclosure::AnonymizationConfig;
use crate::matching::fit_score::FitScoreBand;
use crate::matching::scoring::ScoringConfig;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub analyzer_url: String,
    pub analyzer_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub run_migrations: bool,
    pub fit_band: FitScoreBand,
    pub anonymization: AnonymizationConfig,
    pub scoring: ScoringConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let fit_defaults = FitScoreBand::default();
        let anon_defaults = AnonymizationConfig::default();
        let scoring_defaults = ScoringConfig::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            analyzer_url: require_env("ANALYZER_URL")?,
            analyzer_api_key: std::env::var("ANALYZER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            run_migrations: parse_env("RUN_MIGRATIONS", true)?,
            fit_band: FitScoreBand {
                floor: parse_env("FIT_SCORE_FLOOR", fit_defaults.floor)?,
                span: parse_env("FIT_SCORE_SPAN", fit_defaults.span)?,
                default_score: parse_env("FIT_SCORE_DEFAULT", fit_defaults.default_score)?,
            },
            anonymization: AnonymizationConfig {
                label_prefix: std::env::var("ANON_LABEL_PREFIX")
                    .unwrap_or(anon_defaults.label_prefix),
                hash_len: parse_env("ANON_HASH_LEN", anon_defaults.hash_len)?,
            },
            scoring: ScoringConfig {
                priority_must_have_cutoff: parse_env(
                    "PRIORITY_MUST_HAVE_CUTOFF",
                    scoring_defaults.priority_must_have_cutoff,
                )?,
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, falling back to `default` when unset.
/// A set-but-unparseable value is an error rather than a silent default.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u16 = parse_env("TALENT_MATCH_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("TALENT_MATCH_TEST_BAD_FLOOR", "sixty");
        let result: Result<f64> = parse_env("TALENT_MATCH_TEST_BAD_FLOOR", 60.0);
        assert!(result.is_err());
        std::env::remove_var("TALENT_MATCH_TEST_BAD_FLOOR");
    }

    #[test]
    fn test_parse_env_reads_bool() {
        std::env::set_var("TALENT_MATCH_TEST_MIGRATIONS", "false");
        let value: bool = parse_env("TALENT_MATCH_TEST_MIGRATIONS", true).unwrap();
        assert!(!value);
        std::env::remove_var("TALENT_MATCH_TEST_MIGRATIONS");
    }
}
