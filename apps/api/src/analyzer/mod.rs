/// Job analysis client: the single point of entry for the external text-analysis service.
///
/// The service turns free job-posting text into structured hiring requirements.
/// This crate never performs that extraction itself; it only consumes the contract below.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Analyzer returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Analyzer still failing after {retries} attempts")]
    Exhausted { retries: u32 },
}

/// Request sent to the analyzer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeJobRequest<'a> {
    pub jd_text: &'a str,
    pub title: &'a str,
    pub location: Option<&'a str>,
    pub remote_allowed: bool,
}

/// Structured analyzer output, as received. Every field is optional on the wire;
/// experience bounds and weights stay loosely typed so malformed values can be
/// dropped during normalization instead of failing the whole response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawJobAnalysis {
    pub must_have_skills: Vec<String>,
    pub nice_to_have_skills: Vec<String>,
    pub role_keywords: Vec<String>,
    pub min_experience_years: Value,
    pub max_experience_years: Value,
    pub required_degree_level: Option<String>,
    pub preferred_degree_level: Option<String>,
    pub required_fields_of_study: Vec<String>,
    pub preferred_fields_of_study: Vec<String>,
    pub weights: Value,
    pub summary: Option<String>,
    pub red_flags: Vec<String>,
}

/// Pluggable analyzer. Carried in `AppState` as `Arc<dyn JobAnalyzer>`.
#[async_trait]
pub trait JobAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalyzeJobRequest<'_>) -> Result<RawJobAnalysis, AnalyzerError>;
}

/// HTTP analyzer client with retry on 429 and 5xx.
#[derive(Clone)]
pub struct HttpJobAnalyzer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpJobAnalyzer {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl JobAnalyzer for HttpJobAnalyzer {
    async fn analyze(&self, request: &AnalyzeJobRequest<'_>) -> Result<RawJobAnalysis, AnalyzerError> {
        let mut last_error: Option<AnalyzerError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Analyzer call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut builder = self.client.post(&self.endpoint).json(request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AnalyzerError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Analyzer returned {}: {}", status, body);
                last_error = Some(AnalyzerError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AnalyzerError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let analysis: RawJobAnalysis = response.json().await?;
            debug!(
                "Analyzer call succeeded: {} must-have, {} nice-to-have skills",
                analysis.must_have_skills.len(),
                analysis.nice_to_have_skills.len()
            );
            return Ok(analysis);
        }

        Err(last_error.unwrap_or(AnalyzerError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = AnalyzeJobRequest {
            jd_text: "We need a React engineer",
            title: "Frontend Engineer",
            location: Some("Berlin"),
            remote_allowed: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["jdText"], "We need a React engineer");
        assert_eq!(json["remoteAllowed"], true);
        assert_eq!(json["location"], "Berlin");
    }

    #[test]
    fn test_raw_analysis_tolerates_missing_fields() {
        let parsed: RawJobAnalysis = serde_json::from_str(r#"{"mustHaveSkills": ["React"]}"#).unwrap();
        assert_eq!(parsed.must_have_skills, vec!["React".to_string()]);
        assert!(parsed.required_degree_level.is_none());
        assert!(parsed.min_experience_years.is_null());
    }

    #[test]
    fn test_raw_analysis_keeps_malformed_bounds_as_values() {
        let parsed: RawJobAnalysis = serde_json::from_str(
            r#"{"minExperienceYears": "three", "maxExperienceYears": 6, "requiredDegreeLevel": "BACHELOR"}"#,
        )
        .unwrap();
        assert!(parsed.min_experience_years.is_string());
        assert_eq!(parsed.max_experience_years, serde_json::json!(6));
        assert_eq!(parsed.required_degree_level.as_deref(), Some("BACHELOR"));
    }
}
