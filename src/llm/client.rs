//! Gemini `generateContent` wrapper.
//!
//! Every call requests a JSON response body and deserializes it into one of
//! the typed schemas. The base URL is configurable for tests.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
pub struct Generator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl Generator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Run one generation call and deserialize the model's JSON output.
    pub async fn generate<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach generator: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            return Err(AppError::Upstream(format!(
                "Generator returned {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let envelope: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("Malformed generator envelope: {}", e)))?;
        let payload = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AppError::Upstream("Generator returned no candidates".to_string()))?;

        serde_json::from_str(strip_fences(&payload))
            .map_err(|e| AppError::Upstream(format!("Generator returned malformed structure: {}", e)))
    }
}

/// Models occasionally wrap JSON in markdown fences despite the mime hint.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schemas::DevReport;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn candidate_envelope(payload: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": payload.to_string()}]}
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_typed_response() {
        let server = MockServer::start().await;
        let report = serde_json::json!({
            "summary": "quiet day",
            "changes": ["one fix"],
            "issues": [],
            "suggestions": ["add tests"]
        });
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_envelope(&report)))
            .mount(&server)
            .await;

        let client = Generator::new(server.uri(), "test-key", DEFAULT_MODEL);
        let parsed: DevReport = client.generate("summarize").await.unwrap();
        assert_eq!(parsed.summary, "quiet day");
        assert_eq!(parsed.changes, vec!["one fix"]);
    }

    #[tokio::test]
    async fn test_malformed_structure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_envelope(
                &serde_json::json!({"not": "a dev report"}),
            )))
            .mount(&server)
            .await;

        let client = Generator::new(server.uri(), "k", DEFAULT_MODEL);
        let err = client.generate::<DevReport>("p").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_provider_error_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = Generator::new(server.uri(), "k", DEFAULT_MODEL);
        let err = client.generate::<DevReport>("p").await.unwrap_err();
        match err {
            AppError::Upstream(msg) => assert!(msg.contains("500")),
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}
