//! Google Generative Language API backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LanguageModel;
use crate::error::LlmError;
use crate::Result;

/// Default base URL of the Generative Language API.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Base URL, without a trailing slash.
    pub endpoint: String,
    /// Upper bound for a single completion request.
    pub timeout: Duration,
    /// Maximum number of output tokens, if limited.
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature, if set.
    pub temperature: Option<f32>,
}

impl GeminiConfig {
    /// Create a configuration with the default endpoint and a 120 s timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout: Duration::from_secs(120),
            max_output_tokens: None,
            temperature: None,
        }
    }
}

/// Text completion client for Gemini models.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

// ── generateContent request/response types ─────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// ── Implementation ─────────────────────────────────────────────────────────

impl GeminiClient {
    /// Create a client. The API key must be non-empty.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ClientCreate(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }

    fn build_request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        let generation_config =
            if self.config.temperature.is_some() || self.config.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: self.config.temperature,
                    max_output_tokens: self.config.max_output_tokens,
                })
            } else {
                None
            };

        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn response_text(model: &str, response: GenerateResponse) -> Result<String> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked: {r}"))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(LlmError::EmptyResponse {
                model: model.to_string(),
                reason,
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                model: model.to_string(),
                reason: candidate
                    .finish_reason
                    .unwrap_or_else(|| "empty candidate".to_string()),
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);

        debug!(model = %model, prompt_len = prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        model: model.to_string(),
                    }
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            return Err(LlmError::Status {
                model: model.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    model: model.to_string(),
                }
            } else {
                LlmError::Decode(e.to_string())
            }
        })?;

        let text = Self::response_text(model, parsed)?;
        debug!(model = %model, response_len = text.len(), "Received generateContent response");

        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client() -> GeminiClient {
        GeminiClient::new(GeminiConfig::new("test-key")).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let result = GeminiClient::new(GeminiConfig::new("  "));
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn test_url_per_model() {
        let mut config = GeminiConfig::new("k");
        config.endpoint = "http://localhost:8080/v1beta/".to_string();
        let client = GeminiClient::new(config).unwrap();

        assert_eq!(
            client.url("gemini-2.0-flash-exp"),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn test_request_shape_without_generation_config() {
        let client = client();
        let value = serde_json::to_value(client.build_request("hello")).unwrap();

        assert_eq!(
            value,
            json!({ "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }] })
        );
    }

    #[test]
    fn test_request_shape_with_generation_config() {
        let mut config = GeminiConfig::new("k");
        config.temperature = Some(0.0);
        config.max_output_tokens = Some(2048);
        let client = GeminiClient::new(config).unwrap();

        let value = serde_json::to_value(client.build_request("hi")).unwrap();
        assert_eq!(
            value["generationConfig"],
            json!({ "temperature": 0.0, "maxOutputTokens": 2048 })
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "```json\n{" }, { "text": "}\n```" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let text = GeminiClient::response_text("m", response).unwrap();
        assert_eq!(text, "```json\n{}\n```");
    }

    #[test]
    fn test_response_text_blocked_prompt() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        let err = GeminiClient::response_text("m", response).unwrap_err();
        assert_eq!(err.to_string(), "m returned no text: prompt blocked: SAFETY");
    }

    #[test]
    fn test_response_text_empty_candidate() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "MAX_TOKENS" }]
        }))
        .unwrap();

        let err = GeminiClient::response_text("m", response).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { reason, .. } if reason == "MAX_TOKENS"));
    }

    #[tokio::test]
    async fn test_complete_unreachable_endpoint() {
        let mut config = GeminiConfig::new("k");
        config.endpoint = "http://127.0.0.1:9".to_string();
        config.timeout = Duration::from_secs(5);
        let client = GeminiClient::new(config).unwrap();

        let result = client.complete("gemini-1.5-flash-8b", "prompt").await;
        assert!(matches!(
            result,
            Err(LlmError::Request(_)) | Err(LlmError::Timeout { .. })
        ));
    }
}
