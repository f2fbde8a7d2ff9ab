//! Generative-language backend for the suggestion service
//!
//! Speaks the `generateContent` REST shape: single-turn user content
//! plus a sampling configuration, answered by candidates carrying text
//! parts and a finish reason.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::auth::IdentityToken;
use crate::config::{GeminiConfig, SamplingConfig};
use crate::error::{Result, WayfarerError};
use crate::suggest::GenerativeClient;

/// Public endpoint of the generative-language service
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// HTTP client for the generative-language API
///
/// Stateless apart from configuration; one instance serves any number of
/// concurrent requests.
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    candidate_count: u32,
    max_output_tokens: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

impl From<&SamplingConfig> for GenerationConfig {
    fn from(sampling: &SamplingConfig) -> Self {
        Self {
            candidate_count: sampling.candidate_count,
            max_output_tokens: sampling.max_output_tokens,
            temperature: sampling.temperature,
            top_k: sampling.top_k,
            top_p: sampling.top_p,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    /// Create a new generative-language client
    ///
    /// # Arguments
    ///
    /// * `config` - Model name, API key, endpoint override and sampling
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("wayfarer/0.1.0")
            .build()
            .map_err(|e| {
                WayfarerError::Generation(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized generative client: model={}", config.model);

        Ok(Self { client, config })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
            self.config.model
        )
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    /// Send one prompt and return the model's raw text
    ///
    /// The text may be empty when the model produced no parts; callers
    /// decide what an empty generation means.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::GenerationStopped`] when generation ended
    /// for any reason other than normal completion (safety block, token
    /// cap), and [`WayfarerError::Generation`] for transport and protocol
    /// failures.
    async fn generate(&self, prompt: &str, token: Option<&IdentityToken>) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig::from(&self.config.sampling),
        };

        let mut request = self.client.post(self.generate_url()).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.query(&[("key", self.config.api_key.as_str())]);
        }
        if let Some(token) = token {
            request = request.bearer_auth(&token.token);
        }

        tracing::debug!("Sending generation request: model={}", self.config.model);

        let response = request.send().await.map_err(|e| {
            tracing::error!("Generation request failed: {}", e);
            WayfarerError::Generation(format!("Generation request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                "Generation service returned error {}: {}",
                status,
                error_text
            );
            return Err(WayfarerError::Generation(format!(
                "Generation service returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse generation response: {}", e);
            WayfarerError::Generation(format!("Failed to parse generation response: {}", e))
        })?;

        extract_text(parsed)
    }
}

/// Pulls the generated text out of a response, surfacing stops
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(WayfarerError::GenerationStopped { reason }.into());
        }
        return Ok(String::new());
    };

    if let Some(reason) = candidate.finish_reason {
        if reason != "STOP" {
            return Err(WayfarerError::GenerationStopped { reason }.into());
        }
    }

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_from(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let config = GeminiConfig::default();
        assert!(GeminiClient::new(config).is_ok());
    }

    #[test]
    fn test_generate_url_uses_model_and_base_override() {
        let config = GeminiConfig {
            model: "gemini-2.5-flash".to_string(),
            api_base: Some("http://localhost:4010".to_string()),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(
            client.generate_url(),
            "http://localhost:4010/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_generation_config_mirrors_sampling() {
        let sampling = SamplingConfig::default();
        let config = GenerationConfig::from(&sampling);
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["candidateCount"], 1);
        assert_eq!(json["maxOutputTokens"], 750);
        assert_eq!(json["topK"], 30);
        assert!((json["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
        assert!((json["topP"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: "hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig::from(&SamplingConfig::default()),
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["candidateCount"], 1);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = response_from(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Louvre "}, {"text": "Museum"}]
                },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_text(response).unwrap(), "Louvre Museum");
    }

    #[test]
    fn test_extract_text_without_finish_reason() {
        let response = response_from(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Eiffel Tower"}]}
            }]
        }));
        assert_eq!(extract_text(response).unwrap(), "Eiffel Tower");
    }

    #[test]
    fn test_extract_text_empty_candidates_is_empty_text() {
        let response = response_from(serde_json::json!({"candidates": []}));
        assert_eq!(extract_text(response).unwrap(), "");
    }

    #[test]
    fn test_extract_text_surfaces_non_stop_finish() {
        let response = response_from(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "partial"}]},
                "finishReason": "MAX_TOKENS"
            }]
        }));
        let err = extract_text(response).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_extract_text_surfaces_prompt_block() {
        let response = response_from(serde_json::json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        let err = extract_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_extract_text_candidate_without_content() {
        let response = response_from(serde_json::json!({
            "candidates": [{"finishReason": "STOP"}]
        }));
        assert_eq!(extract_text(response).unwrap(), "");
    }
}
