//! Language-model capability for question generation.
//!
//! The workflow treats text generation as an injected capability: a
//! [`LanguageModel`] produces raw text for a prompt on a named model tier.
//! This module provides the trait plus an OpenAI-compatible HTTP client
//! implementation that maps API failures onto the transient/content error
//! taxonomy the circuit breaker depends on.

pub mod router;

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

pub use router::{ComplexityClass, ModelRouter};

/// Named model backend class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Fast, small model for straightforward questions.
    Fast,
    /// Larger, slower model for multi-step or high-grade content.
    Advanced,
}

impl ModelTier {
    /// Stable lowercase name used for service attribution.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Advanced => "advanced",
        }
    }
}

/// Capability for generating text from a prompt on a given tier.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate raw text for the prompt.
    ///
    /// Implementations must distinguish transient failures (network,
    /// timeout, 5xx, rate limiting) from content failures via
    /// [`LlmError::is_transient`]; only transient failures feed the circuit
    /// breaker.
    async fn generate(&self, prompt: &str, tier: ModelTier) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat-completions client.
///
/// Carries one model name per tier so the router's tier decision maps
/// directly onto a backend model.
pub struct HttpLanguageModel {
    api_base: String,
    api_key: Option<String>,
    fast_model: String,
    advanced_model: String,
    http_client: Client,
}

impl HttpLanguageModel {
    /// Create a client with explicit configuration.
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        fast_model: String,
        advanced_model: String,
    ) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Transient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            api_key,
            fast_model,
            advanced_model,
            http_client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// Reads:
    /// - `QUIZFORGE_API_BASE` (required)
    /// - `QUIZFORGE_API_KEY` (optional)
    /// - `QUIZFORGE_FAST_MODEL` (default "gpt-4o-mini")
    /// - `QUIZFORGE_ADVANCED_MODEL` (default "gpt-4o")
    pub fn from_env() -> Result<Self, LlmError> {
        let api_base = env::var("QUIZFORGE_API_BASE").map_err(|_| LlmError::MissingApiBase)?;
        let api_key = env::var("QUIZFORGE_API_KEY").ok();
        let fast_model =
            env::var("QUIZFORGE_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let advanced_model =
            env::var("QUIZFORGE_ADVANCED_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

        Self::new(api_base, api_key, fast_model, advanced_model)
    }

    /// Model name serving the given tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Advanced => &self.advanced_model,
        }
    }
}

/// Internal request body for the chat-completions endpoint.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You are an educational content author. \
Respond with a single JSON object with keys \"question\", \"answer\" and \
\"explanation\". Output only the JSON object.";

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn generate(&self, prompt: &str, tier: ModelTier) -> Result<String, LlmError> {
        let model = self.model_for(tier);
        let body = ApiRequest {
            model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ApiMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let mut request = self.http_client.post(&url).json(&body);
        if let Some(ref api_key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited(message));
            }
            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedOutput(format!("bad response body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedOutput("response had no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_names() {
        assert_eq!(ModelTier::Fast.as_str(), "fast");
        assert_eq!(ModelTier::Advanced.as_str(), "advanced");
    }

    #[test]
    fn test_model_for_tier() {
        let client = HttpLanguageModel::new(
            "http://localhost:4000".to_string(),
            None,
            "small-model".to_string(),
            "big-model".to_string(),
        )
        .expect("client should build");

        assert_eq!(client.model_for(ModelTier::Fast), "small-model");
        assert_eq!(client.model_for(ModelTier::Advanced), "big-model");
    }

    #[tokio::test]
    async fn test_connection_error_is_transient() {
        // Port with nothing listening.
        let client = HttpLanguageModel::new(
            "http://127.0.0.1:65535".to_string(),
            None,
            "small-model".to_string(),
            "big-model".to_string(),
        )
        .expect("client should build");

        let result = client.generate("2 + 2", ModelTier::Fast).await;
        let err = result.expect_err("should fail with no server");
        assert!(err.is_transient());
    }

    #[test]
    fn test_api_request_serialization() {
        let body = ApiRequest {
            model: "small-model",
            messages: vec![ApiMessage {
                role: "user",
                content: "hello",
            }],
            temperature: 0.7,
        };

        let json = serde_json::to_string(&body).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"small-model\""));
        assert!(json.contains("\"temperature\":0.7"));
    }
}
