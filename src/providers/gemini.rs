// Google Gemini API provider implementation
//
// Non-streaming `generateContent` only. History turns map onto Gemini's
// `contents` (roles "user" / "model"); the session context travels as
// `systemInstruction`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::{Candidate, ProviderRequest, ProviderResponse};
use super::LlmProvider;
use crate::config::constants::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini API provider
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_timeout(api_key, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create with an explicit HTTP timeout
    pub fn with_timeout(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Create with custom default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Point at a different API root (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_for<'a>(&'a self, request: &'a ProviderRequest) -> &'a str {
        if request.model.is_empty() {
            &self.default_model
        } else {
            &request.model
        }
    }

    /// Convert ProviderRequest to Gemini API format
    fn to_gemini_request(&self, request: &ProviderRequest) -> GeminiRequest {
        let contents = request
            .contents
            .iter()
            .map(|turn| GeminiContent {
                role: Some(turn.role.as_str().to_string()),
                parts: vec![GeminiPart::Text {
                    text: turn.text.clone(),
                }],
            })
            .collect();

        let system_instruction = request.system.as_ref().map(|system| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text {
                text: system.clone(),
            }],
        });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
            }),
        }
    }

    /// Convert Gemini response to ProviderResponse
    fn from_gemini_response(response: GeminiResponse, model: String) -> ProviderResponse {
        if response.candidates.is_empty() {
            if let Some(feedback) = &response.prompt_feedback {
                tracing::warn!(block_reason = ?feedback.block_reason, "Gemini returned no candidates");
            }
        }

        let candidates = response
            .candidates
            .into_iter()
            .map(|candidate| {
                let text = candidate
                    .content
                    .map(|content| {
                        content
                            .parts
                            .into_iter()
                            .filter_map(|part| match part {
                                GeminiPart::Text { text } => Some(text),
                                GeminiPart::Other(_) => None,
                            })
                            .collect::<String>()
                    })
                    .unwrap_or_default();

                Candidate {
                    text,
                    finish_reason: candidate.finish_reason,
                }
            })
            .collect();

        ProviderResponse {
            candidates,
            model,
            provider: "gemini".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let gemini_request = self.to_gemini_request(request);
        let model = self.model_for(request).to_string();

        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        tracing::debug!(
            model = %model,
            turns = gemini_request.contents.len(),
            max_output_tokens = request.max_tokens,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gemini API request failed (status {}): {}",
                status,
                api_error_message(&error_body)
            );
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        tracing::debug!(
            candidates = gemini_response.candidates.len(),
            "Received Gemini response"
        );

        Ok(Self::from_gemini_response(gemini_response, model))
    }

    async fn check_model(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.default_model);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("Failed to reach Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gemini model check for '{}' failed (status {}): {}",
                self.default_model,
                status,
                api_error_message(&error_body)
            );
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Pull `error.message` out of a Google API error body, else the raw body
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

// Gemini API types

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>, // "user" or "model"
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    // function calls, inline data, ...; never requested, ignored on the way in
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
}
