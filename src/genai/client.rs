//! GeminiClient - handles communication with the Gemini API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::generator::ScriptGenerator;
use super::prompt::{generation_prompt, script_response_schema, translation_prompt};
use super::retry::{is_transient_network_error, parse_retry_after, RetryPolicy};
use crate::script::{Language, Script};

/// The environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for script generation.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default timeout for a whole request (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
const HTTP_STATUS_BAD_REQUEST: u16 = 400;
const HTTP_STATUS_FORBIDDEN: u16 = 403;

/// Keywords that indicate a safety or content policy rejection in error bodies.
const CONTENT_POLICY_KEYWORDS: &[&str] = &[
    "safety",
    "content policy",
    "policy violation",
    "blocked",
    "prohibited",
];

fn is_content_policy_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    CONTENT_POLICY_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Validate a topic before sending it to the API.
pub fn validate_topic(topic: &str) -> Result<(), GenError> {
    if topic.trim().is_empty() {
        return Err(GenError::EmptyTopic);
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn for_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: script_response_schema(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Extract the script from the first candidate.
    fn into_script(self) -> Result<Script, GenError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenError::ContentBlocked { reason });
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenError::MalformedResponse("response has no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            if let Some(reason) = candidate.finish_reason.filter(|r| r == "SAFETY") {
                return Err(GenError::ContentBlocked { reason });
            }
            return Err(GenError::MalformedResponse(
                "candidate has no text".to_string(),
            ));
        }

        parse_script_text(&text)
    }
}

/// Parse model output into a script, tolerating a Markdown code fence.
fn parse_script_text(text: &str) -> Result<Script, GenError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let script: Script = serde_json::from_str(body.trim())
        .map_err(|e| GenError::MalformedResponse(format!("invalid script JSON: {}", e)))?;

    if script.dialogue.is_empty() {
        return Err(GenError::MalformedResponse(
            "script has no dialogue".to_string(),
        ));
    }

    Ok(script)
}

/// Client for communicating with the Gemini API.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new GeminiClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, GenError> {
        Self::build(api_key, GEMINI_API_BASE_URL.to_string(), DEFAULT_TIMEOUT)
    }

    /// Create a new GeminiClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GenError> {
        Self::build(api_key, base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with every connection setting spelled out.
    pub fn build(api_key: String, base_url: String, timeout: Duration) -> Result<Self, GenError> {
        if api_key.trim().is_empty() {
            return Err(GenError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
            http_client,
        })
    }

    /// Use a different model.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Use a different retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// URL of the `generateContent` endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Generate a new script about `topic` written in `language`.
    ///
    /// # Errors
    ///
    /// Returns `GenError::EmptyTopic` without contacting the API if the topic
    /// is blank, otherwise any error from [`GeminiClient::generate_content`].
    pub async fn generate_script(&self, topic: &str, language: Language) -> Result<Script, GenError> {
        validate_topic(topic)?;
        log::debug!("Generating {} script for topic {:?}", language, topic.trim());
        self.generate_content(generation_prompt(topic, language)).await
    }

    /// Translate `script` into `target`.
    pub async fn translate_script(&self, script: &Script, target: Language) -> Result<Script, GenError> {
        let prompt = translation_prompt(script, target)
            .map_err(|e| GenError::MalformedResponse(format!("cannot encode script: {}", e)))?;
        log::debug!("Translating {:?} into {}", script.title, target);
        self.generate_content(prompt).await
    }

    /// Send a prompt and parse the answer as a script, retrying transient
    /// network failures and rate limits per the client's retry policy.
    ///
    /// # Errors
    ///
    /// Returns `GenError::NetworkError` once network retries are exhausted,
    /// `GenError::RateLimit` once rate-limit retries are exhausted, and any
    /// other error from a single attempt unchanged.
    pub async fn generate_content(&self, prompt: String) -> Result<Script, GenError> {
        let request = GenerateContentRequest::for_prompt(prompt);
        let policy = self.retry;
        let mut network_attempt = 0u32;
        let mut rate_limit_attempt = 0u32;

        loop {
            match self.send_once(&request).await {
                Ok(script) => return Ok(script),

                Err(GenError::HttpError(ref http_err)) if is_transient_network_error(http_err) => {
                    network_attempt += 1;

                    if network_attempt > policy.network_retries {
                        log::error!(
                            "Network error after {} attempts. Giving up. Error: {}",
                            network_attempt,
                            http_err
                        );
                        return Err(GenError::NetworkError {
                            message: http_err.to_string(),
                            attempts: network_attempt,
                        });
                    }

                    let delay = policy.delay_for(network_attempt - 1, None);
                    log::warn!(
                        "Network error (attempt {}/{}): {}. Retrying in {:?}...",
                        network_attempt,
                        policy.network_retries + 1,
                        http_err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }

                Err(GenError::RateLimit {
                    message,
                    retry_after_secs,
                }) => {
                    rate_limit_attempt += 1;

                    if rate_limit_attempt > policy.rate_limit_retries {
                        log::error!(
                            "Rate limit exceeded after {} attempts. Giving up.",
                            rate_limit_attempt
                        );
                        return Err(GenError::RateLimit {
                            message,
                            retry_after_secs,
                        });
                    }

                    let delay = policy.delay_for(rate_limit_attempt - 1, retry_after_secs);
                    log::info!(
                        "Rate limited (attempt {}/{}). Retrying in {:?}...",
                        rate_limit_attempt,
                        policy.rate_limit_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }

                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: &GenerateContentRequest) -> Result<Script, GenError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == HTTP_STATUS_TOO_MANY_REQUESTS {
                let retry_after_secs = parse_retry_after(response.headers());
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Rate limit exceeded".to_string());
                log::warn!(
                    "Rate limited by Gemini API. Retry-After: {:?} seconds",
                    retry_after_secs
                );
                return Err(GenError::RateLimit {
                    message: error_text,
                    retry_after_secs,
                });
            }

            // Gateway errors surface as reqwest errors so the retry loop sees them as transient.
            if let Err(e) = response.error_for_status_ref() {
                if is_transient_network_error(&e) {
                    return Err(GenError::HttpError(e));
                }
            }

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if (status.as_u16() == HTTP_STATUS_BAD_REQUEST
                || status.as_u16() == HTTP_STATUS_FORBIDDEN)
                && is_content_policy_error(&error_text)
            {
                log::warn!("Request rejected by content policy: {}", error_text);
                return Err(GenError::ContentBlocked { reason: error_text });
            }

            return Err(GenError::ApiError(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        body.into_script()
    }
}

#[async_trait]
impl ScriptGenerator for GeminiClient {
    async fn generate(&self, topic: &str, language: Language) -> Result<Script, GenError> {
        self.generate_script(topic, language).await
    }

    async fn translate(&self, script: &Script, target: Language) -> Result<Script, GenError> {
        self.translate_script(script, target).await
    }
}

/// Errors that can occur when talking to the Gemini API.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited: {message}")]
    RateLimit {
        /// Response body returned with the 429
        message: String,
        /// Retry-After header value in seconds, if provided
        retry_after_secs: Option<u64>,
    },

    #[error("Network error: {message} (after {attempts} attempts)")]
    NetworkError {
        message: String,
        /// Number of attempts made before giving up
        attempts: u32,
    },

    #[error("Content blocked: {reason}")]
    ContentBlocked { reason: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Empty topic")]
    EmptyTopic,
}
