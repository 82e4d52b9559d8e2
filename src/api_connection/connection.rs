use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use super::endpoints::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use super::generator::TextGenerator;
use crate::pipeline::rate_limiter::RetryClassify;
use crate::settings::{Settings, API_KEY_ENV_VAR};

/// Markers providers put in error bodies when a quota or rate window is spent.
const EXHAUSTION_MARKERS: &[&str] = &[
    "resource_exhausted",
    "resource exhausted",
    "resource has been exhausted",
    "too many requests",
    "rate limit",
    "quota",
];

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: StatusCode,
        error_body: String,
    },
    #[error("API returned no usable text content")]
    EmptyResponse,
    #[error("API call timed out after {0:?}")]
    Timeout(Duration),
}

impl ApiConnectionError {
    /// True for "too many requests" statuses and resource-exhaustion messages.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ApiConnectionError::ApiError { status, error_body } => {
                *status == StatusCode::TOO_MANY_REQUESTS || mentions_exhaustion(error_body)
            }
            ApiConnectionError::NetworkError(err) => {
                err.status() == Some(StatusCode::TOO_MANY_REQUESTS)
                    || mentions_exhaustion(&err.to_string())
            }
            _ => false,
        }
    }
}

impl RetryClassify for ApiConnectionError {
    fn is_rate_limited(&self) -> bool {
        ApiConnectionError::is_rate_limited(self)
    }
}

fn mentions_exhaustion(message: &str) -> bool {
    let lowered = message.to_lowercase();
    EXHAUSTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// OpenRouter chat-completions client. One instance is shared by every caller.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    url: String,
    model: String,
    provider_only: Vec<String>,
    site_url: String,
    app_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterClient {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone(),
            url: settings.api_url.clone(),
            model: settings.model.clone(),
            provider_only: settings.provider_only.clone(),
            site_url: settings.site_url.clone(),
            app_name: settings.app_name.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn call_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ApiConnectionError::MissingApiKey(API_KEY_ENV_VAR.to_string()))?;

        let mut request_payload = serde_json::to_value(&request)?;
        if !self.provider_only.is_empty() {
            if let Some(obj) = request_payload.as_object_mut() {
                obj.insert(
                    "provider".to_string(),
                    json!({ "only": self.provider_only }),
                );
            }
        }

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.app_name)
            .json(&request_payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json::<ChatCompletionResponse>().await?)
        } else {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            tracing::warn!(%status, model = %self.model, "chat completion rejected");
            Err(ApiConnectionError::ApiError { status, error_body })
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            response_format: None,
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        let response = self.call_chat_completion(request).await?;
        match response.first_content() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(ApiConnectionError::EmptyResponse),
        }
    }
}
