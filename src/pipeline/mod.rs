//! Resilient call-and-parse pipeline around the hosted model.
//!
//! prompt -> [`RateLimiter`] (pacing + backoff) -> [`TextGenerator`] ->
//! [`safe_json_parse`] -> caller-side [`coerce`] into a typed shape.

pub mod coerce;
pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod pacing;
pub mod queue;
pub mod rate_limiter;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api_connection::{ApiConnectionError, OpenRouterClient, TextGenerator};
use crate::settings::Settings;

pub use coerce::coerce;
pub use error::PipelineError;
pub use extractor::{safe_json_parse, ModelOutput};
pub use normalizer::clean_json_string;
pub use pacing::Pacer;
pub use queue::RequestQueue;
pub use rate_limiter::{RateLimiter, RetryClassify, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub min_request_delay: Duration,
    pub retry: RetryPolicy,
    pub request_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_request_delay: Duration::from_millis(1000),
            retry: RetryPolicy::default(),
            request_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl From<&Settings> for PipelineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            min_request_delay: settings.min_request_delay,
            retry: RetryPolicy {
                max_retries: settings.max_retries,
                initial_backoff: settings.initial_backoff,
            },
            request_timeout: settings.request_timeout,
        }
    }
}

/// Shared entry point for every caller that talks to the model.
///
/// Build one per process and hand out clones; clones share the same pacing
/// state and queue.
#[derive(Clone)]
pub struct AiPipeline {
    generator: Arc<dyn TextGenerator>,
    limiter: Arc<RateLimiter>,
    queue: Arc<RequestQueue>,
    request_timeout: Option<Duration>,
}

impl AiPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, config: PipelineConfig) -> Self {
        Self {
            generator,
            limiter: Arc::new(RateLimiter::new(config.min_request_delay, config.retry)),
            queue: Arc::new(RequestQueue::new(config.min_request_delay)),
            request_timeout: config.request_timeout,
        }
    }

    /// OpenRouter-backed pipeline configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        tracing::info!(model = %settings.model, "initialising AI pipeline");
        Self::new(
            Arc::new(OpenRouterClient::from_settings(settings)),
            PipelineConfig::from(settings),
        )
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Paced, retried call returning the raw model text.
    pub async fn generate_content(&self, prompt: &str) -> Result<String, PipelineError> {
        let result = self.limiter.execute(|| self.attempt(prompt)).await;
        result.map_err(|err| self.classify(err))
    }

    /// Same as [`Self::generate_content`], but admitted through the serial
    /// request queue first.
    pub async fn generate_content_queued(&self, prompt: &str) -> Result<String, PipelineError> {
        self.queue
            .enqueue(|| self.generate_content(prompt))
            .await
    }

    pub async fn generate_json(&self, prompt: &str) -> Result<Value, PipelineError> {
        let text = self.generate_content(prompt).await?;
        safe_json_parse(text)
    }

    pub async fn generate_json_queued(&self, prompt: &str) -> Result<Value, PipelineError> {
        let text = self.generate_content_queued(prompt).await?;
        safe_json_parse(text)
    }

    /// Generates, extracts and coerces into `T`, defaulting any field the
    /// model left out or mistyped.
    pub async fn generate_as<T>(&self, prompt: &str) -> Result<T, PipelineError>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        self.generate_json(prompt).await.map(coerce)
    }

    pub async fn generate_as_queued<T>(&self, prompt: &str) -> Result<T, PipelineError>
    where
        T: DeserializeOwned + Serialize + Default,
    {
        self.generate_json_queued(prompt).await.map(coerce)
    }

    async fn attempt(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let call = self.generator.generate(prompt);
        let text = match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ApiConnectionError::Timeout(limit))??,
            None => call.await?,
        };

        if text.trim().is_empty() {
            return Err(ApiConnectionError::EmptyResponse);
        }
        Ok(text)
    }

    fn classify(&self, err: ApiConnectionError) -> PipelineError {
        let attempts = if err.is_rate_limited() {
            self.limiter.policy().max_attempts()
        } else {
            1
        };
        tracing::warn!(error = %err, "AI generation failed");
        PipelineError::from_provider(err, attempts)
    }
}
