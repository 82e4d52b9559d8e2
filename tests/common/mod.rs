use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kitchen_ai::api_connection::{ApiConnectionError, TextGenerator};
use kitchen_ai::pipeline::{AiPipeline, PipelineConfig, RetryPolicy};
use reqwest::StatusCode;

pub enum Reply {
    Text(&'static str),
    RateLimited,
    Unauthorized,
    /// Never answers within any reasonable timeout.
    Hang,
}

/// In-process stand-in for the hosted model.
pub struct FakeModel {
    script: Mutex<VecDeque<Reply>>,
    calls: AtomicU32,
}

impl FakeModel {
    pub fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeModel {
    async fn generate(&self, _prompt: &str) -> Result<String, ApiConnectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text.to_string()),
            Some(Reply::RateLimited) => Err(ApiConnectionError::ApiError {
                status: StatusCode::TOO_MANY_REQUESTS,
                error_body: "Too Many Requests".to_string(),
            }),
            Some(Reply::Unauthorized) => Err(ApiConnectionError::ApiError {
                status: StatusCode::UNAUTHORIZED,
                error_body: "No auth credentials found".to_string(),
            }),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("{}".to_string())
            }
            None => Ok(String::new()),
        }
    }
}

pub fn config(max_retries: u32) -> PipelineConfig {
    PipelineConfig {
        min_request_delay: Duration::from_millis(1000),
        retry: RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1000),
        },
        request_timeout: Some(Duration::from_secs(60)),
    }
}

pub fn pipeline(model: &Arc<FakeModel>, max_retries: u32) -> AiPipeline {
    AiPipeline::new(model.clone(), config(max_retries))
}
