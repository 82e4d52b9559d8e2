//! Prompt builders and result shapes for each kitchen feature.
//!
//! Every service builds a prompt that embeds its request as JSON, sends it
//! through the shared [`crate::pipeline::AiPipeline`], and coerces the reply
//! into a typed struct whose fields all have defaults.

pub mod cuisine;
pub mod equipment;
pub mod meal_plan;
pub mod recipes;

use serde::Serialize;

/// Pretty JSON for embedding domain data in a prompt.
pub(crate) fn embed_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::api_connection::{ApiConnectionError, TextGenerator};
    use crate::pipeline::{AiPipeline, PipelineConfig, RetryPolicy};

    /// Replays canned replies in order and records every prompt it saw.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, ApiConnectionError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn replying(replies: Vec<Result<String, ApiConnectionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, ApiConnectionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ApiConnectionError::EmptyResponse))
        }
    }

    pub fn pipeline(generator: Arc<ScriptedGenerator>) -> AiPipeline {
        AiPipeline::new(
            generator,
            PipelineConfig {
                min_request_delay: Duration::ZERO,
                retry: RetryPolicy {
                    max_retries: 1,
                    initial_backoff: Duration::ZERO,
                },
                request_timeout: None,
            },
        )
    }
}
