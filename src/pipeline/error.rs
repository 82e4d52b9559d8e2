use std::time::Duration;

use thiserror::Error;

use crate::api_connection::ApiConnectionError;

/// Failures surfaced by the generation pipeline.
///
/// The pipeline never substitutes a default on failure; callers decide
/// whether to fall back or re-raise.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Still rate limited after the retry budget was spent.
    #[error("provider rate limit persisted after {attempts} attempts: {source}")]
    RateLimited {
        attempts: u32,
        #[source]
        source: ApiConnectionError,
    },
    #[error("provider call failed: {0}")]
    Provider(#[source] ApiConnectionError),
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    #[error("provider returned no usable text content")]
    EmptyResponse,
    /// No JSON value could be recovered; `raw` is the untouched model text.
    #[error("no valid JSON could be extracted from the model response")]
    MalformedResponse { raw: String },
}

impl PipelineError {
    /// Classifies an error that escaped the backoff wrapper.
    pub(crate) fn from_provider(err: ApiConnectionError, attempts: u32) -> Self {
        match err {
            ApiConnectionError::EmptyResponse => PipelineError::EmptyResponse,
            ApiConnectionError::Timeout(after) => PipelineError::Timeout(after),
            err if err.is_rate_limited() => PipelineError::RateLimited {
                attempts,
                source: err,
            },
            err => PipelineError::Provider(err),
        }
    }

    /// The raw model text for malformed responses.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PipelineError::MalformedResponse { raw } => Some(raw),
            _ => None,
        }
    }
}
