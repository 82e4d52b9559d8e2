use async_trait::async_trait;

use super::connection::ApiConnectionError;

/// "Generate content from a prompt string."
///
/// Any hosted model fits behind this seam; the pipeline only needs the text
/// of one completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ApiConnectionError>;
}
