//! LLM provider abstraction
//!
//! Replies are produced as a stream of text deltas; callers that want the
//! whole reply use [`collect_text`].

mod config;
mod error;
mod openai;
mod types;

pub use config::LlmConfig;
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Start a streaming completion
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmService + ?Sized> LlmService for Arc<T> {
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        (**self).stream(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Run a completion and concatenate its deltas.
///
/// A stream that yields only whitespace is reported as
/// [`LlmErrorKind::EmptyCompletion`].
pub async fn collect_text<L: LlmService + ?Sized>(
    llm: &L,
    request: &LlmRequest,
) -> Result<String, LlmError> {
    let mut stream = llm.stream(request).await?;
    let mut text = String::new();

    while let Some(delta) = stream.next().await {
        text.push_str(&delta?);
    }

    if text.trim().is_empty() {
        return Err(LlmError::empty_completion());
    }
    Ok(text)
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.stream(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    history_len = request.messages.len(),
                    "LLM stream opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    retryable = e.kind.is_retryable(),
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Stand-in used when no provider is configured; every request fails
pub struct Unconfigured;

#[async_trait]
impl LlmService for Unconfigured {
    async fn stream(&self, _request: &LlmRequest) -> Result<TextStream, LlmError> {
        Err(LlmError::auth("No LLM provider configured (set OPENAI_API_KEY or LLM_GATEWAY)"))
    }

    fn model_id(&self) -> &'static str {
        "unconfigured"
    }
}
