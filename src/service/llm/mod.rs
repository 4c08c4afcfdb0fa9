pub mod gemini;

use crate::base::types::Res;
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

// Errors.

/// Failures of the model call that the pipeline must tell apart.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The prompt or the answer was blocked by the provider's safety filters.
    #[error("blocked by content safety filters: {reason}")]
    Blocked { reason: String },
    /// The provider answered with an error.
    #[error("LLM API error {status}: {message}")]
    Api { status: u16, message: String },
    /// The provider answered, but without any text.
    #[error("LLM response contained no text")]
    EmptyResponse,
}

impl LlmError {
    /// Returns `true` if `err` is (or wraps) a content-safety block.
    pub fn is_blocked(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<LlmError>(), Some(LlmError::Blocked { .. }))
    }
}

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the core functionality for interacting with large language models.
/// Implementing this trait allows different LLM providers to be used with the calendar-bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Send a single prompt and return the model's raw text answer.
    ///
    /// One request, one response: no streaming, no conversation state, no retries.
    /// A content-safety refusal is reported as [`LlmError::Blocked`].
    async fn generate(&self, prompt: &str) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
