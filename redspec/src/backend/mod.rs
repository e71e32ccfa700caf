//! Text-generation backends agents run on

pub mod anthropic;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::roles::{AgentKey, AgentRole};
use crate::tools::Tool;

pub use anthropic::AnthropicBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("still requesting tools after {0} rounds")]
    ToolLoopExceeded(usize),

    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
}

/// One generation: the agent's role, its bound tools, and the prompt
pub struct GenerationRequest<'a> {
    pub agent: AgentKey,
    pub role: &'a AgentRole,
    pub tools: &'a [Arc<dyn Tool>],
    pub prompt: &'a str,
}

/// Produces the final text response for an agent
///
/// Implementations own any tool-use loop; callers only see the last response.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, BackendError>;
}

#[async_trait]
impl<B: AgentBackend + ?Sized> AgentBackend for Arc<B> {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, BackendError> {
        (**self).generate(request).await
    }
}
