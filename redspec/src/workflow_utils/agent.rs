//! Agent invocation: one prompt in, one final response out

use futures::FutureExt;
use redspec_sdk::ProgressEvent;
use serde_json::json;
use std::any::Any;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::progress::ProgressReporter;
use crate::backend::{AgentBackend, BackendError, GenerationRequest};
use crate::registry::AgentRegistry;
use crate::roles::AgentKey;

/// Why an invocation failed
#[derive(Debug, Error)]
pub enum InvocationCause {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The run's overall time limit ran out during or before this agent
    #[error("run timed out after {0:?}")]
    RunTimeout(Duration),

    #[error("progress sink failed: {0}")]
    Progress(#[source] Box<dyn StdError + Send + Sync>),

    #[error("agent is not registered")]
    Unregistered,
}

#[derive(Debug, Error)]
#[error("agent '{agent}' failed: {cause}")]
pub struct InvocationError {
    pub agent: AgentKey,
    #[source]
    pub cause: InvocationCause,
}

impl InvocationError {
    fn new(agent: AgentKey, cause: InvocationCause) -> Self {
        Self { agent, cause }
    }
}

/// Point in time by which a whole run must finish
#[derive(Debug, Clone, Copy)]
pub struct RunDeadline {
    at: tokio::time::Instant,
    limit: Duration,
}

impl RunDeadline {
    /// Deadline `limit` from now
    pub fn after(limit: Duration) -> Self {
        Self {
            at: tokio::time::Instant::now() + limit,
            limit,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(tokio::time::Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// Resolves agent keys and dispatches prompts to the backend
///
/// Emits `started` before each generation and exactly one of `completed` or
/// `error` after it, including when the backend panics. No retries.
#[derive(Clone)]
pub struct AgentInvoker {
    registry: Arc<AgentRegistry>,
    backend: Arc<dyn AgentBackend>,
    agent_timeout: Option<Duration>,
}

impl AgentInvoker {
    pub fn new(registry: Arc<AgentRegistry>, backend: Arc<dyn AgentBackend>) -> Self {
        Self {
            registry,
            backend,
            agent_timeout: None,
        }
    }

    pub fn with_agent_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub async fn invoke(
        &self,
        key: AgentKey,
        prompt: &str,
        progress: &ProgressReporter,
    ) -> Result<String, InvocationError> {
        self.invoke_until(key, prompt, progress, None).await
    }

    /// Invoke `key`, bounded by the agent timeout and by what is left of `deadline`
    ///
    /// An already expired deadline fails the agent without dispatching it and
    /// without emitting events.
    pub async fn invoke_until(
        &self,
        key: AgentKey,
        prompt: &str,
        progress: &ProgressReporter,
        deadline: Option<RunDeadline>,
    ) -> Result<String, InvocationError> {
        let fail = |cause| InvocationError::new(key, cause);
        let entry = self
            .registry
            .get(key)
            .ok_or_else(|| fail(InvocationCause::Unregistered))?;

        if let Some(deadline) = deadline.filter(RunDeadline::is_expired) {
            tracing::warn!(agent = %key, "run deadline passed, agent not dispatched");
            return Err(fail(InvocationCause::RunTimeout(deadline.limit())));
        }

        progress
            .emit(ProgressEvent::started(
                key.as_str(),
                entry.phase,
                format!("{} started", entry.role.name),
                progress.percent(),
            ))
            .await
            .map_err(|e| fail(InvocationCause::Progress(e)))?;

        tracing::info!(agent = %key, phase = %entry.phase, prompt_len = prompt.len(), "invoking agent");
        let started = Instant::now();

        let run_left = deadline.map(|d| d.remaining());
        let limit = [self.agent_timeout, run_left].into_iter().flatten().min();
        let timeout_cause = |limit: Duration| match deadline {
            Some(d) if run_left == Some(limit) => InvocationCause::RunTimeout(d.limit()),
            _ => InvocationCause::Timeout(limit),
        };

        let generation = AssertUnwindSafe(self.backend.generate(GenerationRequest {
            agent: key,
            role: &entry.role,
            tools: &entry.tools,
            prompt,
        }))
        .catch_unwind();
        let caught = match limit {
            Some(limit) => tokio::time::timeout(limit, generation)
                .await
                .map_err(|_| timeout_cause(limit)),
            None => Ok(generation.await),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let outcome = match caught {
            Ok(Ok(generated)) => generated.map_err(InvocationCause::from).and_then(|text| {
                if text.trim().is_empty() {
                    Err(BackendError::Malformed("empty response".to_string()).into())
                } else {
                    Ok(text)
                }
            }),
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(agent = %key, panic = %message, elapsed_ms, "agent panicked");
                let event = ProgressEvent::error(
                    key.as_str(),
                    entry.phase,
                    format!("{} panicked: {}", entry.role.name, message),
                    progress.percent(),
                );
                if let Err(e) = progress.emit(event).await {
                    tracing::warn!(agent = %key, error = %e, "could not report agent panic");
                }
                std::panic::resume_unwind(panic);
            }
            Err(cause) => Err(cause),
        };

        match outcome {
            Ok(text) => {
                tracing::info!(agent = %key, output_len = text.len(), elapsed_ms, "agent completed");
                progress
                    .emit(
                        ProgressEvent::completed(
                            key.as_str(),
                            entry.phase,
                            format!("{} completed", entry.role.name),
                            progress.percent(),
                        )
                        .with_payload(json!({ "output_length": text.len() })),
                    )
                    .await
                    .map_err(|e| fail(InvocationCause::Progress(e)))?;
                Ok(text)
            }
            Err(cause) => {
                tracing::warn!(agent = %key, error = %cause, elapsed_ms, "agent failed");
                let event = ProgressEvent::error(
                    key.as_str(),
                    entry.phase,
                    format!("{} failed: {}", entry.role.name, cause),
                    progress.percent(),
                );
                if let Err(e) = progress.emit(event).await {
                    tracing::warn!(agent = %key, error = %e, "could not report agent failure");
                }
                Err(fail(cause))
            }
        }
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
