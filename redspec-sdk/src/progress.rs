//! Progress events and the sinks that receive them

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::Phase;

/// Agent name used for run-level events
pub const ORCHESTRATOR: &str = "orchestrator";

/// Prefix of machine-readable event lines written by [`EventLineSink`]
pub const EVENT_LINE_PREFIX: &str = "__REDSPEC_EVENT__:";

/// Result type returned by sinks
pub type SinkResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// State transition being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Started,
    Running,
    Completed,
    Error,
}

/// A single progress update emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Registry key of the agent, or [`ORCHESTRATOR`]
    pub agent: String,
    pub phase: Phase,
    pub status: ProgressStatus,
    pub message: String,
    /// Run completion, 0-100, non-decreasing within a run
    pub percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ProgressEvent {
    pub fn new(
        agent: impl Into<String>,
        phase: Phase,
        status: ProgressStatus,
        message: impl Into<String>,
        percent: u8,
    ) -> Self {
        Self {
            agent: agent.into(),
            phase,
            status,
            message: message.into(),
            percent: percent.min(100),
            payload: None,
        }
    }

    pub fn started(agent: impl Into<String>, phase: Phase, message: impl Into<String>, percent: u8) -> Self {
        Self::new(agent, phase, ProgressStatus::Started, message, percent)
    }

    pub fn running(agent: impl Into<String>, phase: Phase, message: impl Into<String>, percent: u8) -> Self {
        Self::new(agent, phase, ProgressStatus::Running, message, percent)
    }

    pub fn completed(agent: impl Into<String>, phase: Phase, message: impl Into<String>, percent: u8) -> Self {
        Self::new(agent, phase, ProgressStatus::Completed, message, percent)
    }

    pub fn error(agent: impl Into<String>, phase: Phase, message: impl Into<String>, percent: u8) -> Self {
        Self::new(agent, phase, ProgressStatus::Error, message, percent)
    }

    /// Attach a structured payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// True for the two terminal agent statuses
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ProgressStatus::Completed | ProgressStatus::Error)
    }
}

/// Receiver of progress events
///
/// Sinks are called synchronously at each state transition, in order. A sink
/// error is reported back to the emitter, which decides whether it is fatal.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn send(&self, event: ProgressEvent) -> SinkResult;
}

#[async_trait]
impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    async fn send(&self, event: ProgressEvent) -> SinkResult {
        (**self).send(event).await
    }
}

/// Writes each event as a prefixed JSON line on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct EventLineSink;

#[async_trait]
impl ProgressSink for EventLineSink {
    async fn send(&self, event: ProgressEvent) -> SinkResult {
        let json = serde_json::to_string(&event)?;
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{}{}", EVENT_LINE_PREFIX, json)?;
        stderr.flush()?;
        Ok(())
    }
}

/// Forwards events into an unbounded channel
///
/// Fails once the receiving side has been dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn send(&self, event: ProgressEvent) -> SinkResult {
        self.tx
            .send(event)
            .map_err(|e| format!("progress receiver dropped: {}", e.0.agent))?;
        Ok(())
    }
}

/// Prints progress for a human watching the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

#[async_trait]
impl ProgressSink for ConsoleSink {
    async fn send(&self, event: ProgressEvent) -> SinkResult {
        match event.status {
            ProgressStatus::Running if event.agent == ORCHESTRATOR => {
                crate::log_phase_start_console!(event.phase.number(), event.phase.title(), &event.message);
            }
            ProgressStatus::Error => {
                crate::log_warning!("[{:>3}%] {}: {}", event.percent, event.agent, event.message);
            }
            _ => {
                crate::log_info!("[{:>3}%] {}: {}", event.percent, event.agent, event.message);
            }
        }
        Ok(())
    }
}

/// Forwards every event to each inner sink in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl ProgressSink for FanoutSink {
    async fn send(&self, event: ProgressEvent) -> SinkResult {
        for sink in &self.sinks {
            sink.send(event.clone()).await?;
        }
        Ok(())
    }
}
