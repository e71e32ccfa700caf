//! Run-scoped progress reporting with a non-decreasing percentage

use redspec_sdk::{Phase, ProgressEvent, ProgressSink, SinkResult};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Wraps the caller's optional sink for the duration of one run
///
/// The percentage only ever moves forward; every emitted event is stamped with
/// the current value so concurrently running agents cannot regress it.
pub struct ProgressReporter {
    sink: Option<Arc<dyn ProgressSink>>,
    percent: AtomicU8,
    /// `Phase::number()` of the phase most recently entered
    phase: AtomicU8,
}

impl ProgressReporter {
    pub fn new(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            sink,
            percent: AtomicU8::new(0),
            phase: AtomicU8::new(Phase::ContextGathering.number() as u8),
        }
    }

    pub fn silent() -> Self {
        Self::new(None)
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::SeqCst)
    }

    /// Move the run percentage to `to` unless it is already further along
    pub fn advance(&self, to: u8) -> u8 {
        let to = to.min(100);
        self.percent.fetch_max(to, Ordering::SeqCst).max(to)
    }

    /// Record `phase` as current and move to its start percentage
    pub fn enter_phase(&self, phase: Phase) {
        self.phase.store(phase.number() as u8, Ordering::SeqCst);
        self.advance(phase.start_percent());
    }

    pub fn phase(&self) -> Phase {
        let number = self.phase.load(Ordering::SeqCst) as usize;
        Phase::ALL
            .get(number.saturating_sub(1))
            .copied()
            .unwrap_or(Phase::ContextGathering)
    }

    pub async fn emit(&self, mut event: ProgressEvent) -> SinkResult {
        event.percent = self.advance(event.percent);
        match &self.sink {
            Some(sink) => sink.send(event).await,
            None => Ok(()),
        }
    }
}
