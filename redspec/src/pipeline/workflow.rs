//! Workflow orchestration for the spec pipeline
//!
//! This module drives the five phases in order, builds each agent's prompt from
//! what earlier agents produced, records per-agent failures without stopping
//! the run, and extracts the two derived scalars.
//!
//! The primary entry point is [`Orchestrator::run`]. It never returns an error:
//! everything that goes wrong during a run ends up in
//! [`WorkflowResult::errors`].
//!
//! Failure policy:
//!
//! - Any agent other than the PRD generator may fail; its field stays unset and
//!   the run continues.
//! - If the PRD generator fails, phases 3-5 are not run.
//! - If the PRD phase is skipped there is no PRD, so phases 3-5 do not run
//!   either.
//! - The run timeout is a deadline shared by every agent. The agent running
//!   when it passes fails with a run timeout, and so does every agent after it,
//!   without being dispatched. The rules above still apply, so a PRD caught by
//!   the deadline ends the run.
//! - A progress-sink failure outside an agent, or a panic, is recorded as an
//!   `Orchestrator error` and the partial result is returned.

use anyhow::{Context, Result};
use futures::FutureExt;
use redspec_sdk::{Phase, ProgressEvent, ProgressSink, ORCHESTRATOR};
use serde_json::json;
use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::backend::{AgentBackend, AnthropicBackend};
use crate::pipeline::extract::{self, ScalarExtractor};
use crate::pipeline::persist::{persist, PersistedRun};
use crate::pipeline::prompts;
use crate::pipeline::types::{RunRequest, WorkflowResult};
use crate::registry::AgentRegistry;
use crate::roles::{AgentKey, RoleSet};
use crate::settings::Settings;
use crate::tools::ToolRegistry;
use crate::workflow_utils::agent::panic_message;
use crate::workflow_utils::{AgentInvoker, InvocationError, ProgressReporter, RunDeadline};

/// Label used for run-level failures in the error list
pub const ORCHESTRATOR_LABEL: &str = "Orchestrator";

/// Configuration for the orchestrator
///
/// # Examples
///
/// ```
/// use redspec::pipeline::OrchestratorConfig;
/// use redspec_sdk::Phase;
/// use std::time::Duration;
///
/// let config = OrchestratorConfig {
///     agent_timeout: Some(Duration::from_secs(300)),
///     parallel_independent_agents: true,
///     skip_phases: [Phase::DesignTracking].into_iter().collect(),
///     ..Default::default()
/// };
/// assert!(config.run_timeout.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Limit on a single agent invocation; expiry is that agent's failure
    pub agent_timeout: Option<Duration>,
    /// Limit on the whole run; expiry fails the agents still to finish
    pub run_timeout: Option<Duration>,
    /// Run the two Design & Tracking agents concurrently
    pub parallel_independent_agents: bool,
    /// Phases skipped on every run
    pub skip_phases: BTreeSet<Phase>,
}

/// Run-level failure outside any agent's fallible block
#[derive(Debug, Error)]
enum RunFailure {
    #[error("progress sink failed: {0}")]
    Progress(#[source] Box<dyn StdError + Send + Sync>),

    #[error("panicked: {0}")]
    Panic(String),
}

/// How the phase loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Completed,
    PrdFailed,
}

pub struct Orchestrator {
    invoker: AgentInvoker,
    config: OrchestratorConfig,
    story_points: Arc<dyn ScalarExtractor>,
    validation_score: Arc<dyn ScalarExtractor>,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, backend: Arc<dyn AgentBackend>, config: OrchestratorConfig) -> Self {
        let invoker = AgentInvoker::new(registry, backend).with_agent_timeout(config.agent_timeout);
        Self {
            invoker,
            config,
            story_points: Arc::new(extract::story_point_total()),
            validation_score: Arc::new(extract::validation_score()),
        }
    }

    /// Orchestrator wired to the Anthropic backend and the stock tools
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let roles = RoleSet::load(settings.roles_file.as_deref()).await?;
        let tools = ToolRegistry::with_defaults(settings);
        let registry = AgentRegistry::new(roles, &tools).context("Invalid agent registry")?;
        let backend = AnthropicBackend::from_settings(settings).context("Cannot create agent backend")?;
        Ok(Self::new(
            Arc::new(registry),
            Arc::new(backend),
            settings.orchestrator_config(),
        ))
    }

    /// Replace the story-point and validation-score extractors
    pub fn with_extractors(
        mut self,
        story_points: Arc<dyn ScalarExtractor>,
        validation_score: Arc<dyn ScalarExtractor>,
    ) -> Self {
        self.story_points = story_points;
        self.validation_score = validation_score;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run the pipeline for one product idea
    ///
    /// `skip` is merged with the configured skip set. The returned result is
    /// complete even when the run failed part-way; check `errors`.
    pub async fn run(
        &self,
        product_idea: &str,
        repo_url: Option<&str>,
        sink: Option<Arc<dyn ProgressSink>>,
        skip: &BTreeSet<Phase>,
    ) -> WorkflowResult {
        let mut result = WorkflowResult::new(product_idea, repo_url.map(String::from));
        let skip: BTreeSet<Phase> = self.config.skip_phases.union(skip).copied().collect();
        let progress = ProgressReporter::new(sink);

        tracing::info!(
            idea_len = product_idea.len(),
            repo = repo_url.unwrap_or("-"),
            skipped = ?skip,
            "starting run"
        );

        let deadline = self.config.run_timeout.map(RunDeadline::after);
        let outcome = AssertUnwindSafe(self.run_phases(&mut result, &skip, &progress, deadline))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RunFailure::Panic(panic_message(panic.as_ref()))));

        match outcome {
            Ok(outcome) => {
                let phase = match outcome {
                    Outcome::Completed => Phase::ValidationIntegration,
                    Outcome::PrdFailed => Phase::PrdGeneration,
                };
                let message = match outcome {
                    Outcome::Completed => "Workflow completed",
                    Outcome::PrdFailed => "Workflow stopped: PRD generation failed",
                };
                let event = ProgressEvent::completed(ORCHESTRATOR, phase, message, 100).with_payload(json!({
                    "total_story_points": result.total_story_points,
                    "validation_score": result.validation_score,
                    "errors_count": result.errors.len(),
                }));
                if let Err(e) = progress.emit(event).await {
                    record_failure(&mut result, &RunFailure::Progress(e));
                }
            }
            Err(failure) => {
                record_failure(&mut result, &failure);
                let event = ProgressEvent::error(
                    ORCHESTRATOR,
                    progress.phase(),
                    format!("Workflow failed: {}", failure),
                    100,
                );
                if let Err(e) = progress.emit(event).await {
                    tracing::warn!(error = %e, "could not report orchestrator failure");
                }
            }
        }

        tracing::info!(
            errors = result.errors.len(),
            story_points = ?result.total_story_points,
            score = ?result.validation_score,
            "run finished"
        );
        result
    }

    /// [`Orchestrator::run`] with inputs in struct form
    pub async fn run_request(&self, request: RunRequest, sink: Option<Arc<dyn ProgressSink>>) -> WorkflowResult {
        self.run(
            &request.product_idea,
            request.repo_url.as_deref(),
            sink,
            &request.skip_phases,
        )
        .await
    }

    async fn run_phases(
        &self,
        result: &mut WorkflowResult,
        skip: &BTreeSet<Phase>,
        progress: &ProgressReporter,
        deadline: Option<RunDeadline>,
    ) -> Result<Outcome, RunFailure> {
        // Phase 1: context, codebase (only with a repo), release history
        if self.begin(Phase::ContextGathering, skip, progress).await? {
            self.step(AgentKey::Context, prompts::context(), result, progress, deadline).await;
            if let Some(repo) = result.repo_url.clone() {
                self.step(AgentKey::Codebase, prompts::codebase(&repo), result, progress, deadline)
                    .await;
            }
            let prompt = prompts::release_notes(&result.product_idea);
            self.step(AgentKey::ReleaseNotes, prompt, result, progress, deadline).await;
        }

        // Phase 2: PRD, the one hard dependency
        if self.begin(Phase::PrdGeneration, skip, progress).await? {
            let prompt = prompts::prd(
                &result.product_idea,
                result.company_context.as_deref(),
                result.release_history.as_deref(),
            );
            if !self.step(AgentKey::Prd, prompt, result, progress, deadline).await {
                return Ok(Outcome::PrdFailed);
            }
        }

        let Some(prd) = result.prd.clone() else {
            tracing::info!("no PRD available, downstream phases not run");
            return Ok(Outcome::Completed);
        };

        // Phase 3: code impact, then story points
        if self.begin(Phase::TechnicalAnalysis, skip, progress).await? {
            let prompt = prompts::code_impact(&prd, result.codebase_info.as_deref());
            self.step(AgentKey::CodeImpact, prompt, result, progress, deadline).await;

            let prompt = prompts::story_points(&prd, result.code_impact.as_deref());
            if self.step(AgentKey::StoryPoints, prompt, result, progress, deadline).await {
                result.total_story_points = result
                    .story_points
                    .as_deref()
                    .and_then(|text| self.story_points.extract(text));
            }
        }

        // Phase 4: design and analytics, independent of each other
        if self.begin(Phase::DesignTracking, skip, progress).await? {
            let design = prompts::design(&prd);
            let analytics = prompts::analytics(&prd);
            if self.config.parallel_independent_agents {
                let (design_out, analytics_out) = futures::join!(
                    self.invoker.invoke_until(AgentKey::Design, &design, progress, deadline),
                    self.invoker.invoke_until(AgentKey::Analytics, &analytics, progress, deadline),
                );
                record(AgentKey::Design, design_out, result);
                record(AgentKey::Analytics, analytics_out, result);
            } else {
                self.step(AgentKey::Design, design, result, progress, deadline).await;
                self.step(AgentKey::Analytics, analytics, result, progress, deadline).await;
            }
        }

        // Phase 5: validation, then tickets
        if self.begin(Phase::ValidationIntegration, skip, progress).await? {
            if self.step(AgentKey::Validator, prompts::validator(&prd), result, progress, deadline).await {
                result.validation_score = result
                    .prd_validation
                    .as_deref()
                    .and_then(|text| self.validation_score.extract(text));
            }

            let prompt = prompts::jira(
                &prd,
                result.story_points.as_deref(),
                result.code_impact.as_deref(),
            );
            self.step(AgentKey::Jira, prompt, result, progress, deadline).await;
        }

        Ok(Outcome::Completed)
    }

    /// Announce `phase`, or report that it is skipped
    async fn begin(&self, phase: Phase, skip: &BTreeSet<Phase>, progress: &ProgressReporter) -> Result<bool, RunFailure> {
        if skip.contains(&phase) {
            tracing::info!(%phase, "phase skipped");
            return Ok(false);
        }

        progress.enter_phase(phase);
        progress
            .emit(ProgressEvent::running(
                ORCHESTRATOR,
                phase,
                phase_message(phase),
                phase.start_percent(),
            ))
            .await
            .map_err(RunFailure::Progress)?;
        Ok(true)
    }

    /// Invoke one agent and record the outcome; true on success
    async fn step(
        &self,
        key: AgentKey,
        prompt: String,
        result: &mut WorkflowResult,
        progress: &ProgressReporter,
        deadline: Option<RunDeadline>,
    ) -> bool {
        let outcome = self.invoker.invoke_until(key, &prompt, progress, deadline).await;
        record(key, outcome, result)
    }
}

fn record(key: AgentKey, outcome: Result<String, InvocationError>, result: &mut WorkflowResult) -> bool {
    match outcome {
        Ok(text) => {
            result.set_output(key, text);
            true
        }
        Err(e) => {
            result
                .errors
                .push(format!("{} error: {}", key.error_label(), e.cause));
            false
        }
    }
}

fn record_failure(result: &mut WorkflowResult, failure: &RunFailure) {
    tracing::error!(error = %failure, "run failed");
    result
        .errors
        .push(format!("{} error: {}", ORCHESTRATOR_LABEL, failure));
}

fn phase_message(phase: Phase) -> &'static str {
    match phase {
        Phase::ContextGathering => "Phase 1: Gathering company context, codebase, and release history...",
        Phase::PrdGeneration => "Phase 2: Generating PRD...",
        Phase::TechnicalAnalysis => "Phase 3: Analyzing code impact and calculating story points...",
        Phase::DesignTracking => "Phase 4: Generating designs and analytics plan...",
        Phase::ValidationIntegration => "Phase 5: Validating PRD and creating JIRA tickets...",
    }
}

/// Result of [`generate_spec`]
#[derive(Debug, Clone)]
pub struct GeneratedSpec {
    pub result: WorkflowResult,
    pub artifacts: PersistedRun,
}

/// Run the pipeline with settings from the environment and persist the result
///
/// Progress goes nowhere; use [`Orchestrator::run`] directly to observe it.
pub async fn generate_spec(product_idea: &str, repo_url: Option<&str>, output_dir: &Path) -> Result<GeneratedSpec> {
    let settings = Settings::from_env().context("Invalid settings")?;
    let orchestrator = Orchestrator::from_settings(&settings).await?;
    let result = orchestrator
        .run(product_idea, repo_url, None, &BTreeSet::new())
        .await;
    let artifacts = persist(&result, output_dir).await?;
    Ok(GeneratedSpec { result, artifacts })
}

/// Blocking wrapper around [`generate_spec`] for synchronous callers
pub fn generate_spec_blocking(product_idea: &str, repo_url: Option<&str>, output_dir: impl Into<PathBuf>) -> Result<GeneratedSpec> {
    let output_dir = output_dir.into();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(generate_spec(product_idea, repo_url, &output_dir))
}
