//! Tests for timeouts, panics, sink failures, and parallel Design & Tracking

use super::common::*;
use redspec::{AgentKey, OrchestratorConfig};
use redspec_sdk::{Phase, ProgressSink, ProgressStatus};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_agent_timeout_fails_only_that_agent() {
    let backend = Arc::new(ScriptedBackend::new().with(
        AgentKey::CodeImpact,
        Script::Sleep(Duration::from_secs(600), "too late".to_string()),
    ));
    let config = OrchestratorConfig {
        agent_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let orchestrator = orchestrator(backend, config);

    let result = orchestrator.run(IDEA, None, None, &BTreeSet::new()).await;

    assert!(result.code_impact.is_none());
    assert_eq!(result.errors, vec!["Code impact analysis error: timed out after 30s".to_string()]);
    assert_eq!(result.total_story_points, Some(21));
    assert!(result.jira_tickets.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_prd_timeout_is_fatal() {
    let backend = Arc::new(ScriptedBackend::new().with(
        AgentKey::Prd,
        Script::Sleep(Duration::from_secs(600), "too late".to_string()),
    ));
    let config = OrchestratorConfig {
        agent_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let orchestrator = orchestrator(backend.clone(), config);

    let result = orchestrator.run(IDEA, None, None, &BTreeSet::new()).await;

    assert!(result.prd.is_none());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("PRD generation error: timed out"));
    assert_eq!(backend.count(AgentKey::CodeImpact), 0);
}

#[tokio::test(start_paused = true)]
async fn test_run_timeout_fails_remaining_agents() {
    let backend = Arc::new(ScriptedBackend::new().with(
        AgentKey::Design,
        Script::Sleep(Duration::from_secs(600), "too late".to_string()),
    ));
    let sink = Arc::new(RecordingSink::default());
    let config = OrchestratorConfig {
        run_timeout: Some(Duration::from_secs(60)),
        ..Default::default()
    };
    let orchestrator = orchestrator(backend.clone(), config);

    let result = orchestrator
        .run(IDEA, None, Some(sink.clone() as Arc<dyn ProgressSink>), &BTreeSet::new())
        .await;

    assert!(result.prd.is_some());
    assert!(result.story_points.is_some());
    assert!(result.design_specs.is_none());
    assert!(result.analytics_plan.is_none());
    assert!(result.jira_tickets.is_none());
    assert_eq!(
        result.errors,
        vec![
            "Design generation error: run timed out after 60s".to_string(),
            "Analytics planning error: run timed out after 60s".to_string(),
            "PRD validation error: run timed out after 60s".to_string(),
            "JIRA integration error: run timed out after 60s".to_string(),
        ]
    );
    assert_eq!(backend.count(AgentKey::Analytics), 0);

    assert_eq!(sink.statuses("design"), vec![ProgressStatus::Started, ProgressStatus::Error]);
    assert!(sink.statuses("analytics").is_empty());

    let last = sink.events().pop().unwrap();
    assert_eq!(last.agent, "orchestrator");
    assert_eq!(last.status, ProgressStatus::Completed);
    assert_eq!(last.phase, Phase::ValidationIntegration);
    assert_eq!(last.percent, 100);
    assert_eq!(last.payload.unwrap()["errors_count"], 4);
}

#[tokio::test(start_paused = true)]
async fn test_run_timeout_during_prd_ends_run() {
    let backend = Arc::new(ScriptedBackend::new().with(
        AgentKey::Prd,
        Script::Sleep(Duration::from_secs(600), "too late".to_string()),
    ));
    let sink = Arc::new(RecordingSink::default());
    let config = OrchestratorConfig {
        run_timeout: Some(Duration::from_secs(60)),
        ..Default::default()
    };
    let orchestrator = orchestrator(backend.clone(), config);

    let result = orchestrator
        .run(IDEA, None, Some(sink.clone() as Arc<dyn ProgressSink>), &BTreeSet::new())
        .await;

    assert!(result.company_context.is_some());
    assert!(result.prd.is_none());
    assert_eq!(result.errors, vec!["PRD generation error: run timed out after 60s".to_string()]);
    assert_eq!(backend.count(AgentKey::CodeImpact), 0);
    assert_eq!(sink.statuses("prd"), vec![ProgressStatus::Started, ProgressStatus::Error]);
    assert_eq!(sink.events().pop().unwrap().phase, Phase::PrdGeneration);
}

// ============================================================================
// Panics
// ============================================================================

#[tokio::test]
async fn test_panicking_agent_becomes_orchestrator_error() {
    let backend = Arc::new(ScriptedBackend::new().with(AgentKey::Analytics, Script::Panic));
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator
        .run(IDEA, None, Some(sink.clone() as Arc<dyn ProgressSink>), &BTreeSet::new())
        .await;

    assert!(result.design_specs.is_some());
    assert!(result.analytics_plan.is_none());
    assert!(result.prd_validation.is_none());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0], "Orchestrator error: panicked: scripted panic in analytics");
    assert_eq!(backend.count(AgentKey::Validator), 0);

    assert_eq!(sink.statuses("analytics"), vec![ProgressStatus::Started, ProgressStatus::Error]);
    let last = sink.events().pop().unwrap();
    assert_eq!(last.agent, "orchestrator");
    assert_eq!(last.status, ProgressStatus::Error);
}

// ============================================================================
// Progress sink failures
// ============================================================================

#[tokio::test]
async fn test_sink_failing_immediately_stops_run() {
    let backend = Arc::new(ScriptedBackend::new());
    let sink: Arc<dyn ProgressSink> = Arc::new(FailingSink::after(0));
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, Some(sink), &BTreeSet::new()).await;

    assert!(backend.invoked().is_empty());
    assert_eq!(
        result.errors,
        vec!["Orchestrator error: progress sink failed: sink closed".to_string()]
    );
}

#[tokio::test]
async fn test_sink_failure_inside_agent_fails_that_agent() {
    // The phase announcement gets through; every later event fails
    let backend = Arc::new(ScriptedBackend::new());
    let sink: Arc<dyn ProgressSink> = Arc::new(FailingSink::after(1));
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, Some(sink), &BTreeSet::new()).await;

    assert!(backend.invoked().is_empty());
    assert!(result.company_context.is_none());
    assert_eq!(
        result.errors,
        vec![
            "Context extraction error: progress sink failed: sink closed".to_string(),
            "Release notes error: progress sink failed: sink closed".to_string(),
            "Orchestrator error: progress sink failed: sink closed".to_string(),
        ]
    );
}

// ============================================================================
// Parallel Design & Tracking
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_parallel_design_and_analytics_overlap() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with(
                AgentKey::Design,
                Script::Sleep(Duration::from_secs(20), "design output".to_string()),
            )
            .with(
                AgentKey::Analytics,
                Script::Sleep(Duration::from_secs(20), "analytics output".to_string()),
            ),
    );
    let config = OrchestratorConfig {
        parallel_independent_agents: true,
        ..Default::default()
    };
    let orchestrator = orchestrator(backend, config);

    let started = tokio::time::Instant::now();
    let result = orchestrator.run(IDEA, None, None, &BTreeSet::new()).await;

    assert!(started.elapsed() < Duration::from_secs(40));
    assert_eq!(result.design_specs.as_deref(), Some("design output"));
    assert_eq!(result.analytics_plan.as_deref(), Some("analytics output"));
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_parallel_failures_recorded_in_fixed_order() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .failing(AgentKey::Design)
            .failing(AgentKey::Analytics),
    );
    let config = OrchestratorConfig {
        parallel_independent_agents: true,
        ..Default::default()
    };
    let orchestrator = orchestrator(backend, config);

    let result = orchestrator.run(IDEA, None, None, &BTreeSet::new()).await;

    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].starts_with("Design generation error:"));
    assert!(result.errors[1].starts_with("Analytics planning error:"));
    assert!(result.prd_validation.is_some());
    assert!(result.jira_tickets.is_some());
}
