//! Tests for phase sequencing and per-agent failure isolation

use super::common::*;
use redspec::pipeline::prompts;
use redspec::{AgentKey, OrchestratorConfig, RunRequest};
use redspec_sdk::Phase;
use std::collections::BTreeSet;
use std::sync::Arc;

fn no_skip() -> BTreeSet<Phase> {
    BTreeSet::new()
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_end_to_end_without_repo() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, None, &no_skip()).await;

    assert_eq!(result.product_idea, IDEA);
    assert_eq!(result.total_story_points, Some(21));
    assert_eq!(result.validation_score, Some(88));
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);

    for key in AgentKey::ALL {
        if key == AgentKey::Codebase {
            assert!(result.codebase_info.is_none());
        } else {
            assert_eq!(result.output(key), Some(default_output(key).as_str()), "{key}");
        }
    }
    assert_eq!(backend.count(AgentKey::Codebase), 0);
}

#[tokio::test]
async fn test_agents_run_in_pipeline_order() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    orchestrator.run(IDEA, Some(REPO), None, &no_skip()).await;

    assert_eq!(backend.invoked(), AgentKey::ALL.to_vec());
}

#[tokio::test]
async fn test_repo_enables_codebase_agent_and_feeds_impact() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, Some(REPO), None, &no_skip()).await;

    assert_eq!(result.repo_url.as_deref(), Some(REPO));
    assert_eq!(result.codebase_info.as_deref(), Some("codebase output"));
    assert!(backend.prompt_for(AgentKey::Codebase).unwrap().contains(REPO));

    let impact_prompt = backend.prompt_for(AgentKey::CodeImpact).unwrap();
    assert!(impact_prompt.contains("codebase output"));
    assert!(!impact_prompt.contains(prompts::NO_CODEBASE));
}

#[tokio::test]
async fn test_prompts_chain_upstream_outputs() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    orchestrator.run(IDEA, None, None, &no_skip()).await;

    let prd_prompt = backend.prompt_for(AgentKey::Prd).unwrap();
    assert!(prd_prompt.contains(IDEA));
    assert!(prd_prompt.contains("context output"));
    assert!(prd_prompt.contains("release_notes output"));

    assert!(backend
        .prompt_for(AgentKey::ReleaseNotes)
        .unwrap()
        .contains(IDEA));
    assert!(backend
        .prompt_for(AgentKey::CodeImpact)
        .unwrap()
        .contains(prompts::NO_CODEBASE));

    let jira_prompt = backend.prompt_for(AgentKey::Jira).unwrap();
    assert!(jira_prompt.contains("prd output"));
    assert!(jira_prompt.contains("Total: 21 points"));
    assert!(jira_prompt.contains("code_impact output"));

    for key in [AgentKey::Design, AgentKey::Analytics, AgentKey::Validator] {
        let prompt = backend.prompt_for(key).unwrap();
        assert!(prompt.contains("prd output"));
        assert!(!prompt.contains("code_impact output"), "{key} should only see the PRD");
    }
}

#[tokio::test]
async fn test_run_request_form() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let request = RunRequest::new(IDEA)
        .with_repo(REPO)
        .skip(Phase::ValidationIntegration);
    let result = orchestrator.run_request(request, None).await;

    assert!(result.codebase_info.is_some());
    assert!(result.prd_validation.is_none());
    assert!(result.jira_tickets.is_none());
    assert_eq!(backend.count(AgentKey::Validator), 0);
}

// ============================================================================
// PRD hard dependency
// ============================================================================

#[tokio::test]
async fn test_prd_failure_stops_downstream_phases() {
    let backend = Arc::new(ScriptedBackend::new().failing(AgentKey::Prd));
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, None, &no_skip()).await;

    assert!(result.prd.is_none());
    assert!(result.code_impact.is_none());
    assert!(result.story_points.is_none());
    assert!(result.design_specs.is_none());
    assert!(result.analytics_plan.is_none());
    assert!(result.prd_validation.is_none());
    assert!(result.jira_tickets.is_none());
    assert!(result.total_story_points.is_none());
    assert!(result.validation_score.is_none());

    assert_eq!(result.company_context.as_deref(), Some("context output"));
    assert_eq!(result.release_history.as_deref(), Some("release_notes output"));

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("PRD generation error:"), "{}", result.errors[0]);

    assert_eq!(
        backend.invoked(),
        vec![AgentKey::Context, AgentKey::ReleaseNotes, AgentKey::Prd]
    );
}

#[tokio::test]
async fn test_skipping_prd_phase_skips_everything_after() {
    let backend = Arc::new(ScriptedBackend::new());
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let skip = [Phase::PrdGeneration].into_iter().collect();
    let result = orchestrator.run(IDEA, None, None, &skip).await;

    assert!(result.prd.is_none());
    assert!(result.errors.is_empty());
    assert_eq!(backend.invoked(), vec![AgentKey::Context, AgentKey::ReleaseNotes]);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_single_context_failure_is_isolated() {
    for failing in [AgentKey::Context, AgentKey::Codebase, AgentKey::ReleaseNotes] {
        let backend = Arc::new(ScriptedBackend::new().failing(failing));
        let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

        let result = orchestrator.run(IDEA, Some(REPO), None, &no_skip()).await;

        for key in [AgentKey::Context, AgentKey::Codebase, AgentKey::ReleaseNotes] {
            assert_eq!(result.output(key).is_some(), key != failing, "{failing} failing, checking {key}");
        }
        assert_eq!(backend.count(AgentKey::Prd), 1);
        assert!(result.prd.is_some());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with(failing.error_label()));
    }
}

#[tokio::test]
async fn test_prd_prompt_receives_fallback_notes() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .failing(AgentKey::Context)
            .failing(AgentKey::ReleaseNotes),
    );
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    orchestrator.run(IDEA, None, None, &no_skip()).await;

    let prd_prompt = backend.prompt_for(AgentKey::Prd).unwrap();
    assert!(prd_prompt.contains(prompts::NO_COMPANY_CONTEXT));
    assert!(prd_prompt.contains(prompts::NO_RELEASE_HISTORY));
}

#[tokio::test]
async fn test_every_non_prd_agent_failing_never_raises() {
    let mut backend = ScriptedBackend::new();
    for key in AgentKey::ALL {
        if key != AgentKey::Prd {
            backend = backend.failing(key);
        }
    }
    let backend = Arc::new(backend);
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, Some(REPO), None, &no_skip()).await;

    assert_eq!(result.errors.len(), 9);
    assert_eq!(result.prd.as_deref(), Some("prd output"));
    for key in AgentKey::ALL {
        if key != AgentKey::Prd {
            assert!(result.output(key).is_none(), "{key}");
        }
    }

    let labels: Vec<_> = result
        .errors
        .iter()
        .map(|e| e.split(" error:").next().unwrap().to_string())
        .collect();
    assert_eq!(
        labels,
        vec![
            "Context extraction",
            "Codebase fetch",
            "Release notes",
            "Code impact analysis",
            "Story point calculation",
            "Design generation",
            "Analytics planning",
            "PRD validation",
            "JIRA integration",
        ]
    );

    let jira_prompt = backend.prompt_for(AgentKey::Jira).unwrap();
    assert!(jira_prompt.contains(prompts::NO_STORY_POINTS));
    assert!(jira_prompt.contains(prompts::NO_IMPACT_ANALYSIS));
}

#[tokio::test]
async fn test_error_message_carries_backend_cause() {
    let backend = Arc::new(
        ScriptedBackend::new().with(AgentKey::Design, Script::Fail("quota exceeded".to_string())),
    );
    let orchestrator = orchestrator(backend, OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, None, &no_skip()).await;

    assert_eq!(
        result.errors,
        vec!["Design generation error: malformed response: quota exceeded".to_string()]
    );
    assert!(result.analytics_plan.is_some());
}

// ============================================================================
// Skipping
// ============================================================================

#[tokio::test]
async fn test_skipped_phase_agents_are_never_invoked() {
    for phase in Phase::ALL {
        if phase == Phase::PrdGeneration {
            continue;
        }
        let backend = Arc::new(ScriptedBackend::new());
        let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

        let skip = [phase].into_iter().collect();
        let result = orchestrator.run(IDEA, Some(REPO), None, &skip).await;

        for key in AgentKey::in_phase(phase) {
            assert_eq!(backend.count(key), 0, "{key} ran although {phase} was skipped");
            assert!(result.output(key).is_none());
        }
        assert!(result.errors.is_empty());
    }
}

#[tokio::test]
async fn test_configured_and_per_run_skips_combine() {
    let backend = Arc::new(ScriptedBackend::new());
    let config = OrchestratorConfig {
        skip_phases: [Phase::DesignTracking].into_iter().collect(),
        ..Default::default()
    };
    let orchestrator = orchestrator(backend.clone(), config);

    let skip = [Phase::TechnicalAnalysis].into_iter().collect();
    let result = orchestrator.run(IDEA, None, None, &skip).await;

    assert!(result.design_specs.is_none());
    assert!(result.code_impact.is_none());
    assert!(result.total_story_points.is_none());
    assert!(result.jira_tickets.is_some());

    let jira_prompt = backend.prompt_for(AgentKey::Jira).unwrap();
    assert!(jira_prompt.contains(prompts::NO_STORY_POINTS));
}

// ============================================================================
// Scalar extraction
// ============================================================================

#[tokio::test]
async fn test_missing_scalars_stay_unset() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with(AgentKey::StoryPoints, Script::Reply("Story A: 5 points".to_string()))
            .with(AgentKey::Validator, Script::Reply("Looks solid overall".to_string())),
    );
    let orchestrator = orchestrator(backend, OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, None, &no_skip()).await;

    assert!(result.total_story_points.is_none());
    assert!(result.validation_score.is_none());
    assert!(result.story_points.is_some());
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_sprint_estimate_line_is_extracted() {
    let backend = Arc::new(ScriptedBackend::new().with(
        AgentKey::StoryPoints,
        Script::Reply("Summary\nTotal Sprint Estimate: 26 points".to_string()),
    ));
    let orchestrator = orchestrator(backend, OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, None, &no_skip()).await;

    assert_eq!(result.total_story_points, Some(26));
}

// ============================================================================
// Empty replies
// ============================================================================

#[tokio::test]
async fn test_empty_prd_counts_as_failure() {
    let backend = Arc::new(ScriptedBackend::new().with(AgentKey::Prd, Script::Reply(String::new())));
    let orchestrator = orchestrator(backend.clone(), OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, None, &no_skip()).await;

    assert!(result.prd.is_none());
    assert_eq!(
        result.errors,
        vec!["PRD generation error: malformed response: empty response".to_string()]
    );
    assert_eq!(backend.count(AgentKey::CodeImpact), 0);
}

#[tokio::test]
async fn test_blank_reply_leaves_field_unset() {
    let backend = Arc::new(ScriptedBackend::new().with(AgentKey::Design, Script::Reply(" \n\t".to_string())));
    let orchestrator = orchestrator(backend, OrchestratorConfig::default());

    let result = orchestrator.run(IDEA, None, None, &no_skip()).await;

    assert!(result.design_specs.is_none());
    assert!(result.analytics_plan.is_some());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Design generation error:"));
}
