//! Data structures for pipeline runs

use chrono::{DateTime, Local};
use redspec_sdk::Phase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::roles::AgentKey;

/// Everything one run produced
///
/// Text fields are `None` when their agent was skipped, failed, or never ran;
/// they are never set to an empty placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub timestamp: DateTime<Local>,
    pub product_idea: String,
    pub repo_url: Option<String>,

    pub company_context: Option<String>,
    pub codebase_info: Option<String>,
    pub release_history: Option<String>,
    pub prd: Option<String>,
    pub code_impact: Option<String>,
    pub story_points: Option<String>,
    pub design_specs: Option<String>,
    pub analytics_plan: Option<String>,
    pub prd_validation: Option<String>,
    pub jira_tickets: Option<String>,

    pub total_story_points: Option<u32>,
    pub validation_score: Option<u32>,

    /// One entry per failure, in the order they occurred
    pub errors: Vec<String>,
}

impl WorkflowResult {
    pub fn new(product_idea: impl Into<String>, repo_url: Option<String>) -> Self {
        Self {
            timestamp: Local::now(),
            product_idea: product_idea.into(),
            repo_url,
            company_context: None,
            codebase_info: None,
            release_history: None,
            prd: None,
            code_impact: None,
            story_points: None,
            design_specs: None,
            analytics_plan: None,
            prd_validation: None,
            jira_tickets: None,
            total_story_points: None,
            validation_score: None,
            errors: Vec::new(),
        }
    }

    /// Output field owned by `key`
    pub fn output(&self, key: AgentKey) -> Option<&str> {
        match key {
            AgentKey::Context => self.company_context.as_deref(),
            AgentKey::Codebase => self.codebase_info.as_deref(),
            AgentKey::ReleaseNotes => self.release_history.as_deref(),
            AgentKey::Prd => self.prd.as_deref(),
            AgentKey::CodeImpact => self.code_impact.as_deref(),
            AgentKey::StoryPoints => self.story_points.as_deref(),
            AgentKey::Design => self.design_specs.as_deref(),
            AgentKey::Analytics => self.analytics_plan.as_deref(),
            AgentKey::Validator => self.prd_validation.as_deref(),
            AgentKey::Jira => self.jira_tickets.as_deref(),
        }
    }

    pub(crate) fn set_output(&mut self, key: AgentKey, text: String) {
        let slot = match key {
            AgentKey::Context => &mut self.company_context,
            AgentKey::Codebase => &mut self.codebase_info,
            AgentKey::ReleaseNotes => &mut self.release_history,
            AgentKey::Prd => &mut self.prd,
            AgentKey::CodeImpact => &mut self.code_impact,
            AgentKey::StoryPoints => &mut self.story_points,
            AgentKey::Design => &mut self.design_specs,
            AgentKey::Analytics => &mut self.analytics_plan,
            AgentKey::Validator => &mut self.prd_validation,
            AgentKey::Jira => &mut self.jira_tickets,
        };
        *slot = Some(text);
    }

    /// Timestamp usable in file names (`:` and `.` replaced by `-`)
    pub fn file_suffix(&self) -> String {
        self.timestamp
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
            .replace([':', '.'], "-")
    }
}

/// Inputs of one run in struct form
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub product_idea: String,
    pub repo_url: Option<String>,
    /// Added to the orchestrator's configured skip set for this run only
    pub skip_phases: BTreeSet<Phase>,
}

impl RunRequest {
    pub fn new(product_idea: impl Into<String>) -> Self {
        Self {
            product_idea: product_idea.into(),
            ..Default::default()
        }
    }

    pub fn with_repo(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = Some(repo_url.into());
        self
    }

    pub fn skip(mut self, phase: Phase) -> Self {
        self.skip_phases.insert(phase);
        self
    }
}
