//! Agent keys and role configuration
//!
//! Each agent is one data record (name, description, instruction, tool names).
//! The built-in set is compiled from `roles/default_roles.yaml`; a user file may
//! override individual entries.

use anyhow::{Context, Result};
use redspec_sdk::Phase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tokio::fs;

const DEFAULT_ROLES: &str = include_str!("../roles/default_roles.yaml");

/// Short registry key for each of the ten pipeline agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKey {
    Context,
    Codebase,
    ReleaseNotes,
    Prd,
    CodeImpact,
    StoryPoints,
    Design,
    Analytics,
    Validator,
    Jira,
}

impl AgentKey {
    pub const ALL: [AgentKey; 10] = [
        AgentKey::Context,
        AgentKey::Codebase,
        AgentKey::ReleaseNotes,
        AgentKey::Prd,
        AgentKey::CodeImpact,
        AgentKey::StoryPoints,
        AgentKey::Design,
        AgentKey::Analytics,
        AgentKey::Validator,
        AgentKey::Jira,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKey::Context => "context",
            AgentKey::Codebase => "codebase",
            AgentKey::ReleaseNotes => "release_notes",
            AgentKey::Prd => "prd",
            AgentKey::CodeImpact => "code_impact",
            AgentKey::StoryPoints => "story_points",
            AgentKey::Design => "design",
            AgentKey::Analytics => "analytics",
            AgentKey::Validator => "validator",
            AgentKey::Jira => "jira",
        }
    }

    /// Phase that owns this agent
    pub fn phase(self) -> Phase {
        match self {
            AgentKey::Context | AgentKey::Codebase | AgentKey::ReleaseNotes => {
                Phase::ContextGathering
            }
            AgentKey::Prd => Phase::PrdGeneration,
            AgentKey::CodeImpact | AgentKey::StoryPoints => Phase::TechnicalAnalysis,
            AgentKey::Design | AgentKey::Analytics => Phase::DesignTracking,
            AgentKey::Validator | AgentKey::Jira => Phase::ValidationIntegration,
        }
    }

    /// Prefix used when this agent's failure is recorded in a run's error list
    pub fn error_label(self) -> &'static str {
        match self {
            AgentKey::Context => "Context extraction",
            AgentKey::Codebase => "Codebase fetch",
            AgentKey::ReleaseNotes => "Release notes",
            AgentKey::Prd => "PRD generation",
            AgentKey::CodeImpact => "Code impact analysis",
            AgentKey::StoryPoints => "Story point calculation",
            AgentKey::Design => "Design generation",
            AgentKey::Analytics => "Analytics planning",
            AgentKey::Validator => "PRD validation",
            AgentKey::Jira => "JIRA integration",
        }
    }

    /// Agents belonging to `phase`, in their execution order
    pub fn in_phase(phase: Phase) -> impl Iterator<Item = AgentKey> {
        AgentKey::ALL.into_iter().filter(move |key| key.phase() == phase)
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static descriptor of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub instruction: String,
    /// Names of tool collaborators this agent may call during generation
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Role definitions keyed by agent
#[derive(Debug, Clone, Default)]
pub struct RoleSet {
    roles: HashMap<AgentKey, AgentRole>,
}

impl RoleSet {
    /// Parse a YAML map of `agent_key: role`
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let roles: HashMap<AgentKey, AgentRole> =
            serde_yaml::from_str(yaml).context("Failed to parse agent roles YAML")?;
        Ok(Self { roles })
    }

    /// The role set compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(DEFAULT_ROLES).context("Built-in roles are invalid")
    }

    /// Built-in roles, with entries from `overrides` replacing matching keys
    pub async fn load(overrides: Option<&Path>) -> Result<Self> {
        let mut roles = Self::builtin()?;
        if let Some(path) = overrides {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read roles file: {}", path.display()))?;
            let user = Self::from_yaml(&content)
                .with_context(|| format!("Invalid roles file: {}", path.display()))?;
            tracing::info!(path = %path.display(), count = user.len(), "applying role overrides");
            roles.merge(user);
        }
        Ok(roles)
    }

    pub fn merge(&mut self, other: RoleSet) {
        self.roles.extend(other.roles);
    }

    pub fn insert(&mut self, key: AgentKey, role: AgentRole) {
        self.roles.insert(key, role);
    }

    pub fn remove(&mut self, key: AgentKey) -> Option<AgentRole> {
        self.roles.remove(&key)
    }

    pub fn get(&self, key: AgentKey) -> Option<&AgentRole> {
        self.roles.get(&key)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub(crate) fn into_inner(self) -> HashMap<AgentKey, AgentRole> {
        self.roles
    }
}
