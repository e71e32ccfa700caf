//! Immutable agent registry built once at startup

use redspec_sdk::Phase;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::roles::{AgentKey, AgentRole, RoleSet};
use crate::tools::{Tool, ToolRegistry};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("agent '{0}' is used by phase {1} but has no role")]
    MissingAgent(AgentKey, Phase),

    #[error("agent '{agent}' binds unknown tool '{tool}'")]
    UnknownTool { agent: AgentKey, tool: String },
}

/// Role, owning phase, and resolved tools of one agent
#[derive(Clone)]
pub struct RegistryEntry {
    pub role: AgentRole,
    pub phase: Phase,
    pub tools: Vec<Arc<dyn Tool>>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("role", &self.role.name)
            .field("phase", &self.phase)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AgentRegistry {
    entries: HashMap<AgentKey, RegistryEntry>,
}

impl AgentRegistry {
    /// Resolve every role against the tool registry
    ///
    /// Fails if any agent the pipeline uses lacks a role, or if a role names a
    /// tool that is not registered.
    pub fn new(roles: RoleSet, tools: &ToolRegistry) -> Result<Self, RegistryError> {
        let roles = roles.into_inner();

        if let Some(missing) = AgentKey::ALL.into_iter().find(|key| !roles.contains_key(key)) {
            return Err(RegistryError::MissingAgent(missing, missing.phase()));
        }

        let mut entries = HashMap::with_capacity(roles.len());
        for (key, role) in roles {
            let resolved = role
                .tools
                .iter()
                .map(|name| {
                    tools.get(name).ok_or_else(|| RegistryError::UnknownTool {
                        agent: key,
                        tool: name.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            entries.insert(
                key,
                RegistryEntry {
                    role,
                    phase: key.phase(),
                    tools: resolved,
                },
            );
        }

        tracing::debug!(agents = entries.len(), "agent registry built");
        Ok(Self { entries })
    }

    pub fn get(&self, key: AgentKey) -> Option<&RegistryEntry> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
