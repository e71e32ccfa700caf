//! Tool collaborators agents may call during generation
//!
//! Every capability with side effects (filesystem, git, browser automation) sits
//! behind the [`Tool`] trait so tests and alternative deployments can swap in
//! fakes without touching agents or the orchestrator.

pub mod codebase;
pub mod company;
pub mod design;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::settings::Settings;

pub use codebase::{FetchRepoTool, ReadCodeFileTool, RepoCache, SearchCodebaseTool};
pub use company::CompanyContextTool;
pub use design::{DesignAutomation, DesignAutomationTool, DesignPromptTool, UnavailableAutomation};

/// Failure of a single tool call
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("repository '{0}' not found, fetch it first")]
    RepoNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("tool unavailable: {0}")]
    Unavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("command failed: {0}")]
    Command(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An external capability exposed to agents
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the `input` object accepted by [`Tool::call`]
    fn input_schema(&self) -> Value;

    async fn call(&self, input: Value) -> Result<String, ToolError>;
}

/// Named set of tools roles can bind to
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock tools, configured from settings
    pub fn with_defaults(settings: &Settings) -> Self {
        let cache = Arc::new(RepoCache::new(&settings.repo_cache_dir));

        Self::new()
            .with(Arc::new(CompanyContextTool::new(settings.knowledge_file.clone())))
            .with(Arc::new(FetchRepoTool::new(cache.clone())))
            .with(Arc::new(SearchCodebaseTool::new(cache.clone())))
            .with(Arc::new(ReadCodeFileTool::new(cache)))
            .with(Arc::new(DesignPromptTool))
            .with(Arc::new(DesignAutomationTool::new(Arc::new(UnavailableAutomation))))
    }

    /// Add or replace a tool under its own name
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Read a required string field from a tool input object
pub(crate) fn required_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    input
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidInput(format!("missing string field '{}'", field)))
}
