// Agent roles and registry
pub mod registry;
pub mod roles;

// Text-generation backends
pub mod backend;

// Tool collaborators agents call during generation
pub mod tools;

// Agent invocation and progress reporting
pub mod workflow_utils;

// Spec pipeline: orchestrator, prompts, extraction, persistence
pub mod pipeline;

// Environment configuration and diagnostics
pub mod logging;
pub mod settings;

pub use pipeline::{Orchestrator, OrchestratorConfig, RunRequest, WorkflowResult};
pub use roles::AgentKey;
pub use settings::Settings;
