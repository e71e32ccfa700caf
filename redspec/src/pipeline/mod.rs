//! Spec pipeline module
//!
//! Runs ten agents across five phases: context gathering, PRD generation,
//! technical analysis, design & tracking, and validation & integration. The
//! result of a run is a [`WorkflowResult`], which [`persist`] writes to disk.

pub mod cli;
pub mod extract;
pub mod persist;
pub mod prompts;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use extract::{PatternExtractor, ScalarExtractor};
pub use persist::{persist, PersistedRun};
pub use types::{RunRequest, WorkflowResult};
pub use workflow::{
    generate_spec, generate_spec_blocking, GeneratedSpec, Orchestrator, OrchestratorConfig,
    ORCHESTRATOR_LABEL,
};
