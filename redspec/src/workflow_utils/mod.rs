//! Agent execution utilities shared by pipeline phases
//!
//! - **agent**: resolving an agent key and running one generation
//! - **progress**: run-scoped event emission with monotonic percentages

pub mod agent;
pub mod progress;

pub use agent::{AgentInvoker, InvocationCause, InvocationError, RunDeadline};
pub use progress::ProgressReporter;
