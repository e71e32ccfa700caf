//! CLI argument parsing for the spec pipeline

use clap::Parser;

/// Turn a product idea into a PRD, impact analysis, estimates, designs,
/// analytics plan, validation report, and JIRA tickets.
///
/// Configuration comes from the environment (see `.env`):
/// ANTHROPIC_API_KEY, REDSPEC_OUTPUT_DIR, REDSPEC_SKIP_PHASES, and friends.
#[derive(Parser, Debug, Clone)]
#[command(name = "redspec", version)]
pub struct Args {
    /// Product idea, e.g. "Add live bus tracking"
    pub idea: String,

    /// GitHub repository URL to analyze for code impact
    pub repo: Option<String>,
}
