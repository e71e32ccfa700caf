/*
┌─────────────────────────────────────────────────────────────────────────────┐
│                            REDSPEC PIPELINE                                  │
└─────────────────────────────────────────────────────────────────────────────┘

  Phase 1: CONTEXT GATHERING
    ├─> context         company knowledge base
    ├─> codebase        only when a repository URL is given
    └─> release_notes   related past releases

         ↓

  Phase 2: PRD GENERATION   (failure stops the run here)
    └─> prd             idea + context + history

         ↓

  Phase 3: TECHNICAL ANALYSIS
    ├─> code_impact     PRD + codebase info
    └─> story_points    PRD + impact  ──> "Total ... N"

         ↓

  Phase 4: DESIGN & TRACKING   (REDSPEC_PARALLEL=1 runs both at once)
    ├─> design          PRD
    └─> analytics       PRD

         ↓

  Phase 5: VALIDATION & INTEGRATION
    ├─> validator       PRD  ──> "Score: N"
    └─> jira            PRD + story points + impact

  Output: <REDSPEC_OUTPUT_DIR>/{prd,code_impact,...}_<timestamp>.md,
          summary_<timestamp>.txt, run_<timestamp>.yaml

EXAMPLE COMMANDS:

  redspec "Add live bus tracking"
  redspec "Add live bus tracking" https://github.com/acme/bus-app
  REDSPEC_SKIP_PHASES=design_tracking redspec "Seat selection revamp"
  REDSPEC_EVENT_LINES=1 redspec "Refund status page" 2> events.log

*/

use anyhow::{Context, Result};
use clap::Parser;
use redspec::pipeline::{cli::Args, persist, Orchestrator};
use redspec::{logging, Settings};
use redspec_sdk::{log_file_saved, log_info, log_summary, log_warning, ConsoleSink, EventLineSink, FanoutSink, ProgressSink};
use std::collections::BTreeSet;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();
    logging::init();

    let settings = Settings::from_env().context("Invalid configuration")?;
    let orchestrator = Orchestrator::from_settings(&settings).await?;

    let mut sink = FanoutSink::new().with(Arc::new(ConsoleSink));
    if settings.event_lines {
        sink = sink.with(Arc::new(EventLineSink));
    }
    let sink: Arc<dyn ProgressSink> = Arc::new(sink);

    log_info!("Generating spec for: {}", args.idea);
    if let Some(repo) = &args.repo {
        log_info!("Repository: {}", repo);
    }

    let result = orchestrator
        .run(&args.idea, args.repo.as_deref(), Some(sink), &BTreeSet::new())
        .await;

    let persisted = persist(&result, &settings.output_dir).await?;
    for path in persisted.paths() {
        log_file_saved!(path.display());
    }

    for error in &result.errors {
        log_warning!(error);
    }
    log_summary!(result.total_story_points, result.validation_score, result.errors.len());
    println!("Output directory: {}", persisted.output_dir.display());

    Ok(())
}
