//! Shared vocabulary for redspec pipeline runs: phases, progress events,
//! progress sinks, and console logging macros for CLI output.

pub mod phase;
pub mod progress;

pub use phase::{Phase, UnknownPhase};
pub use progress::{
    ChannelSink, ConsoleSink, EventLineSink, FanoutSink, ProgressEvent, ProgressSink,
    ProgressStatus, SinkResult, EVENT_LINE_PREFIX, ORCHESTRATOR,
};

// Re-export async trait for sink implementors
pub use async_trait::async_trait;

// ============================================================================
// Console Logging Macros
// ============================================================================
// Colored console output for people running the CLI. Machine-readable
// progress goes through `ProgressSink` instead.
// ============================================================================

/// Logs the start of a pipeline phase with a header and description.
///
/// # Example
/// ```
/// use redspec_sdk::log_phase_start_console;
/// log_phase_start_console!(2, "PRD Generation", "Phase 2: Generating PRD...");
/// ```
///
/// Outputs:
/// ```text
/// ═══ PHASE 2: PRD Generation ═══
/// Phase 2: Generating PRD...
/// ```
#[macro_export]
macro_rules! log_phase_start_console {
    ($phase:expr, $title:expr, $description:expr) => {
        println!("\x1b[1;36m═══ PHASE {}: {} ═══\x1b[0m", $phase, $title);
        println!("\x1b[36m{}\x1b[0m", $description);
    };
}

/// Logs an informational message.
///
/// # Example
/// ```
/// use redspec_sdk::log_info;
/// log_info!("Loading roles from defaults");
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
///
/// # Example
/// ```
/// use redspec_sdk::log_warning;
/// log_warning!("Codebase fetch error: clone timed out");
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs that a file has been saved.
///
/// # Example
/// ```
/// use redspec_sdk::log_file_saved;
/// log_file_saved!("output/prd_2025-01-01T10-00-00-000000.md");
/// ```
#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        println!("\x1b[32m✓ Saved: {}\x1b[0m", $path);
    };
}

/// Logs the headline numbers of a finished run.
///
/// # Example
/// ```
/// use redspec_sdk::log_summary;
/// log_summary!(Some(21u32), Some(88u32), 0usize);
/// ```
///
/// Outputs:
/// ```text
/// Story Points: 21 | Validation Score: 88/100 | Errors: 0
/// ```
#[macro_export]
macro_rules! log_summary {
    ($points:expr, $score:expr, $errors:expr) => {
        println!(
            "\x1b[1mStory Points: {} | Validation Score: {}/100 | Errors: {}\x1b[0m",
            $points.map(|p| p.to_string()).unwrap_or_else(|| "n/a".to_string()),
            $score.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string()),
            $errors
        );
    };
}
