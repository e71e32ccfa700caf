//! Writing a finished run to disk
//!
//! One markdown file per populated output, a plain-text summary, and a YAML
//! record of the whole result. All files of a run share a timestamp suffix.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::pipeline::types::WorkflowResult;
use crate::roles::AgentKey;

/// File name prefix for each agent's output
fn artifact_prefix(key: AgentKey) -> &'static str {
    match key {
        AgentKey::Context => "company_context",
        AgentKey::Codebase => "codebase_info",
        AgentKey::ReleaseNotes => "release_history",
        AgentKey::Prd => "prd",
        AgentKey::CodeImpact => "code_impact",
        AgentKey::StoryPoints => "story_points",
        AgentKey::Design => "design_specs",
        AgentKey::Analytics => "analytics",
        AgentKey::Validator => "validation",
        AgentKey::Jira => "jira",
    }
}

/// Paths written for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRun {
    pub output_dir: PathBuf,
    /// Markdown artifacts, in pipeline order
    pub artifacts: Vec<PathBuf>,
    pub summary: PathBuf,
    pub record: PathBuf,
}

impl PersistedRun {
    /// Every written path
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts
            .iter()
            .chain([&self.summary, &self.record])
            .map(PathBuf::as_path)
    }
}

pub async fn persist(result: &WorkflowResult, output_dir: &Path) -> Result<PersistedRun> {
    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let suffix = result.file_suffix();
    let mut artifacts = Vec::new();

    for key in AgentKey::ALL {
        let Some(text) = result.output(key) else {
            continue;
        };
        let path = output_dir.join(format!("{}_{}.md", artifact_prefix(key), suffix));
        fs::write(&path, text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(agent = %key, path = %path.display(), "artifact saved");
        artifacts.push(path);
    }

    let summary = output_dir.join(format!("summary_{}.txt", suffix));
    fs::write(&summary, render_summary(result))
        .await
        .with_context(|| format!("Failed to write summary: {}", summary.display()))?;

    let record = output_dir.join(format!("run_{}.yaml", suffix));
    let yaml = serde_yaml::to_string(result).context("Failed to serialize run record")?;
    fs::write(&record, yaml)
        .await
        .with_context(|| format!("Failed to write run record: {}", record.display()))?;

    Ok(PersistedRun {
        output_dir: output_dir.to_path_buf(),
        artifacts,
        summary,
        record,
    })
}

fn render_summary(result: &WorkflowResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Product Idea: {}", result.product_idea);
    let _ = writeln!(out, "Repository: {}", result.repo_url.as_deref().unwrap_or("none"));
    let _ = writeln!(out, "Timestamp: {}", result.timestamp.to_rfc3339());
    let _ = writeln!(
        out,
        "Total Story Points: {}",
        result
            .total_story_points
            .map(|p| p.to_string())
            .unwrap_or_else(|| "not extracted".to_string())
    );
    let _ = writeln!(
        out,
        "Validation Score: {}",
        result
            .validation_score
            .map(|s| format!("{}/100", s))
            .unwrap_or_else(|| "not extracted".to_string())
    );
    let _ = writeln!(out, "Errors: {}", result.errors.len());
    for error in &result.errors {
        let _ = writeln!(out, "  - {}", error);
    }
    out
}
