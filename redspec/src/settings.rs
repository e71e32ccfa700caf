//! Process configuration read from the environment (and `.env`)

use redspec_sdk::Phase;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::OrchestratorConfig;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{var}: expected {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub max_tokens: u32,
    pub max_tool_rounds: usize,
    pub output_dir: PathBuf,
    pub agent_timeout: Option<Duration>,
    pub run_timeout: Option<Duration>,
    pub parallel: bool,
    /// Also write progress as prefixed JSON lines to stderr
    pub event_lines: bool,
    pub skip_phases: BTreeSet<Phase>,
    /// YAML file overriding built-in agent roles
    pub roles_file: Option<PathBuf>,
    /// Company knowledge served by `get_company_context`
    pub knowledge_file: Option<PathBuf>,
    pub repo_cache_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            agent_timeout: None,
            run_timeout: None,
            parallel: false,
            event_lines: false,
            skip_phases: BTreeSet::new(),
            roles_file: None,
            knowledge_file: None,
            repo_cache_dir: default_repo_cache(),
        }
    }
}

fn default_repo_cache() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("redspec_repos")
}

impl Settings {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from an arbitrary variable lookup
    ///
    /// Unset and blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        settings.api_key = get("ANTHROPIC_API_KEY");
        if let Some(model) = get("REDSPEC_MODEL") {
            settings.model = model;
        }
        if let Some(base) = get("REDSPEC_API_BASE") {
            settings.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("REDSPEC_MAX_TOKENS") {
            settings.max_tokens = parse_positive("REDSPEC_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = get("REDSPEC_MAX_TOOL_ROUNDS") {
            settings.max_tool_rounds = parse_positive("REDSPEC_MAX_TOOL_ROUNDS", &raw)?;
        }
        if let Some(dir) = get("REDSPEC_OUTPUT_DIR") {
            settings.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get("REDSPEC_AGENT_TIMEOUT_SECS") {
            settings.agent_timeout = Some(Duration::from_secs(parse_positive("REDSPEC_AGENT_TIMEOUT_SECS", &raw)?));
        }
        if let Some(raw) = get("REDSPEC_RUN_TIMEOUT_SECS") {
            settings.run_timeout = Some(Duration::from_secs(parse_positive("REDSPEC_RUN_TIMEOUT_SECS", &raw)?));
        }
        if let Some(raw) = get("REDSPEC_PARALLEL") {
            settings.parallel = parse_bool("REDSPEC_PARALLEL", &raw)?;
        }
        if let Some(raw) = get("REDSPEC_EVENT_LINES") {
            settings.event_lines = parse_bool("REDSPEC_EVENT_LINES", &raw)?;
        }
        if let Some(raw) = get("REDSPEC_SKIP_PHASES") {
            settings.skip_phases = parse_phases("REDSPEC_SKIP_PHASES", &raw)?;
        }
        settings.roles_file = get("REDSPEC_ROLES_FILE").map(PathBuf::from);
        settings.knowledge_file = get("REDSPEC_KNOWLEDGE_FILE").map(PathBuf::from);
        if let Some(dir) = get("REDSPEC_REPO_CACHE") {
            settings.repo_cache_dir = PathBuf::from(dir);
        }

        Ok(settings)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            agent_timeout: self.agent_timeout,
            run_timeout: self.run_timeout,
            parallel_independent_agents: self.parallel,
            skip_phases: self.skip_phases.clone(),
        }
    }
}

/// Parse into the target integer type; zero and out-of-range values are rejected
fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, SettingsError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    match raw.parse::<T>() {
        Ok(n) if n > T::from(0) => Ok(n),
        _ => Err(SettingsError::Invalid {
            var,
            value: raw.to_string(),
            expected: "a positive integer",
        }),
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, SettingsError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::Invalid {
            var,
            value: raw.to_string(),
            expected: "a boolean",
        }),
    }
}

fn parse_phases(var: &'static str, raw: &str) -> Result<BTreeSet<Phase>, SettingsError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Phase>().map_err(|_| SettingsError::Invalid {
                var,
                value: s.to_string(),
                expected: "a phase name or number (1-5)",
            })
        })
        .collect()
}
