//! Common utilities for pipeline tests

use async_trait::async_trait;
use redspec::backend::{AgentBackend, BackendError, GenerationRequest};
use redspec::registry::AgentRegistry;
use redspec::roles::{AgentKey, RoleSet};
use redspec::tools::ToolRegistry;
use redspec::{Orchestrator, OrchestratorConfig, Settings};
use redspec_sdk::{ProgressEvent, ProgressSink, ProgressStatus, SinkResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const IDEA: &str = "Add live bus tracking";
pub const REPO: &str = "https://github.com/acme/bus-app";

/// What the scripted backend does for one agent
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail(String),
    Sleep(Duration, String),
    Panic,
}

/// Backend returning canned output per agent and counting invocations
pub struct ScriptedBackend {
    scripts: HashMap<AgentKey, Script>,
    calls: Mutex<Vec<(AgentKey, String)>>,
}

impl ScriptedBackend {
    /// Every agent replies with a fixed string; scalars are extractable
    pub fn new() -> Self {
        let scripts = AgentKey::ALL
            .into_iter()
            .map(|key| (key, Script::Reply(default_output(key))))
            .collect();
        Self {
            scripts,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, key: AgentKey, script: Script) -> Self {
        self.scripts.insert(key, script);
        self
    }

    pub fn failing(self, key: AgentKey) -> Self {
        self.with(key, Script::Fail(format!("{} backend unavailable", key)))
    }

    pub fn calls(&self) -> Vec<(AgentKey, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn invoked(&self) -> Vec<AgentKey> {
        self.calls().into_iter().map(|(key, _)| key).collect()
    }

    pub fn count(&self, key: AgentKey) -> usize {
        self.calls().iter().filter(|(k, _)| *k == key).count()
    }

    pub fn prompt_for(&self, key: AgentKey) -> Option<String> {
        self.calls()
            .into_iter()
            .find(|(k, _)| *k == key)
            .map(|(_, prompt)| prompt)
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.agent, request.prompt.to_string()));

        match self.scripts.get(&request.agent).cloned() {
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Fail(reason)) => Err(BackendError::Malformed(reason)),
            Some(Script::Sleep(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(Script::Panic) => panic!("scripted panic in {}", request.agent),
            None => Err(BackendError::Malformed("no script".to_string())),
        }
    }
}

pub fn default_output(key: AgentKey) -> String {
    match key {
        AgentKey::StoryPoints => "Story A: 8\nStory B: 13\nTotal: 21 points".to_string(),
        AgentKey::Validator => "Completeness is good.\nScore: 88/100".to_string(),
        other => format!("{} output", other),
    }
}

/// Sink keeping every event it receives
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Statuses emitted for one agent, in order
    pub fn statuses(&self, agent: &str) -> Vec<ProgressStatus> {
        self.events()
            .into_iter()
            .filter(|e| e.agent == agent)
            .map(|e| e.status)
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn send(&self, event: ProgressEvent) -> SinkResult {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Sink that accepts `ok_count` events and then fails
pub struct FailingSink {
    ok_count: usize,
    seen: Mutex<usize>,
}

impl FailingSink {
    pub fn after(ok_count: usize) -> Self {
        Self {
            ok_count,
            seen: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ProgressSink for FailingSink {
    async fn send(&self, _event: ProgressEvent) -> SinkResult {
        let mut seen = self.seen.lock().unwrap();
        *seen += 1;
        if *seen > self.ok_count {
            return Err("sink closed".into());
        }
        Ok(())
    }
}

/// Registry with the built-in roles and stock tools
pub fn registry() -> Arc<AgentRegistry> {
    let settings = Settings {
        repo_cache_dir: std::env::temp_dir().join("redspec_pipeline_tests"),
        ..Settings::default()
    };
    let tools = ToolRegistry::with_defaults(&settings);
    Arc::new(AgentRegistry::new(RoleSet::builtin().unwrap(), &tools).unwrap())
}

pub fn orchestrator(backend: Arc<ScriptedBackend>, config: OrchestratorConfig) -> Orchestrator {
    Orchestrator::new(registry(), backend, config)
}
