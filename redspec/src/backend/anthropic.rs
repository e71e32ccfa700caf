//! Anthropic Messages API backend with a tool-use loop

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{AgentBackend, BackendError, GenerationRequest};
use crate::settings::Settings;
use crate::tools::Tool;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

impl Message {
    fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }

    fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not", default)]
        is_error: bool,
    },
    /// Block types this client does not act on (thinking, server tools)
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize)]
struct ToolDef<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

impl ApiResponse {
    fn wants_tools(&self) -> bool {
        self.stop_reason.as_deref() == Some("tool_use")
            && self
                .content
                .iter()
                .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    max_tool_rounds: usize,
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let defaults = Settings::default();
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: defaults.api_base,
            model: model.into(),
            max_tokens: defaults.max_tokens,
            max_tool_rounds: defaults.max_tool_rounds,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BackendError> {
        let api_key = settings.api_key.clone().ok_or(BackendError::MissingApiKey)?;
        Ok(Self::new(api_key, settings.model.clone())
            .with_api_base(settings.api_base.clone())
            .with_max_tokens(settings.max_tokens)
            .with_max_tool_rounds(settings.max_tool_rounds))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    fn request_body(&self, system: &str, messages: &[Message], tools: &[ToolDef<'_>]) -> Value {
        let mut body = serde_json::json!({
            "model": &self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools).unwrap_or(Value::Null);
        }
        body
    }

    async fn send(&self, system: &str, messages: &[Message], tools: &[ToolDef<'_>]) -> Result<ApiResponse, BackendError> {
        let resp = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(system, messages, tools))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<ApiResponse>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

/// Run every tool call in `content`, in order
///
/// Failures become error results for the model; they never abort generation.
async fn run_tool_calls(tools: &[Arc<dyn Tool>], content: &[ContentBlock]) -> Vec<ContentBlock> {
    let mut results = Vec::new();
    for block in content {
        let ContentBlock::ToolUse { id, name, input } = block else {
            continue;
        };

        let outcome = match tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.call(input.clone()).await.map_err(|e| e.to_string()),
            None => Err(format!("tool '{}' is not available to this agent", name)),
        };

        let (content, is_error) = match outcome {
            Ok(text) => (text, false),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                (e, true)
            }
        };
        results.push(ContentBlock::ToolResult {
            tool_use_id: id.clone(),
            content,
            is_error,
        });
    }
    results
}

#[async_trait]
impl AgentBackend for AnthropicBackend {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, BackendError> {
        let tool_defs: Vec<ToolDef<'_>> = request
            .tools
            .iter()
            .map(|t| ToolDef {
                name: t.name(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect();

        let mut messages = vec![Message::user(vec![ContentBlock::Text {
            text: request.prompt.to_string(),
        }])];
        let mut rounds = 0;

        loop {
            let resp = self
                .send(&request.role.instruction, &messages, &tool_defs)
                .await?;

            if !resp.wants_tools() {
                let text = resp.text();
                if text.trim().is_empty() {
                    return Err(BackendError::Malformed("response contained no text".to_string()));
                }
                return Ok(text);
            }

            if rounds == self.max_tool_rounds {
                return Err(BackendError::ToolLoopExceeded(rounds));
            }
            rounds += 1;

            tracing::debug!(agent = %request.agent, round = rounds, "running tool calls");
            let results = run_tool_calls(request.tools, &resp.content).await;
            let echoed = resp
                .content
                .into_iter()
                .filter(|b| !matches!(b, ContentBlock::Other))
                .collect();
            messages.push(Message::assistant(echoed));
            messages.push(Message::user(results));
        }
    }
}
