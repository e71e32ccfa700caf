//! Design prompt generation and design-tool automation

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::{required_str, Tool, ToolError};

const DEFAULT_AUTOMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Methods an automation capability may be asked to use
pub const AUTOMATION_METHODS: &[&str] = &["auto", "playwright", "selenium"];

const USAGE_NOTES: &str = "\
1. Open the AI wireframe generator in your design tool.
2. Paste the prompt above into its prompt box and generate.
3. Refine with follow-up prompts such as \"make the buttons larger\".
4. Copy the result to the main canvas and link it from the PRD.";

/// A generated prompt plus instructions for running it by hand
#[derive(Debug, Clone, Serialize)]
pub struct DesignPrompt {
    pub screen_name: String,
    pub prompt: String,
    pub usage_notes: String,
}

/// Build a design-tool prompt from a screen description and component hints
pub fn build_design_prompt(screen_description: &str, screen_name: Option<&str>, components: &[String]) -> DesignPrompt {
    let mentions = |needles: &[&str]| {
        components.iter().any(|c| {
            let c = c.to_lowercase();
            needles.iter().any(|n| c.contains(n))
        })
    };

    let mut lines = vec![
        format!("Create a mobile app screen for {} with:", screen_description),
        "- Clean, modern mobile interface with card-based design".to_string(),
        "- Professional typography and spacing".to_string(),
    ];

    if mentions(&["header", "nav"]) {
        lines.push("- Header section with navigation and clear title".into());
    }
    if mentions(&["card"]) {
        lines.push("- Main content area with information cards".into());
        lines.push("- Cards with subtle shadows and rounded corners".into());
    }
    if mentions(&["button", "cta"]) {
        lines.push("- Call-to-action buttons at the bottom".into());
        lines.push("- Primary button in the brand color".into());
    }
    if mentions(&["list", "feed"]) {
        lines.push("- Scrollable list or feed layout".into());
        lines.push("- Clean item separation with subtle dividers".into());
    }
    if mentions(&["form", "input"]) {
        lines.push("- Input fields with clear labels".into());
        lines.push("- Form validation states".into());
    }

    lines.extend(
        [
            "- Cohesive color palette with good contrast",
            "- Appropriate icons for actions and navigation",
            "- Touch-friendly targets (minimum 44px height)",
        ]
        .map(String::from),
    );

    DesignPrompt {
        screen_name: screen_name.unwrap_or("Screen").to_string(),
        prompt: lines.join("\n"),
        usage_notes: USAGE_NOTES.to_string(),
    }
}

/// Tool: generate_design_prompt
pub struct DesignPromptTool;

#[async_trait]
impl Tool for DesignPromptTool {
    fn name(&self) -> &str {
        "generate_design_prompt"
    }

    fn description(&self) -> &str {
        "Generate a natural-language prompt for an AI wireframe tool from a screen description and component list"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "screen_description": {"type": "string"},
                "component_details": {
                    "type": "object",
                    "properties": {
                        "screen_name": {"type": "string"},
                        "components": {"type": "array", "items": {"type": "string"}}
                    }
                }
            },
            "required": ["screen_description"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let description = required_str(&input, "screen_description")?;
        let details = input.get("component_details");
        let screen_name = details
            .and_then(|d| d.get("screen_name"))
            .and_then(Value::as_str);
        let components: Vec<String> = details
            .and_then(|d| d.get("components"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let prompt = build_design_prompt(description, screen_name, &components);
        Ok(serde_json::to_string_pretty(&prompt).unwrap_or(prompt.prompt))
    }
}

/// Something able to turn a prompt into a design in an external tool
#[async_trait]
pub trait DesignAutomation: Send + Sync {
    /// Returns a human-readable result, typically a link to the generated design
    async fn generate(&self, prompt: &str, method: &str, timeout: Duration) -> Result<String, ToolError>;
}

/// Automation capability for deployments without a browser driver
pub struct UnavailableAutomation;

#[async_trait]
impl DesignAutomation for UnavailableAutomation {
    async fn generate(&self, _prompt: &str, method: &str, _timeout: Duration) -> Result<String, ToolError> {
        Err(ToolError::Unavailable(format!(
            "no design automation backend is installed for method '{}' (supported: {}); \
             run the generated prompt by hand",
            method,
            AUTOMATION_METHODS.join(", ")
        )))
    }
}

/// Tool: automate_design_tool
pub struct DesignAutomationTool {
    automation: Arc<dyn DesignAutomation>,
}

impl DesignAutomationTool {
    pub fn new(automation: Arc<dyn DesignAutomation>) -> Self {
        Self { automation }
    }
}

#[async_trait]
impl Tool for DesignAutomationTool {
    fn name(&self) -> &str {
        "automate_design_tool"
    }

    fn description(&self) -> &str {
        "Try to generate a design from a prompt in an external design tool and return a link"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string"},
                "method": {"type": "string", "enum": AUTOMATION_METHODS},
                "timeout_secs": {"type": "integer", "minimum": 1}
            },
            "required": ["prompt"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let prompt = required_str(&input, "prompt")?;
        let method = input.get("method").and_then(Value::as_str).unwrap_or("auto");
        if !AUTOMATION_METHODS.contains(&method) {
            return Err(ToolError::InvalidInput(format!("unsupported automation method '{}'", method)));
        }
        let timeout = input
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_AUTOMATION_TIMEOUT);

        self.automation.generate(prompt, method, timeout).await
    }
}
