use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::fs;

use super::{Tool, ToolError};

/// Tool: get_company_context
///
/// Serves the company knowledge file. JSON content is re-emitted
/// pretty-printed; anything else is returned as-is.
pub struct CompanyContextTool {
    path: Option<PathBuf>,
}

impl CompanyContextTool {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Tool for CompanyContextTool {
    fn name(&self) -> &str {
        "get_company_context"
    }

    fn description(&self) -> &str {
        "Retrieve company context: product principles, tech stack, design system, and business constraints"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _input: Value) -> Result<String, ToolError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| ToolError::NotFound("no company knowledge file configured".to_string()))?;

        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(match serde_json::from_str::<Value>(&raw) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(raw),
            Err(_) => raw,
        })
    }
}
