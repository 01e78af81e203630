//! Tools the Gateway may call during a function-calling conversation.
//!
//! A tool describes itself with a `ToolMetadata` (name, description and a JSON
//! schema for its arguments) and executes against the argument object the
//! model produced. The registry keeps tools by name so a conversation loop
//! can dispatch the model's `ToolCall`s.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core_types::ToolCall;
use crate::errors::KodexError;
use crate::gateway::ToolMetadata;

#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<String, KodexError>;
}

/// Outcome of one dispatched tool call, ready to be sent back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub name: String,
    pub content: String,
    pub success: bool,
}

impl ToolOutcome {
    pub fn response_payload(&self) -> Value {
        if self.success {
            json!({ "result": self.content })
        } else {
            json!({ "error": self.content })
        }
    }
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name;
        self.tools.insert(name, tool);
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Metadata of every tool, sorted by name so requests are stable.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> = self.tools.values().map(|t| t.metadata()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Runs one model-issued call. Unknown tools and execution errors become
    /// failed outcomes the model can read, never errors.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        let Some(tool) = self.get_tool(&call.name) else {
            log::warn!("Model requested unknown tool '{}'", call.name);
            return ToolOutcome {
                name: call.name.clone(),
                content: format!("Unknown tool: {}", call.name),
                success: false,
            };
        };

        log::info!("Executing tool '{}'", call.name);
        log::debug!("Tool arguments: {}", call.arguments);
        match tool.execute(call.arguments.clone()).await {
            Ok(content) => ToolOutcome {
                name: call.name.clone(),
                content,
                success: true,
            },
            Err(e) => {
                log::warn!("Tool '{}' failed: {}", call.name, e);
                ToolOutcome {
                    name: call.name.clone(),
                    content: e.to_string(),
                    success: false,
                }
            }
        }
    }
}

/// Reads a required string argument.
pub fn required_str<'a>(
    tool_name: &str,
    arguments: &'a Value,
    key: &str,
) -> Result<&'a str, KodexError> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| KodexError::Tool {
            tool_name: tool_name.to_string(),
            message: format!("Missing or invalid '{}' parameter", key),
        })
}
