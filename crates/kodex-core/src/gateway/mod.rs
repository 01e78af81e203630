//! The seam between the orchestration core and the external generative-AI service.
//!
//! A `GatewayRequest` is one round trip: a model name, an optional system
//! preamble, the conversation contents (text, inline images and function
//! traffic), and the kind of output wanted. Structured output is requested by
//! attaching a JSON schema; image generation by asking for text and image
//! parts. Implementations only move bytes. Interpreting and validating what
//! comes back is the job of the capability functions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core_types::{ChatMessage, InlineImage, Role, ToolCall, Usage};
use crate::errors::GatewayError;

pub mod gemini;
pub mod schema;

pub use gemini::{create_gateway, GeminiGateway};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRole {
    User,
    Model,
    Function,
}

#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    Image(InlineImage),
    FunctionCall(ToolCall),
    FunctionResponse { name: String, response: Value },
}

#[derive(Debug, Clone)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user_parts(parts: Vec<Part>) -> Self {
        Self {
            role: ContentRole::User,
            parts,
        }
    }

    /// Replays one history entry; assistant turns become model turns.
    pub fn from_message(message: &ChatMessage) -> Self {
        let role = match message.role {
            Role::User => ContentRole::User,
            Role::Assistant => ContentRole::Model,
        };
        Self {
            role,
            parts: vec![Part::Text(message.content.clone())],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Text,
    /// JSON constrained by the given schema (standard JSON Schema form).
    Json(Value),
    TextAndImage,
}

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub model: String,
    pub system: Option<String>,
    pub contents: Vec<Content>,
    pub output: OutputFormat,
    pub temperature: Option<f32>,
    pub tools: Vec<ToolMetadata>,
}

impl GatewayRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            contents: Vec::new(),
            output: OutputFormat::Text,
            temperature: None,
            tools: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    pub fn with_contents(mut self, contents: Vec<Content>) -> Self {
        self.contents.extend(contents);
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolMetadata>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct GatewayResponse {
    pub text: Option<String>,
    pub images: Vec<InlineImage>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl GatewayResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn image(image: InlineImage) -> Self {
        Self {
            images: vec![image],
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}
