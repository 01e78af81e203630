//! Google Gemini REST implementation of the `Gateway` trait
//!
//! Talks to `models/{model}:generateContent` on the Generative Language API.
//! Any endpoint speaking the same dialect can be targeted through the
//! `custom` provider, which is how tests point it at a local mock server.

use crate::config::{GatewayConfig, GatewayProvider, ModelParameters};
use crate::core_types::{InlineImage, ToolCall, Usage};
use crate::errors::GatewayError;
use crate::gateway::schema::to_gemini_schema;
use crate::gateway::{
    Content, ContentRole, Gateway, GatewayRequest, GatewayResponse, OutputFormat, Part,
    ToolMetadata,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiGateway {
    api_key: String,
    client: Client,
    base_url: String,
    parameters: ModelParameters,
}

impl GeminiGateway {
    pub fn new(api_key: String, parameters: ModelParameters) -> Result<Self, GatewayError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), parameters)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        parameters: ModelParameters,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(parameters.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            parameters,
        })
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    /// Part kinds this client never sends and ignores on receipt.
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiBlob {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: Option<i32>,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: Option<i32>,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    message: String,
}

impl GeminiGateway {
    fn convert_contents(contents: Vec<Content>) -> Vec<GeminiContent> {
        contents
            .into_iter()
            .map(|content| {
                let role = match content.role {
                    ContentRole::User => "user",
                    ContentRole::Model => "model",
                    ContentRole::Function => "function",
                };
                GeminiContent {
                    role: Some(role.to_string()),
                    parts: content.parts.into_iter().map(Self::convert_part).collect(),
                }
            })
            .collect()
    }

    fn convert_part(part: Part) -> GeminiPart {
        match part {
            Part::Text(text) => GeminiPart::Text { text },
            Part::Image(image) => GeminiPart::InlineData {
                inline_data: GeminiBlob {
                    data: image.to_base64(),
                    mime_type: image.mime_type,
                },
            },
            Part::FunctionCall(call) => GeminiPart::FunctionCall {
                function_call: GeminiFunctionCall {
                    name: call.name,
                    args: call.arguments,
                },
            },
            Part::FunctionResponse { name, response } => GeminiPart::FunctionResponse {
                function_response: GeminiFunctionResponse { name, response },
            },
        }
    }

    fn convert_tools(tools: Vec<ToolMetadata>) -> Option<Vec<GeminiTool>> {
        if tools.is_empty() {
            return None;
        }

        let function_declarations = tools
            .into_iter()
            .map(|tool| GeminiFunctionDeclaration {
                name: tool.name,
                description: tool.description,
                // Gemini rejects OBJECT schemas without properties.
                parameters: tool
                    .input_schema
                    .get("properties")
                    .and_then(|p| p.as_object())
                    .filter(|p| !p.is_empty())
                    .map(|_| to_gemini_schema(&tool.input_schema)),
            })
            .collect();

        Some(vec![GeminiTool {
            function_declarations,
        }])
    }

    fn build_request(&self, request: GatewayRequest) -> GeminiRequest {
        let (response_mime_type, response_schema, response_modalities) = match &request.output {
            OutputFormat::Text => (None, None, None),
            OutputFormat::Json(schema) => (
                Some("application/json".to_string()),
                Some(to_gemini_schema(schema)),
                None,
            ),
            OutputFormat::TextAndImage => (
                None,
                None,
                Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
            ),
        };

        let generation_config = GeminiGenerationConfig {
            temperature: request.temperature.unwrap_or(self.parameters.temperature),
            max_output_tokens: self.parameters.max_tokens,
            top_p: self.parameters.top_p,
            response_mime_type,
            response_schema,
            response_modalities,
        };

        let system_instruction = request.system.map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text { text }],
        });

        GeminiRequest {
            contents: Self::convert_contents(request.contents),
            generation_config,
            system_instruction,
            tools: Self::convert_tools(request.tools),
        }
    }

    fn convert_response(response: GeminiResponse) -> Result<GatewayResponse, GatewayError> {
        let candidate = match response.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(GatewayError::EmptyResponse(format!(
                    "Gemini returned no candidates ({})",
                    reason
                )));
            }
        };

        let mut text_parts = Vec::new();
        let mut images = Vec::new();
        let mut tool_calls = Vec::new();

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        for part in parts {
            match part {
                GeminiPart::Text { text } => text_parts.push(text),
                GeminiPart::InlineData { inline_data } => {
                    let image = InlineImage::from_base64(inline_data.mime_type, &inline_data.data)
                        .map_err(|e| GatewayError::Parsing(e.to_string()))?;
                    images.push(image);
                }
                GeminiPart::FunctionCall { function_call } => {
                    tool_calls.push(ToolCall {
                        id: Some(format!("call_{}", uuid::Uuid::new_v4().simple())),
                        name: function_call.name,
                        arguments: function_call.args,
                    });
                }
                GeminiPart::FunctionResponse { .. } | GeminiPart::Other(_) => continue,
            }
        }

        let text = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join(""))
        };

        let usage = response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0) as u32,
            completion_tokens: u.candidates_token_count.unwrap_or(0) as u32,
            total_tokens: u.total_token_count.unwrap_or(0) as u32,
        });

        Ok(GatewayResponse {
            text,
            images,
            tool_calls,
            finish_reason: candidate.finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl Gateway for GeminiGateway {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        let model = request.model.clone();
        let body = self.build_request(request);

        log::debug!(
            "Gemini request to model {}: {} content(s), tools: {}",
            model,
            body.contents.len(),
            body.tools.is_some()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = match serde_json::from_str::<GeminiError>(&error_text) {
                Ok(gemini_error) => gemini_error.error.message,
                Err(_) => error_text,
            };

            return Err(GatewayError::Upstream { status, message });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            GatewayError::Parsing(format!("Failed to parse Gemini response: {}", e))
        })?;

        let converted = Self::convert_response(gemini_response)?;
        log::debug!(
            "Gemini response from {}: text: {}, images: {}, tool calls: {}, finish: {:?}",
            model,
            converted.text.is_some(),
            converted.images.len(),
            converted.tool_calls.len(),
            converted.finish_reason
        );
        Ok(converted)
    }
}

/// Create a Gemini gateway from configuration
pub fn create_gateway(config: &GatewayConfig) -> Result<Arc<dyn Gateway>, GatewayError> {
    let api_key = config
        .auth
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            GatewayError::Configuration(match &config.auth.api_key_env {
                Some(var) => format!("Environment variable {} not found for Gemini API key", var),
                None => "No API key found for Gemini. Set GEMINI_API_KEY or provide gateway.auth.api_key in config".to_string(),
            })
        })?;

    let gateway = match &config.provider {
        GatewayProvider::Gemini => GeminiGateway::new(api_key, config.parameters.clone())?,
        GatewayProvider::Custom { base_url } => {
            GeminiGateway::with_base_url(api_key, base_url.clone(), config.parameters.clone())?
        }
    };

    Ok(Arc::new(gateway))
}
