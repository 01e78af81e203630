use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::Capabilities;
use crate::core_types::ChatMessage;
use crate::errors::GatewayError;
use crate::gateway::schema::parse_structured;
use crate::gateway::{Content, GatewayRequest, GatewayResponse, OutputFormat, ToolMetadata};
use crate::intent::Intent;

const CLASSIFY_INSTRUCTIONS: &str = "You route messages sent to a laser-cutting design assistant. Answer \"generate_design\" when the user asks for a new image, figure, logo, text design or any other artwork to be created. Answer \"chat\" for everything else: questions, greetings, feedback and requests for advice.";

fn classify_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "intent": {
                "type": "string",
                "enum": ["generate_design", "chat"]
            }
        },
        "required": ["intent"]
    })
}

#[derive(Deserialize)]
struct ClassifyReply {
    intent: Intent,
}

impl Capabilities {
    /// Free-text completion over a conversation. A blank completion is an
    /// `EmptyResponse`, so callers can tell "nothing to say" from a failure.
    pub async fn chat(
        &self,
        system: &str,
        history: &[ChatMessage],
        temperature: Option<f32>,
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let mut request = GatewayRequest::new(self.models.chat.clone())
            .with_system(system)
            .with_contents(history.iter().map(Content::from_message).collect());
        if let Some(temperature) = temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.call(request, cancel).await?;
        match response.text.map(|t| t.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(GatewayError::EmptyResponse(
                "Chat completion was empty".to_string(),
            )),
        }
    }

    pub async fn classify_intent(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Intent, GatewayError> {
        let schema = classify_schema();
        let request = GatewayRequest::new(self.models.chat.clone())
            .with_system(CLASSIFY_INSTRUCTIONS)
            .with_content(Content::user_text(text))
            .with_output(OutputFormat::Json(schema.clone()))
            .with_temperature(0.0);

        let response = self.call(request, cancel).await?;
        let reply: ClassifyReply = parse_structured(&schema, response.text.as_deref())?;
        Ok(reply.intent)
    }

    /// One step of a function-calling conversation. The raw response is
    /// returned so the caller can execute any tool calls it carries.
    pub async fn converse_with_tools(
        &self,
        system: &str,
        contents: Vec<Content>,
        tools: Vec<ToolMetadata>,
        cancel: &CancellationToken,
    ) -> Result<GatewayResponse, GatewayError> {
        let request = GatewayRequest::new(self.models.chat.clone())
            .with_system(system)
            .with_contents(contents)
            .with_tools(tools);

        self.call(request, cancel).await
    }
}
