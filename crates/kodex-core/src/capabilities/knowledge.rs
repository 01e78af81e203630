//! Capabilities backing the chatbot builder: knowledge refinement, text
//! extraction from images and logo palette analysis.

use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::Capabilities;
use crate::core_types::InlineImage;
use crate::errors::GatewayError;
use crate::gateway::schema::parse_structured;
use crate::gateway::{Content, GatewayRequest, OutputFormat, Part};

pub const MAX_LOGO_COLORS: usize = 6;

pub fn refined_knowledge_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "refinedText": {
                "type": "string",
                "description": "The knowledge base entry, structured with markdown headings, lists and bold text."
            }
        },
        "required": ["refinedText"]
    })
}

pub fn logo_palette_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "colors": {
                "type": "array",
                "items": { "type": "string", "pattern": "^#[0-9a-fA-F]{6}$" },
                "maxItems": MAX_LOGO_COLORS
            }
        },
        "required": ["colors"]
    })
}

#[derive(Deserialize)]
struct RefineReply {
    #[serde(rename = "refinedText")]
    refined_text: String,
}

#[derive(Deserialize)]
struct PaletteReply {
    colors: Vec<String>,
}

impl Capabilities {
    /// Restructures raw business notes into a markdown knowledge base entry.
    pub async fn refine_knowledge(
        &self,
        raw_text: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let schema = refined_knowledge_schema();
        let prompt = format!(
            "You are an expert content strategist. Transform the following raw text into a clear, well-structured knowledge base entry that an AI assistant can use to answer customer questions. Organize it with markdown headings (#), lists (- or *) and bold text (**).\n\nRaw Text:\n---\n{}\n---",
            raw_text
        );
        let request = GatewayRequest::new(self.models.chat.clone())
            .with_content(Content::user_text(prompt))
            .with_output(OutputFormat::Json(schema.clone()))
            .with_temperature(0.3);

        let response = self.call(request, cancel).await?;
        let reply: RefineReply = parse_structured(&schema, response.text.as_deref())?;
        if reply.refined_text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse(
                "refinedText is empty".to_string(),
            ));
        }
        Ok(reply.refined_text)
    }

    /// Extracts visible text from an image, or a short description when there is none.
    pub async fn extract_image_text(
        &self,
        image: &InlineImage,
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let request = GatewayRequest::new(self.models.vision.clone())
            .with_content(Content::user_parts(vec![
                Part::Text(
                    "Extract all visible text from this image. If there is no text, describe the image briefly."
                        .to_string(),
                ),
                Part::Image(image.clone()),
            ]))
            .with_temperature(0.1);

        let response = self.call(request, cancel).await?;
        response
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::EmptyResponse("No text extracted".to_string()))
    }

    /// Up to six dominant `#RRGGBB` colours of a logo.
    pub async fn analyze_logo(
        &self,
        image: &InlineImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, GatewayError> {
        let schema = logo_palette_schema();
        let request = GatewayRequest::new(self.models.vision.clone())
            .with_content(Content::user_parts(vec![
                Part::Text(format!(
                    "Analyze the provided logo image. Identify up to {} of its most dominant colors and return them as hexadecimal color codes, for example {{\"colors\": [\"#FFFFFF\", \"#000000\"]}}.",
                    MAX_LOGO_COLORS
                )),
                Part::Image(image.clone()),
            ]))
            .with_output(OutputFormat::Json(schema.clone()))
            .with_temperature(0.1);

        let response = self.call(request, cancel).await?;
        let reply: PaletteReply = parse_structured(&schema, response.text.as_deref())?;
        Ok(reply.colors)
    }
}
