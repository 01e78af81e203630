use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::Capabilities;
use crate::core_types::{InlineImage, VectorizationSettings};
use crate::errors::GatewayError;
use crate::gateway::schema::parse_structured;
use crate::gateway::{Content, GatewayRequest, OutputFormat, Part};

/// Appended to every raster prompt; the vectorizer only copes with two-tone art.
pub const GENERATION_SUFFIX: &str = "The final image must be a clean, black-on-white line art. It should be suitable for vectorization and laser cutting, looking like a silhouette or a stencil with only pure black and pure white pixels on a plain white background.";

const VECTORIZE_INSTRUCTIONS: &str = "You convert raster images into clean, monochrome SVG vector graphics for laser cutting and engraving machines. Return a JSON object whose only key is \"svgString\" and whose value is a complete, well-formed SVG document starting with <svg and ending with </svg>. Use only black (#000000) fills with no stroke, gradients, filters or effects. Give the SVG a viewBox matching the aspect ratio of the input image.";

pub fn vectorize_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "svgString": {
                "type": "string",
                "description": "The vectorized image as a complete SVG document."
            }
        },
        "required": ["svgString"]
    })
}

#[derive(Deserialize)]
struct VectorizeReply {
    #[serde(rename = "svgString")]
    svg_string: String,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn vectorize_prompt(settings: &VectorizationSettings) -> String {
    let mut prompt = String::from(VECTORIZE_INSTRUCTIONS);
    if settings.single_path {
        prompt.push_str(" Combine all shapes into a single compound path where possible.");
    }
    if settings.remove_background {
        prompt.push_str(" Isolate the main subject and discard the background completely.");
    }
    prompt.push_str(&format!(
        "\n\nVectorization settings:\n- Detail Level: {} (0=less detail, 100=more detail)\n- Curve Smoothing: {} (0=very angular, 100=very smooth)\n- Remove Background: {}\n- Create Single Path: {}",
        settings.detail_level,
        settings.smoothness,
        yes_no(settings.remove_background),
        yes_no(settings.single_path),
    ));
    prompt
}

impl Capabilities {
    /// Generates a raster image and returns the first image part of the reply.
    pub async fn generate_raster_image(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<InlineImage, GatewayError> {
        let request = GatewayRequest::new(self.models.image.clone())
            .with_content(Content::user_text(prompt))
            .with_output(OutputFormat::TextAndImage);

        let response = self.call(request, cancel).await?;
        response.images.into_iter().next().ok_or_else(|| {
            GatewayError::EmptyResponse(match response.text {
                Some(text) => format!("No image in reply; model said: {}", text),
                None => "No image in reply".to_string(),
            })
        })
    }

    /// Asks the Gateway to vectorize `image`. Only a reply that is a
    /// schema-valid object whose `svgString` opens with `<svg` is accepted.
    pub async fn vectorize_image(
        &self,
        image: &InlineImage,
        settings: &VectorizationSettings,
        cancel: &CancellationToken,
    ) -> Result<String, GatewayError> {
        let schema = vectorize_schema();
        let request = GatewayRequest::new(self.models.vision.clone())
            .with_content(Content::user_parts(vec![
                Part::Text(vectorize_prompt(settings)),
                Part::Image(image.clone()),
            ]))
            .with_output(OutputFormat::Json(schema.clone()));

        let response = self.call(request, cancel).await?;
        let reply: VectorizeReply = parse_structured(&schema, response.text.as_deref())?;

        let svg = reply.svg_string.trim();
        if svg.is_empty() {
            return Err(GatewayError::EmptyResponse("svgString is empty".to_string()));
        }
        if !svg.starts_with("<svg") {
            return Err(GatewayError::SchemaValidation(
                "svgString does not start with an <svg> opening tag".to_string(),
            ));
        }
        Ok(svg.to_string())
    }
}
