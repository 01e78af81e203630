//! Sequences capability calls into user-facing results.
//!
//! The orchestrator is the boundary where typed Gateway failures become
//! canned replies. Every path returns a well-formed result: a design attempt
//! yields SVG markup and/or text, a chat attempt yields text. The failure
//! kind travels alongside for logging and never reaches the user as an error.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::capabilities::{Capabilities, GENERATION_SUFFIX};
use crate::config::{KodexConfig, MessagesConfig};
use crate::core_types::{ChatMessage, InlineImage, VectorizationSettings};
use crate::errors::{FailureKind, GatewayError, KodexError};
use crate::gateway::Gateway;
use crate::intent::{Intent, IntentResolver};
use crate::wizard::FontStyle;

pub const LASER_ASSISTANT_PERSONA: &str = "You are OBN Kodex LaserAI, a friendly and helpful assistant for laser cutting and engraving designs. Provide a concise, helpful, and friendly answer to the user's message in Spanish.";

/// How the prompt text of a request without a font is turned into a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFraming {
    /// Free text describing a subject; framed as a silhouette figure.
    Figure,
    /// Already a complete subject sentence.
    Verbatim,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignRequest {
    prompt: String,
    settings: VectorizationSettings,
    font: Option<FontStyle>,
    framing: PromptFraming,
}

impl DesignRequest {
    pub fn new(
        prompt: impl Into<String>,
        settings: VectorizationSettings,
        font: Option<FontStyle>,
        framing: PromptFraming,
    ) -> Result<Self, KodexError> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err(KodexError::Validation(
                "Design prompt cannot be empty".to_string(),
            ));
        }
        settings.validate()?;
        Ok(Self {
            prompt,
            settings,
            font,
            framing,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn settings(&self) -> &VectorizationSettings {
        &self.settings
    }

    pub fn font(&self) -> Option<FontStyle> {
        self.font
    }

    pub fn framing(&self) -> PromptFraming {
        self.framing
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignResult {
    pub svg_markup: Option<String>,
    pub text_response: Option<String>,
    pub failure: Option<FailureKind>,
}

impl DesignResult {
    fn degraded(text: &str, failure: FailureKind) -> Self {
        Self {
            svg_markup: None,
            text_response: Some(text.to_string()),
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub failure: Option<FailureKind>,
}

/// Grounding material for the business chatbot.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    pub business_name: String,
    pub knowledge: String,
}

impl KnowledgeBase {
    pub fn new(business_name: impl Into<String>, knowledge: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            knowledge: knowledge.into(),
        }
    }

    fn preamble(&self) -> String {
        format!(
            "You are a customer service chatbot for a business called \"{}\".\nYour personality should be helpful, friendly, and professional.\nAnswer customer questions based *only* on the information in the KNOWLEDGE BASE below. Do not make up information or answer questions unrelated to it. If the answer is not in the knowledge base, politely say that you don't have that information.\nKeep your answers concise and to the point.\n\nKNOWLEDGE BASE:\n---\n{}\n---",
            self.business_name,
            self.knowledge.trim()
        )
    }
}

/// One chat submission as seen by `Orchestrator::run`.
#[derive(Debug, Clone)]
pub struct AgentTurn {
    pub text: String,
    pub intent: Option<Intent>,
    pub settings: VectorizationSettings,
}

/// Builds the raster-generation prompt, always ending with the two-tone suffix.
pub fn compose_generation_prompt(request: &DesignRequest) -> String {
    let subject = match (request.font, request.framing) {
        (Some(font), _) => format!(
            "The text \"{}\" in a high-contrast, artistic {} font style.",
            request.prompt,
            font.label()
        ),
        (None, PromptFraming::Figure) => format!(
            "A simple figure of {} for laser cutting, like a silhouette or stencil.",
            request.prompt
        ),
        (None, PromptFraming::Verbatim) => request.prompt.clone(),
    };
    format!("{} {}", subject, GENERATION_SUFFIX)
}

#[derive(Clone)]
pub struct Orchestrator {
    capabilities: Capabilities,
    resolver: IntentResolver,
    messages: MessagesConfig,
    history_window: usize,
    chatbot_temperature: f32,
}

impl Orchestrator {
    pub fn new(capabilities: Capabilities, config: &KodexConfig) -> Self {
        let resolver = IntentResolver::new(capabilities.clone(), config.design.intent_strategy);
        Self {
            capabilities,
            resolver,
            messages: config.messages.clone(),
            history_window: config.chatbot.history_window.max(1),
            chatbot_temperature: config.chatbot.temperature,
        }
    }

    pub fn from_gateway(gateway: Arc<dyn Gateway>, config: &KodexConfig) -> Self {
        Self::new(
            Capabilities::new(gateway, config.gateway.models.clone()),
            config,
        )
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn messages(&self) -> &MessagesConfig {
        &self.messages
    }

    fn window<'a>(&self, history: &'a [ChatMessage]) -> &'a [ChatMessage] {
        &history[history.len().saturating_sub(self.history_window)..]
    }

    pub async fn generate_design(
        &self,
        request: &DesignRequest,
        cancel: &CancellationToken,
    ) -> DesignResult {
        let prompt = compose_generation_prompt(request);
        log::info!(
            "Generating design (font: {:?}, framing: {:?})",
            request.font,
            request.framing
        );
        log::debug!("Generation prompt: {}", prompt);

        let image = match self
            .capabilities
            .generate_raster_image(&prompt, cancel)
            .await
        {
            Ok(image) => image,
            Err(e @ GatewayError::EmptyResponse(_)) => {
                log::warn!("Raster generation returned no image: {}", e);
                return DesignResult::degraded(&self.messages.no_image, e.kind());
            }
            Err(e) => {
                log::warn!("Raster generation failed ({}): {}", e.kind(), e);
                return DesignResult::degraded(&self.messages.design_error, e.kind());
            }
        };

        match self
            .capabilities
            .vectorize_image(&image, &request.settings, cancel)
            .await
        {
            Ok(svg) => {
                log::info!("Design ready ({} bytes of SVG)", svg.len());
                DesignResult {
                    svg_markup: Some(svg),
                    text_response: Some(self.messages.design_ready.clone()),
                    failure: None,
                }
            }
            Err(e) => match e.kind() {
                FailureKind::EmptyResponse | FailureKind::SchemaValidation => {
                    log::warn!("Vectorization produced no usable SVG: {}", e);
                    DesignResult::degraded(&self.messages.vectorize_failed, e.kind())
                }
                kind => {
                    log::warn!("Vectorization failed ({}): {}", kind, e);
                    DesignResult::degraded(&self.messages.design_error, kind)
                }
            },
        }
    }

    /// Vectorizes a user-supplied image without generating anything first.
    pub async fn vectorize_upload(
        &self,
        image: &InlineImage,
        settings: &VectorizationSettings,
        cancel: &CancellationToken,
    ) -> DesignResult {
        match self
            .capabilities
            .vectorize_image(image, settings, cancel)
            .await
        {
            Ok(svg) => DesignResult {
                svg_markup: Some(svg),
                text_response: Some(self.messages.upload_ready.clone()),
                failure: None,
            },
            Err(e) => {
                log::warn!("Upload vectorization failed ({}): {}", e.kind(), e);
                DesignResult::degraded(&self.messages.upload_failed, e.kind())
            }
        }
    }

    /// Reply of the laser design assistant. `history` already ends with the
    /// user's new message.
    pub async fn assistant_reply(
        &self,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> ChatReply {
        let result = self
            .capabilities
            .chat(LASER_ASSISTANT_PERSONA, self.window(history), None, cancel)
            .await;

        match result {
            Ok(text) => ChatReply {
                text,
                failure: None,
            },
            Err(e @ GatewayError::EmptyResponse(_)) => {
                log::warn!("Assistant returned an empty completion");
                ChatReply {
                    text: self.messages.chat_unsure.clone(),
                    failure: Some(e.kind()),
                }
            }
            Err(e) => {
                log::warn!("Assistant chat failed ({}): {}", e.kind(), e);
                ChatReply {
                    text: self.messages.chat_error.clone(),
                    failure: Some(e.kind()),
                }
            }
        }
    }

    /// Reply of the knowledge-grounded business chatbot.
    pub async fn knowledge_reply(
        &self,
        history: &[ChatMessage],
        knowledge: &KnowledgeBase,
        cancel: &CancellationToken,
    ) -> ChatReply {
        let result = self
            .capabilities
            .chat(
                &knowledge.preamble(),
                self.window(history),
                Some(self.chatbot_temperature),
                cancel,
            )
            .await;

        match result {
            Ok(text) => ChatReply {
                text,
                failure: None,
            },
            Err(e) => {
                log::warn!("Chatbot reply failed ({}): {}", e.kind(), e);
                ChatReply {
                    text: self.messages.chatbot_error.clone(),
                    failure: Some(e.kind()),
                }
            }
        }
    }

    /// Routes one chat turn to the design path or to the assistant.
    /// `history` must already contain the turn's user message.
    pub async fn run(
        &self,
        turn: &AgentTurn,
        history: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> DesignResult {
        let intent = self.resolver.resolve(&turn.text, turn.intent, cancel).await;
        log::info!("Chat turn resolved to {:?}", intent);

        match intent {
            Intent::GenerateDesign => {
                match DesignRequest::new(
                    turn.text.clone(),
                    turn.settings,
                    None,
                    PromptFraming::Figure,
                ) {
                    Ok(request) => self.generate_design(&request, cancel).await,
                    Err(e) => {
                        log::warn!("Rejected design request: {}", e);
                        DesignResult::degraded(
                            &self.messages.design_error,
                            FailureKind::Configuration,
                        )
                    }
                }
            }
            Intent::Chat => {
                let reply = self.assistant_reply(history, cancel).await;
                DesignResult {
                    svg_markup: None,
                    text_response: Some(reply.text),
                    failure: reply.failure,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayResponse, Part};
    use crate::test_utils::scripted_gateway::ScriptedGateway;

    fn request(prompt: &str, font: Option<FontStyle>, framing: PromptFraming) -> DesignRequest {
        DesignRequest::new(prompt, VectorizationSettings::default(), font, framing).unwrap()
    }

    fn orchestrator(gateway: &ScriptedGateway) -> Orchestrator {
        Orchestrator::from_gateway(Arc::new(gateway.clone()), &KodexConfig::default())
    }

    fn png() -> InlineImage {
        InlineImage::new("image/png", vec![9, 9, 9])
    }

    #[test]
    fn free_text_is_framed_as_a_figure_with_suffix() {
        let prompt = compose_generation_prompt(&request("un zorro", None, PromptFraming::Figure));
        assert!(prompt.starts_with("A simple figure of un zorro for laser cutting"));
        assert!(prompt.contains("un zorro"));
        assert!(prompt.ends_with(GENERATION_SUFFIX));
    }

    #[test]
    fn font_turns_the_prompt_into_literal_text() {
        for framing in [PromptFraming::Figure, PromptFraming::Verbatim] {
            let prompt = compose_generation_prompt(&request(
                "Sofia",
                Some(FontStyle::Gothic),
                framing,
            ));
            assert!(prompt.starts_with(
                "The text \"Sofia\" in a high-contrast, artistic gothic font style."
            ));
            assert!(!prompt.contains("A simple figure of"));
            assert!(prompt.ends_with(GENERATION_SUFFIX));
        }
    }

    #[test]
    fn verbatim_prompts_are_not_wrapped_again() {
        let subject = "The outline of un árbol for laser cutting.";
        let prompt = compose_generation_prompt(&request(subject, None, PromptFraming::Verbatim));
        assert_eq!(prompt, format!("{} {}", subject, GENERATION_SUFFIX));
    }

    #[test]
    fn design_request_rejects_blank_prompt_and_bad_settings() {
        assert!(DesignRequest::new(
            "   ",
            VectorizationSettings::default(),
            None,
            PromptFraming::Figure
        )
        .is_err());

        let settings = VectorizationSettings {
            detail_level: 200,
            ..Default::default()
        };
        assert!(DesignRequest::new("x", settings, None, PromptFraming::Figure).is_err());
    }

    #[tokio::test]
    async fn successful_design_returns_svg_and_confirmation() {
        let gateway = ScriptedGateway::new(vec![
            Ok(GatewayResponse::image(png())),
            Ok(GatewayResponse::text(r#"{"svgString":"<svg><path/></svg>"}"#)),
        ]);
        let orchestrator = orchestrator(&gateway);

        let result = orchestrator
            .generate_design(
                &request("un zorro", None, PromptFraming::Figure),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.svg_markup.as_deref(), Some("<svg><path/></svg>"));
        assert_eq!(
            result.text_response.as_deref(),
            Some(orchestrator.messages().design_ready.as_str())
        );
        assert!(result.is_success());

        let requests = gateway.requests();
        assert!(matches!(&requests[1].contents[0].parts[1], Part::Image(img) if *img == png()));
    }

    #[tokio::test]
    async fn missing_image_degrades_to_no_image_apology() {
        let gateway = ScriptedGateway::new(vec![Ok(GatewayResponse::text("no puedo"))]);
        let orchestrator = orchestrator(&gateway);

        let result = orchestrator
            .generate_design(
                &request("un zorro", None, PromptFraming::Figure),
                &CancellationToken::new(),
            )
            .await;

        assert!(result.svg_markup.is_none());
        assert_eq!(
            result.text_response.as_deref(),
            Some(orchestrator.messages().no_image.as_str())
        );
        assert_eq!(result.failure, Some(FailureKind::EmptyResponse));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn non_svg_vectorization_degrades_to_vectorize_apology() {
        let gateway = ScriptedGateway::new(vec![
            Ok(GatewayResponse::image(png())),
            Ok(GatewayResponse::text(r#"{"svgString":"<div>not svg</div>"}"#)),
        ]);
        let orchestrator = orchestrator(&gateway);

        let result = orchestrator
            .generate_design(
                &request("un zorro", None, PromptFraming::Figure),
                &CancellationToken::new(),
            )
            .await;

        assert!(result.svg_markup.is_none());
        assert_eq!(
            result.text_response.as_deref(),
            Some(orchestrator.messages().vectorize_failed.as_str())
        );
        assert_eq!(result.failure, Some(FailureKind::SchemaValidation));
    }

    #[tokio::test]
    async fn transport_failure_degrades_to_generic_apology() {
        let gateway = ScriptedGateway::new(vec![
            Ok(GatewayResponse::image(png())),
            Err(GatewayError::Transport("reset".into())),
        ]);
        let orchestrator = orchestrator(&gateway);

        let result = orchestrator
            .generate_design(
                &request("un zorro", None, PromptFraming::Figure),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            result.text_response.as_deref(),
            Some(orchestrator.messages().design_error.as_str())
        );
        assert_eq!(result.failure, Some(FailureKind::Network));
    }

    #[tokio::test]
    async fn upload_vectorization_uses_upload_messages() {
        let gateway = ScriptedGateway::new(vec![
            Ok(GatewayResponse::text(r#"{"svgString":"<svg/>"}"#)),
            Err(GatewayError::Upstream {
                status: 500,
                message: "boom".into(),
            }),
        ]);
        let orchestrator = orchestrator(&gateway);
        let cancel = CancellationToken::new();
        let settings = VectorizationSettings::default();

        let ok = orchestrator.vectorize_upload(&png(), &settings, &cancel).await;
        assert_eq!(ok.svg_markup.as_deref(), Some("<svg/>"));
        assert_eq!(
            ok.text_response.as_deref(),
            Some(orchestrator.messages().upload_ready.as_str())
        );

        let failed = orchestrator.vectorize_upload(&png(), &settings, &cancel).await;
        assert!(failed.svg_markup.is_none());
        assert_eq!(
            failed.text_response.as_deref(),
            Some(orchestrator.messages().upload_failed.as_str())
        );
    }

    #[tokio::test]
    async fn assistant_reply_distinguishes_empty_from_failed() {
        let gateway = ScriptedGateway::new(vec![
            Ok(GatewayResponse::text("Usa MDF de 3 mm.")),
            Ok(GatewayResponse::text("")),
            Err(GatewayError::Transport("down".into())),
        ]);
        let orchestrator = orchestrator(&gateway);
        let cancel = CancellationToken::new();
        let history = vec![ChatMessage::user("¿Qué material uso?")];

        let reply = orchestrator.assistant_reply(&history, &cancel).await;
        assert_eq!(reply.text, "Usa MDF de 3 mm.");
        assert_eq!(reply.failure, None);

        let reply = orchestrator.assistant_reply(&history, &cancel).await;
        assert_eq!(reply.text, orchestrator.messages().chat_unsure);

        let reply = orchestrator.assistant_reply(&history, &cancel).await;
        assert_eq!(reply.text, orchestrator.messages().chat_error);
        assert_eq!(reply.failure, Some(FailureKind::Network));

        assert_eq!(
            gateway.requests()[0].system.as_deref(),
            Some(LASER_ASSISTANT_PERSONA)
        );
    }

    #[tokio::test]
    async fn only_the_history_window_is_replayed() {
        let gateway = ScriptedGateway::new(vec![Ok(GatewayResponse::text("ok"))]);
        let orchestrator = orchestrator(&gateway);
        let history: Vec<ChatMessage> = (0..14)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("pregunta {}", i))
                } else {
                    ChatMessage::assistant(format!("respuesta {}", i))
                }
            })
            .collect();

        orchestrator
            .assistant_reply(&history, &CancellationToken::new())
            .await;

        let contents = &gateway.requests()[0].contents;
        assert_eq!(contents.len(), 10);
        assert!(matches!(&contents[0].parts[0], Part::Text(t) if t == "pregunta 4"));
        assert!(matches!(&contents[9].parts[0], Part::Text(t) if t == "respuesta 13"));
    }

    #[tokio::test]
    async fn knowledge_reply_embeds_business_and_knowledge() {
        let gateway = ScriptedGateway::new(vec![
            Ok(GatewayResponse::text("Abrimos a las 9.")),
            Err(GatewayError::Cancelled),
        ]);
        let orchestrator = orchestrator(&gateway);
        let knowledge = KnowledgeBase::new("Taller Luz", "Horario: 9 a 18 h.");
        let history = vec![ChatMessage::user("¿A qué hora abren?")];
        let cancel = CancellationToken::new();

        let reply = orchestrator
            .knowledge_reply(&history, &knowledge, &cancel)
            .await;
        assert_eq!(reply.text, "Abrimos a las 9.");

        let request = &gateway.requests()[0];
        let system = request.system.as_deref().unwrap();
        assert!(system.contains("\"Taller Luz\""));
        assert!(system.contains("Horario: 9 a 18 h."));
        assert_eq!(request.temperature, Some(0.3));

        let reply = orchestrator
            .knowledge_reply(&history, &knowledge, &cancel)
            .await;
        assert_eq!(reply.text, orchestrator.messages().chatbot_error);
    }

    #[tokio::test]
    async fn run_routes_by_explicit_intent() {
        let gateway = ScriptedGateway::new(vec![
            Ok(GatewayResponse::text("¡Hola!")),
            Ok(GatewayResponse::image(png())),
            Ok(GatewayResponse::text(r#"{"svgString":"<svg/>"}"#)),
        ]);
        let orchestrator = orchestrator(&gateway);
        let cancel = CancellationToken::new();

        let chat_turn = AgentTurn {
            text: "hola".to_string(),
            intent: Some(Intent::Chat),
            settings: VectorizationSettings::default(),
        };
        let result = orchestrator
            .run(&chat_turn, &[ChatMessage::user("hola")], &cancel)
            .await;
        assert_eq!(result.text_response.as_deref(), Some("¡Hola!"));
        assert!(result.svg_markup.is_none());

        let design_turn = AgentTurn {
            text: "un búho".to_string(),
            intent: Some(Intent::GenerateDesign),
            settings: VectorizationSettings::default(),
        };
        let result = orchestrator
            .run(&design_turn, &[ChatMessage::user("un búho")], &cancel)
            .await;
        assert_eq!(result.svg_markup.as_deref(), Some("<svg/>"));
        assert!(matches!(
            &gateway.requests()[1].contents[0].parts[0],
            Part::Text(t) if t.starts_with("A simple figure of un búho")
        ));
    }
}
