use async_trait::async_trait;
use kodex_core::config::KodexConfig;
use kodex_core::core_types::{ChatMessage, InlineImage, Role, VectorizationSettings};
use kodex_core::errors::{GatewayError, KodexError};
use kodex_core::gateway::{Gateway, GatewayRequest, GatewayResponse, OutputFormat, Part};
use kodex_core::intent::Intent;
use kodex_core::session::{Completion, SessionMode};
use kodex_core::wizard::{Attachment, CutSubType, FontStyle, ThreeDSubType, WorkType};
use kodex_core::{KodexFactory, SetupWizard};
use std::sync::{Arc, Mutex};

/// Answers by request shape: image requests get a PNG, vectorization requests
/// get `svg_reply`, everything else gets `chat_reply`.
#[derive(Clone)]
struct MockGateway {
    produce_image: bool,
    svg_reply: String,
    chat_reply: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            produce_image: true,
            svg_reply: r#"{"svgString": "<svg viewBox=\"0 0 10 10\"><path d=\"M0 0h10v10H0z\"/></svg>"}"#
                .to_string(),
            chat_reply: Some("Te recomiendo MDF de 3 mm.".to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        if let Some(Part::Text(text)) = request.contents.last().and_then(|c| c.parts.first()) {
            self.prompts.lock().unwrap().push(text.clone());
        }

        match &request.output {
            OutputFormat::TextAndImage if self.produce_image => Ok(GatewayResponse::image(
                InlineImage::new("image/png", vec![0x89, b'P', b'N', b'G']),
            )),
            OutputFormat::TextAndImage => Ok(GatewayResponse::text("No puedo dibujar eso.")),
            OutputFormat::Json(_) => Ok(GatewayResponse::text(self.svg_reply.clone())),
            OutputFormat::Text => match &self.chat_reply {
                Some(reply) => Ok(GatewayResponse::text(reply.clone())),
                None => Err(GatewayError::Transport("connection refused".to_string())),
            },
        }
    }
}

fn kodex(gateway: &MockGateway) -> kodex_core::Kodex {
    KodexFactory::create_with_gateway(KodexConfig::default(), Arc::new(gateway.clone())).unwrap()
}

#[tokio::test]
async fn wizard_name_design_renders_literal_text_in_font() {
    let gateway = MockGateway::new();
    let kodex = kodex(&gateway);
    let workflow = kodex.workflow();

    workflow
        .with_wizard(|w| {
            w.select_work_type(WorkType::Cut);
            w.select_cut_sub_type(CutSubType::Name)?;
            w.set_text("Sofia");
            w.select_font(FontStyle::Serif)
        })
        .await
        .unwrap();

    let completion = workflow.submit_setup().await.unwrap();
    let Completion::Applied(result) = completion else {
        panic!("result was discarded");
    };
    assert!(result.svg_markup.unwrap().starts_with("<svg"));

    let prompts = gateway.prompts();
    assert!(prompts[0].contains("The text \"Sofia\""));
    assert!(prompts[0].contains("serif font style"));
    assert!(!prompts[0].contains("A simple figure of"));
    assert!(prompts[0].contains("black"));

    let session = workflow.snapshot().await;
    assert_eq!(session.mode, SessionMode::Chat);
    assert_eq!(session.history[0], ChatMessage::user("Sofia"));
    assert_eq!(session.history[1].content, kodex.config().messages.design_ready);
}

#[tokio::test]
async fn chat_design_without_image_degrades_to_text() {
    let mut gateway = MockGateway::new();
    gateway.produce_image = false;
    let kodex = kodex(&gateway);
    let workflow = kodex.workflow();

    let Completion::Applied(result) = workflow
        .submit_chat("un colibrí", Some(Intent::GenerateDesign))
        .await
        .unwrap()
    else {
        panic!("result was discarded");
    };

    assert!(result.svg_markup.is_none());
    assert_eq!(
        result.text_response.as_deref(),
        Some(kodex.config().messages.no_image.as_str())
    );
    assert!(workflow.svg_download().await.is_none());
    assert!(gateway.prompts()[0].contains("un colibrí"));
}

#[tokio::test]
async fn non_svg_vectorization_never_reaches_the_session() {
    let mut gateway = MockGateway::new();
    gateway.svg_reply = r#"{"svgString": "<img src=\"x.png\">"}"#.to_string();
    let kodex = kodex(&gateway);
    let workflow = kodex.workflow();

    workflow
        .submit_chat("un colibrí", Some(Intent::GenerateDesign))
        .await
        .unwrap();

    let session = workflow.snapshot().await;
    assert!(session.svg_result.is_none());
    assert_eq!(
        session.history.last().unwrap().content,
        kodex.config().messages.vectorize_failed
    );
}

#[tokio::test]
async fn existing_3d_design_is_vectorized_from_the_upload() {
    let gateway = MockGateway::new();
    let kodex = kodex(&gateway);
    let workflow = kodex.workflow();

    let ready = workflow
        .with_wizard(|w| {
            w.select_work_type(WorkType::ThreeD);
            w.select_three_d_sub_type(ThreeDSubType::ExistingDesign)?;
            let before = w.is_ready();
            w.attach(Attachment {
                file_name: "capas.png".to_string(),
                image: InlineImage::new("image/png", vec![1, 2, 3]),
            })?;
            Ok::<_, kodex_core::WizardError>((before, w.is_ready()))
        })
        .await
        .unwrap();
    assert_eq!(ready, (false, true));

    workflow.submit_setup().await.unwrap();

    let session = workflow.snapshot().await;
    assert_eq!(session.history[0].content, "Vectorizando la imagen: capas.png");
    assert!(session.svg_result.is_some());
    assert!(gateway.prompts()[0].contains("Detail Level: 50"));
}

#[tokio::test]
async fn conversation_grows_by_two_per_exchange_and_survives_failures() {
    let mut gateway = MockGateway::new();
    let kodex = kodex(&gateway);
    let workflow = kodex.workflow();

    for question in ["¿Qué grosor?", "¿Y la potencia?"] {
        workflow.submit_chat(question, Some(Intent::Chat)).await.unwrap();
    }
    assert_eq!(workflow.snapshot().await.history.len(), 4);

    gateway.chat_reply = None;
    let failing = KodexFactory::create_with_gateway(KodexConfig::default(), Arc::new(gateway))
        .unwrap()
        .workflow();
    failing.submit_chat("hola", Some(Intent::Chat)).await.unwrap();
    failing.submit_chat("¿sigues ahí?", Some(Intent::Chat)).await.unwrap();

    let history = failing.snapshot().await.history;
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(history[2].content, "¿sigues ahí?");
    assert_eq!(history[3].content, kodex.config().messages.chat_error);
}

#[tokio::test]
async fn reset_returns_the_session_to_its_initial_state() {
    let gateway = MockGateway::new();
    let kodex = kodex(&gateway);
    let workflow = kodex.workflow();
    let initial = workflow.snapshot().await;

    workflow
        .with_wizard(|w| {
            w.select_work_type(WorkType::Engrave);
            w.set_text("un mandala");
            Ok(())
        })
        .await
        .unwrap();
    workflow.submit_setup().await.unwrap();
    assert!(workflow.snapshot().await.svg_result.is_some());

    workflow.reset().await;

    let session = workflow.snapshot().await;
    assert_eq!(session.wizard, SetupWizard::new());
    assert_eq!(session.history, initial.history);
    assert_eq!(session.svg_result, initial.svg_result);
    assert_eq!(session.mode, initial.mode);
    assert_eq!(session.settings, VectorizationSettings::default());
}

#[tokio::test]
async fn out_of_range_settings_are_refused() {
    let gateway = MockGateway::new();
    let workflow = kodex(&gateway).workflow();
    let settings = VectorizationSettings {
        smoothness: 101,
        ..Default::default()
    };
    assert!(matches!(
        workflow.set_settings(settings).await,
        Err(KodexError::Validation(_))
    ));
}
