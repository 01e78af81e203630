use async_trait::async_trait;
use kodex_core::config::{ConfigLoader, IntentStrategy};
use kodex_core::core_types::{ChatMessage, ToolCall};
use kodex_core::errors::GatewayError;
use kodex_core::gateway::{ContentRole, Gateway, GatewayRequest, GatewayResponse, Part};
use kodex_core::intent::Intent;
use kodex_core::KodexFactory;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct QueueGateway {
    replies: Arc<Mutex<VecDeque<GatewayResponse>>>,
    requests: Arc<Mutex<Vec<GatewayRequest>>>,
}

impl QueueGateway {
    fn new(replies: Vec<GatewayResponse>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }
}

#[async_trait]
impl Gateway for QueueGateway {
    async fn generate(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GatewayError::EmptyResponse("no scripted reply".to_string()))
    }
}

const CONFIG: &str = r#"
gateway:
  provider:
    custom:
      base_url: "http://127.0.0.1:9"
  auth:
    api_key: "integration-key"
design:
  intent_strategy: classify
  defaults:
    detail_level: 80
chatbot:
  business_name: "Barra Fresca"
  knowledge: "Servimos mojitos."
  knowledge_file: "knowledge.md"
booking:
  deposit_ratio: 0.5
  unavailable_dates: ["2026-02-14"]
"#;

async fn load(dir: &TempDir) -> kodex_core::KodexConfig {
    std::fs::write(dir.path().join("knowledge.md"), "Horario: 12 a 22 h.").unwrap();
    let path = dir.path().join("kodex.yaml");
    std::fs::write(&path, CONFIG).unwrap();
    ConfigLoader::from_file(&path).await.unwrap()
}

#[tokio::test]
async fn config_file_drives_every_component() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir).await;

    assert_eq!(config.design.intent_strategy, IntentStrategy::Classify);
    assert_eq!(config.design.defaults.detail_level, 80);
    assert_eq!(config.design.defaults.smoothness, 75);
    assert!(config.chatbot.knowledge.contains("Servimos mojitos."));
    assert!(config.chatbot.knowledge.contains("Horario: 12 a 22 h."));

    let gateway = QueueGateway::new(vec![
        GatewayResponse::text(r#"{"intent": "chat"}"#),
        GatewayResponse::text("¡Hola! ¿En qué te ayudo?"),
        GatewayResponse::text("Abrimos de 12 a 22 h."),
    ]);
    let kodex =
        KodexFactory::create_with_gateway(config, Arc::new(gateway.clone())).unwrap();

    let workflow = kodex.workflow();
    assert_eq!(workflow.snapshot().await.settings.detail_level, 80);
    workflow.submit_chat("hola", None).await.unwrap();
    assert_eq!(
        workflow.snapshot().await.history[1].content,
        "¡Hola! ¿En qué te ayudo?"
    );

    let reply = kodex
        .orchestrator()
        .knowledge_reply(
            &[ChatMessage::user("¿A qué hora abren?")],
            &kodex.knowledge_base(),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(reply.text, "Abrimos de 12 a 22 h.");

    let requests = gateway.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    let system = requests[2].system.clone().unwrap();
    assert!(system.contains("Barra Fresca"));
    assert!(system.contains("Horario: 12 a 22 h."));
}

#[tokio::test]
async fn explicit_intent_skips_classification_even_when_configured() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir).await;
    let gateway = QueueGateway::new(vec![GatewayResponse::text("Claro.")]);
    let kodex = KodexFactory::create_with_gateway(config, Arc::new(gateway.clone())).unwrap();

    kodex
        .workflow()
        .submit_chat("¿Cortan acrílico?", Some(Intent::Chat))
        .await
        .unwrap();
    assert_eq!(gateway.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_assistant_books_with_configured_deposit() {
    let dir = TempDir::new().unwrap();
    let config = load(&dir).await;
    let gateway = QueueGateway::new(vec![
        GatewayResponse::tool_calls(vec![ToolCall {
            id: Some("call_a".to_string()),
            name: "checkDateAvailability".to_string(),
            arguments: json!({"eventDate": "2026-02-14"}),
        }]),
        GatewayResponse::tool_calls(vec![ToolCall {
            id: Some("call_b".to_string()),
            name: "initiateBooking".to_string(),
            arguments: json!({
                "clientName": "Rosa Díaz",
                "clientEmail": "rosa@example.com",
                "clientPhone": "555-0142",
                "eventType": "Boda",
                "eventDate": "2026-02-15",
                "guestCount": 90,
                "packageName": "Paquete Premium"
            }),
        }]),
        GatewayResponse::text("El 14 está ocupado; reservé el 15 con el Paquete Premium."),
    ]);
    let kodex = KodexFactory::create_with_gateway(config, Arc::new(gateway.clone())).unwrap();
    let assistant = kodex.booking_assistant();

    let reply = assistant
        .reply(
            &[ChatMessage::user("Quiero reservar para mi boda")],
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(reply.failure, None);

    let bookings = kodex.events().bookings().await;
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].response.deposit_amount, 1400.0);

    let requests = gateway.requests.lock().unwrap().clone();
    let last = &requests[2].contents;
    assert_eq!(last.len(), 5);
    assert_eq!(last[4].role, ContentRole::Function);
    assert!(matches!(
        &last[2].parts[0],
        Part::FunctionResponse { response, .. }
            if response["result"].as_str().unwrap().contains("no está disponible")
    ));
}
