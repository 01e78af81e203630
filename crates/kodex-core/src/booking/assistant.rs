//! Conversational booking assistant backed by Gateway function calling.
//!
//! Each reply runs at most `max_tool_rounds` Gateway calls. A round that
//! asks for tools gets their outcomes appended as function responses and
//! the conversation continues; the first round answering with text ends the
//! loop. Any Gateway failure, or running out of rounds, yields the
//! configured booking apology.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{booking_registry, EventService};
use crate::capabilities::Capabilities;
use crate::config::KodexConfig;
use crate::core_types::ChatMessage;
use crate::errors::FailureKind;
use crate::gateway::{Content, ContentRole, Part};
use crate::orchestrator::ChatReply;
use crate::tools::ToolRegistry;

fn booking_persona(business_name: &str, today: &str) -> String {
    format!(
        "Eres el asistente de reservas de eventos de \"{}\", un servicio de barras de bebidas para eventos. \
Responde siempre en español, de forma amable y breve. Hoy es {}.\n\
Para reservar necesitas: nombre completo, correo electrónico, teléfono, tipo de evento, fecha (AAAA-MM-DD), número de invitados y paquete de bebidas.\n\
Usa getBeveragePackages para mostrar o recomendar paquetes y sus precios. \
Antes de iniciar una reserva verifica la fecha con checkDateAvailability. \
Llama a initiateBooking solo cuando tengas todos los datos y la fecha esté disponible, y comparte con el cliente el mensaje de confirmación que devuelve. \
Nunca inventes precios, fechas ni identificadores de reserva.",
        business_name, today
    )
}

pub struct BookingAssistant {
    capabilities: Capabilities,
    registry: ToolRegistry,
    service: Arc<EventService>,
    business_name: String,
    max_tool_rounds: usize,
    apology: String,
}

impl BookingAssistant {
    pub fn new(
        capabilities: Capabilities,
        service: Arc<EventService>,
        config: &KodexConfig,
    ) -> Self {
        Self {
            capabilities,
            registry: booking_registry(service.clone()),
            service,
            business_name: config.chatbot.business_name.clone(),
            max_tool_rounds: config.booking.max_tool_rounds.max(1),
            apology: config.messages.booking_error.clone(),
        }
    }

    pub fn service(&self) -> &EventService {
        &self.service
    }

    /// Reply to the conversation in `history`, which ends with the user's
    /// latest message.
    pub async fn reply(&self, history: &[ChatMessage], cancel: &CancellationToken) -> ChatReply {
        let system = booking_persona(
            &self.business_name,
            &chrono::Local::now().format(super::DATE_FORMAT).to_string(),
        );
        let tools = self.registry.list_tools();
        let mut contents: Vec<Content> = history.iter().map(Content::from_message).collect();

        for round in 1..=self.max_tool_rounds {
            let response = match self
                .capabilities
                .converse_with_tools(&system, contents.clone(), tools.clone(), cancel)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    log::warn!("Booking assistant call failed ({}): {}", e.kind(), e);
                    return self.apologize(e.kind());
                }
            };

            if response.tool_calls.is_empty() {
                return match response.text.map(|t| t.trim().to_string()) {
                    Some(text) if !text.is_empty() => ChatReply {
                        text,
                        failure: None,
                    },
                    _ => {
                        log::warn!("Booking assistant returned neither text nor tool calls");
                        self.apologize(FailureKind::EmptyResponse)
                    }
                };
            }

            log::debug!(
                "Booking round {}: {} tool call(s)",
                round,
                response.tool_calls.len()
            );
            let mut outcomes = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                let outcome = self.registry.dispatch(call).await;
                outcomes.push(Part::FunctionResponse {
                    name: outcome.name.clone(),
                    response: outcome.response_payload(),
                });
            }
            contents.push(Content {
                role: ContentRole::Model,
                parts: response
                    .tool_calls
                    .into_iter()
                    .map(Part::FunctionCall)
                    .collect(),
            });
            contents.push(Content {
                role: ContentRole::Function,
                parts: outcomes,
            });
        }

        log::warn!(
            "Booking assistant reached {} tool rounds without a final answer",
            self.max_tool_rounds
        );
        self.apologize(FailureKind::EmptyResponse)
    }

    fn apologize(&self, kind: FailureKind) -> ChatReply {
        ChatReply {
            text: self.apology.clone(),
            failure: Some(kind),
        }
    }
}
