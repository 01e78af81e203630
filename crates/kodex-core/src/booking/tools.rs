use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{parse_event_date, BookingRequest, EventService};
use crate::errors::KodexError;
use crate::gateway::ToolMetadata;
use crate::tools::{required_str, Tool, ToolRegistry};

fn tool_error(tool_name: &str, message: impl Into<String>) -> KodexError {
    KodexError::Tool {
        tool_name: tool_name.to_string(),
        message: message.into(),
    }
}

fn to_json<T: serde::Serialize>(tool_name: &str, value: &T) -> Result<String, KodexError> {
    serde_json::to_string(value).map_err(|e| tool_error(tool_name, e.to_string()))
}

/// Registry holding the three booking tools over one shared service.
pub fn booking_registry(service: Arc<EventService>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_tool(Arc::new(CheckDateAvailabilityTool::new(service.clone())));
    registry.register_tool(Arc::new(InitiateBookingTool::new(service.clone())));
    registry.register_tool(Arc::new(GetBeveragePackagesTool::new(service)));
    registry
}

pub struct CheckDateAvailabilityTool {
    service: Arc<EventService>,
}

impl CheckDateAvailabilityTool {
    pub const NAME: &'static str = "checkDateAvailability";

    pub fn new(service: Arc<EventService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for CheckDateAvailabilityTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: Self::NAME.to_string(),
            description: "Verifica si una fecha específica está disponible para un evento. Siempre debes proporcionar la fecha en formato AAAA-MM-DD.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "eventDate": {
                        "type": "string",
                        "description": "La fecha del evento que el usuario quiere verificar, en formato AAAA-MM-DD."
                    }
                },
                "required": ["eventDate"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, KodexError> {
        let raw = required_str(Self::NAME, &arguments, "eventDate")?;
        let date = parse_event_date(raw)
            .map_err(|_| tool_error(Self::NAME, format!("'{}' is not a YYYY-MM-DD date", raw)))?;
        to_json(Self::NAME, &self.service.check_availability(date))
    }
}

pub struct InitiateBookingTool {
    service: Arc<EventService>,
}

impl InitiateBookingTool {
    pub const NAME: &'static str = "initiateBooking";

    pub fn new(service: Arc<EventService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for InitiateBookingTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: Self::NAME.to_string(),
            description: format!(
                "Inicia el proceso de reserva para un evento una vez que todos los detalles necesarios han sido recopilados y la fecha ha sido confirmada como disponible. Calcula el costo total y el depósito del {}%.",
                (self.service.deposit_ratio() * 100.0).round()
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "clientName": { "type": "string", "description": "Nombre completo del cliente." },
                    "clientEmail": { "type": "string", "description": "Correo electrónico del cliente." },
                    "clientPhone": { "type": "string", "description": "Número de teléfono del cliente." },
                    "eventType": { "type": "string", "description": "Tipo de evento (ej. Boda, Cumpleaños, Corporativo)." },
                    "eventDate": { "type": "string", "description": "Fecha del evento en formato AAAA-MM-DD. Debe ser una fecha previamente confirmada como disponible." },
                    "guestCount": { "type": "integer", "description": "Número estimado de invitados." },
                    "packageName": { "type": "string", "description": "Nombre del paquete de bebidas seleccionado por el cliente o recomendado por el asistente." }
                },
                "required": ["clientName", "clientEmail", "clientPhone", "eventType", "eventDate", "guestCount"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, KodexError> {
        let raw_date = required_str(Self::NAME, &arguments, "eventDate")?;
        let event_date = parse_event_date(raw_date).map_err(|_| {
            tool_error(Self::NAME, format!("'{}' is not a YYYY-MM-DD date", raw_date))
        })?;
        // Models sometimes send integers as floats.
        let guest_count = arguments
            .get("guestCount")
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| tool_error(Self::NAME, "Missing or invalid 'guestCount' parameter"))?;
        let package_name = arguments
            .get("packageName")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let request = BookingRequest {
            client_name: required_str(Self::NAME, &arguments, "clientName")?.to_string(),
            client_email: required_str(Self::NAME, &arguments, "clientEmail")?.to_string(),
            client_phone: required_str(Self::NAME, &arguments, "clientPhone")?.to_string(),
            event_type: required_str(Self::NAME, &arguments, "eventType")?.to_string(),
            event_date,
            guest_count,
            package_id: None,
            package_name,
        };

        let response = self
            .service
            .create_booking(request)
            .await
            .map_err(|e| tool_error(Self::NAME, e.to_string()))?;
        to_json(Self::NAME, &response)
    }
}

pub struct GetBeveragePackagesTool {
    service: Arc<EventService>,
}

impl GetBeveragePackagesTool {
    pub const NAME: &'static str = "getBeveragePackages";

    pub fn new(service: Arc<EventService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for GetBeveragePackagesTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: Self::NAME.to_string(),
            description: "Obtiene la lista de paquetes de bebidas disponibles, incluyendo nombre, descripción y precio de cada uno.".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<String, KodexError> {
        to_json(Self::NAME, &self.service.packages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookingConfig;
    use crate::core_types::ToolCall;

    fn registry() -> (Arc<EventService>, ToolRegistry) {
        let service = Arc::new(EventService::from_config(&BookingConfig::default()).unwrap());
        (service.clone(), booking_registry(service))
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: Some("call_1".to_string()),
            name: name.to_string(),
            arguments,
        }
    }

    #[test]
    fn registry_exposes_the_three_tools() {
        let (_, registry) = registry();
        let names: Vec<String> = registry.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["checkDateAvailability", "getBeveragePackages", "initiateBooking"]
        );
    }

    #[tokio::test]
    async fn availability_tool_reports_blocked_dates() {
        let (_, registry) = registry();
        let outcome = registry
            .dispatch(&call("checkDateAvailability", json!({"eventDate": "2025-10-31"})))
            .await;
        assert!(outcome.success);
        let value: Value = serde_json::from_str(&outcome.content).unwrap();
        assert_eq!(value["available"], false);

        let outcome = registry
            .dispatch(&call("checkDateAvailability", json!({"eventDate": "31 de octubre"})))
            .await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn booking_tool_creates_a_pending_booking() {
        let (service, registry) = registry();
        let outcome = registry
            .dispatch(&call(
                "initiateBooking",
                json!({
                    "clientName": "Luis Pérez",
                    "clientEmail": "luis@example.com",
                    "clientPhone": "555-0199",
                    "eventType": "Cumpleaños",
                    "eventDate": "2025-11-08",
                    "guestCount": 40.0,
                    "packageName": "paquete premium"
                }),
            ))
            .await;

        assert!(outcome.success, "{}", outcome.content);
        let value: Value = serde_json::from_str(&outcome.content).unwrap();
        assert_eq!(value["status"], "pending_deposit");
        assert_eq!(value["totalCost"], 2800.0);
        assert_eq!(service.bookings().await[0].request.guest_count, 40);
    }

    #[tokio::test]
    async fn booking_tool_reports_missing_fields_and_unknown_packages() {
        let (service, registry) = registry();

        let missing = registry
            .dispatch(&call("initiateBooking", json!({"clientName": "Luis"})))
            .await;
        assert!(!missing.success);

        let unknown = registry
            .dispatch(&call(
                "initiateBooking",
                json!({
                    "clientName": "Luis",
                    "clientEmail": "luis@example.com",
                    "clientPhone": "555",
                    "eventType": "Boda",
                    "eventDate": "2025-11-08",
                    "guestCount": 10,
                    "packageName": "Paquete Oro"
                }),
            ))
            .await;
        assert!(!unknown.success);
        assert!(unknown.content.contains("Package not found"));
        assert!(service.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn packages_tool_lists_prices() {
        let (_, registry) = registry();
        let outcome = registry.dispatch(&call("getBeveragePackages", json!({}))).await;
        let packages: Vec<super::super::BeveragePackage> =
            serde_json::from_str(&outcome.content).unwrap();
        assert_eq!(packages.len(), 4);
        assert_eq!(packages[3].price, 500.0);
    }
}
